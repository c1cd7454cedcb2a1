//! Layer → display list.
//!
//! Walks the layer in paint order and emits one `PaintItem` per visible
//! drawable, already in stage pixels. The host (canvas element, native
//! window) turns the list into actual draw calls.

use crate::drawable::{DrawableRole, Shape};
use crate::layer::Layer;
use fgc_core::NodeId;
use fgc_core::anchor::absolute_points;
use kurbo::{Affine, BezPath, Circle, Point, Rect};
use petgraph::stable_graph::NodeIndex;

/// Padding of the transformer frame around its target.
const TRANSFORMER_PADDING: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintOp {
    Fill { rect: Rect, color: String },
    Image { src: String, transform: Affine, width: f64, height: f64 },
    Text { content: String, origin: Point, font_size: f64 },
    Arrow { path: BezPath, head: Option<(Point, Point)> },
    Dot { circle: Circle },
    Frame { rect: Rect },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintItem {
    pub id: NodeId,
    pub role: DrawableRole,
    pub op: PaintOp,
}

/// Build the display list for everything visible on `layer`.
pub fn paint_layer(layer: &Layer) -> Vec<PaintItem> {
    let mut items = Vec::with_capacity(layer.len());
    paint_node(layer, layer.root(), &mut items);
    items
}

fn paint_node(layer: &Layer, idx: NodeIndex, out: &mut Vec<PaintItem>) {
    let d = layer.drawable(idx);
    if !d.visible {
        return;
    }
    let transform = layer.absolute_transform(idx);

    let op = match &d.shape {
        Shape::Group { .. } => None,
        Shape::Rect { size, fill } => Some(PaintOp::Fill {
            rect: transform.transform_rect_bbox(size.to_rect()),
            color: fill.clone(),
        }),
        Shape::Image { src, size } => Some(PaintOp::Image {
            src: src.clone(),
            transform,
            width: size.width,
            height: size.height,
        }),
        Shape::Text { content, font_size } => {
            log::trace!("TEXT {} {:?}", d.id, content);
            Some(PaintOp::Text {
                content: content.clone(),
                origin: transform * Point::ORIGIN,
                font_size: *font_size,
            })
        }
        Shape::Arrow { points } => arrow_op(transform * Point::ORIGIN, points),
        Shape::Circle { radius } => Some(PaintOp::Dot {
            circle: Circle::new(transform * Point::ORIGIN, *radius),
        }),
        Shape::Transformer { target } => match layer.absolute_bounds(*target) {
            Some(bounds) => Some(PaintOp::Frame {
                rect: bounds.inflate(TRANSFORMER_PADDING, TRANSFORMER_PADDING),
            }),
            None => {
                log::debug!("transformer {} lost its target {target}", d.id);
                None
            }
        },
    };

    if let Some(op) = op {
        out.push(PaintItem {
            id: d.id,
            role: d.role,
            op,
        });
    }

    for child in layer.children(idx) {
        paint_node(layer, child, out);
    }
}

fn arrow_op(origin: Point, points: &[f64]) -> Option<PaintOp> {
    let abs = absolute_points(origin, points);
    let (first, rest) = abs.split_first()?;
    let mut path = BezPath::new();
    path.move_to(*first);
    for p in rest {
        path.line_to(*p);
    }
    // Arrow head points along the last segment.
    let head = match abs.as_slice() {
        [.., a, b] => Some((*a, *b)),
        _ => None,
    };
    Some(PaintOp::Arrow { path, head })
}
