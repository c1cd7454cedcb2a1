//! Hit testing: point → drawable lookup.
//!
//! Reverse-walks the layer (front-to-back) to find which drawable is under a
//! stage-pixel position. Groups are transparent; their children are hit.

use crate::drawable::{DrawableRole, Shape};
use crate::layer::Layer;
use fgc_core::NodeId;
use fgc_core::anchor::closest_point_on_polyline;
use kurbo::Point;
use petgraph::stable_graph::NodeIndex;

/// The innermost drawable under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub drawable: NodeId,
    pub role: DrawableRole,
    /// The top-level drawable the hit belongs to (a block for its icons).
    pub owner: NodeId,
    pub owner_role: DrawableRole,
}

/// Find the topmost listening drawable at `point`.
///
/// Arrows count as hit within `arrow_tolerance` pixels of their path.
/// Returns `None` on empty canvas.
pub fn hit_test(layer: &Layer, point: Point, arrow_tolerance: f64) -> Option<Hit> {
    let idx = hit_node(layer, layer.root(), point, arrow_tolerance)?;
    let drawable = layer.drawable(idx);
    let owner = layer.top_level_of(drawable.id)?;
    let owner_role = layer.get(owner)?.role;
    log::trace!("hit {} (owner {owner})", drawable.id);
    Some(Hit {
        drawable: drawable.id,
        role: drawable.role,
        owner,
        owner_role,
    })
}

fn hit_node(layer: &Layer, idx: NodeIndex, point: Point, tolerance: f64) -> Option<NodeIndex> {
    let drawable = layer.drawable(idx);
    if !drawable.visible && idx != layer.root() {
        return None;
    }

    // Check children in reverse (topmost first)
    for &child in layer.children(idx).iter().rev() {
        if let Some(hit) = hit_node(layer, child, point, tolerance) {
            return Some(hit);
        }
    }

    if !drawable.role.listens() {
        return None;
    }

    let transform = layer.absolute_transform(idx);
    let hit = match &drawable.shape {
        Shape::Group { .. } | Shape::Transformer { .. } => false,
        Shape::Arrow { points } => {
            let origin = transform * Point::ORIGIN;
            closest_point_on_polyline(origin, points, point)
                .is_some_and(|h| h.distance <= tolerance)
        }
        Shape::Circle { radius } => (transform * Point::ORIGIN).distance(point) <= *radius,
        shape => shape
            .local_bounds()
            .contains(transform.inverse() * point),
    };
    hit.then_some(idx)
}
