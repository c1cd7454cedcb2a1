//! Retained drawables: what the layer holds for each on-canvas element.

use fgc_core::{AnchorSide, NodeId};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use smallvec::SmallVec;

/// What a drawable is for. Lookups by role replace name-based queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawableRole {
    Root,
    /// Container of a numpad block (background, icons, anchors).
    NumpadBlock,
    BlockBackground,
    CommandIcon,
    AnchorPoint(AnchorSide),
    Arrow,
    /// Preview arrow drawn while an arrow gesture is in progress.
    TempArrow,
    MoveImage,
    TextBlock,
    Video,
    Transformer,
    /// Where a bend point would be inserted on a selected arrow.
    BendMarker,
}

impl DrawableRole {
    pub fn is_anchor(self) -> bool {
        matches!(self, DrawableRole::AnchorPoint(_))
    }

    /// Overlays are never hit by the pointer.
    pub fn listens(self) -> bool {
        !matches!(
            self,
            DrawableRole::Root
                | DrawableRole::TempArrow
                | DrawableRole::Transformer
                | DrawableRole::BendMarker
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Group { size: Size },
    Rect { size: Size, fill: String },
    Image { src: String, size: Size },
    Text { content: String, font_size: f64 },
    /// Flat `x, y` list relative to the drawable's position.
    Arrow { points: Vec<f64> },
    /// Centred on the drawable's position.
    Circle { radius: f64 },
    /// Selection frame around another drawable.
    Transformer { target: NodeId },
}

/// Approximate advance of one glyph, as a fraction of the font size.
pub const GLYPH_WIDTH_RATIO: f64 = 0.6;
pub const LINE_HEIGHT_RATIO: f64 = 1.2;

impl Shape {
    /// Bounding box in the drawable's own coordinates (before its transform).
    pub fn local_bounds(&self) -> Rect {
        match self {
            Shape::Group { size } | Shape::Rect { size, .. } | Shape::Image { size, .. } => {
                size.to_rect()
            }
            Shape::Text { content, font_size } => Rect::new(
                0.0,
                0.0,
                content.chars().count() as f64 * font_size * GLYPH_WIDTH_RATIO,
                font_size * LINE_HEIGHT_RATIO,
            ),
            Shape::Arrow { points } => points
                .chunks_exact(2)
                .fold(Rect::ZERO, |r, p| r.union_pt(Point::new(p[0], p[1]))),
            Shape::Circle { radius } => Rect::new(-radius, -radius, *radius, *radius),
            Shape::Transformer { .. } => Rect::ZERO,
        }
    }
}

/// One element of the layer. Coordinates are pixels relative to the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub id: NodeId,
    pub role: DrawableRole,
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub visible: bool,
    pub draggable: bool,
    pub shape: Shape,
    /// Node ids an arrow is attached to: start, then end when bound.
    pub links: SmallVec<[NodeId; 2]>,
}

impl Drawable {
    pub fn new(id: NodeId, role: DrawableRole, shape: Shape) -> Self {
        Self {
            id,
            role,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            visible: true,
            draggable: false,
            shape,
            links: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn at(mut self, p: Point) -> Self {
        self.set_position(p);
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    #[must_use]
    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    #[must_use]
    pub fn scaled(mut self, sx: f64, sy: f64) -> Self {
        self.scale_x = sx;
        self.scale_y = sy;
        self
    }

    #[must_use]
    pub fn linked(mut self, links: impl IntoIterator<Item = NodeId>) -> Self {
        self.links = links.into_iter().collect();
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, p: Point) {
        self.x = p.x;
        self.y = p.y;
    }

    /// Transform from this drawable's coordinates into its parent's.
    pub fn local_transform(&self) -> Affine {
        Affine::translate(Vec2::new(self.x, self.y))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    pub fn links_to(&self, id: NodeId) -> bool {
        self.links.contains(&id)
    }

    /// Points of an arrow drawable, if it is one.
    pub fn arrow_points(&self) -> Option<&[f64]> {
        match &self.shape {
            Shape::Arrow { points } => Some(points),
            _ => None,
        }
    }
}
