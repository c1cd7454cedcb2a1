//! Interaction features: anchor highlight, transform handles, arrow drawing,
//! arrow bend points, text editing, video playback and dragging.
//!
//! The scene manager decides *what* an input means (`Interaction`); the
//! features here carry it out against the scene while active.

use crate::feature::{Cleanup, Feature, FeatureStatus, FeatureType};
use crate::input::InputEvent;
use crate::sync::{HostOverlay, OVERLAY_RANK, SceneManager};
use fgc_core::anchor::{closest_point_on_polyline, relative_points};
use fgc_core::units::offset_to_viewport;
use fgc_core::{
    Anchor, AnchorSide, Arrow, CanvasNode, NodeId, NodeKind, NodePatch, snap, youtube_video_id,
};
use fgc_scene::{Drawable, DrawableRole, Shape};
use kurbo::Point;

/// What an input should do, as decided by the scene manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Nothing,
    /// Drop whatever feature is active.
    Deactivate,
    HighlightAnchors(NodeId),
    Transform(NodeId),
    DrawArrow { from: NodeId, side: AnchorSide },
    SelectArrow(NodeId),
    EditText(NodeId),
    PlayVideo(NodeId),
    Drag(NodeId),
}

impl Interaction {
    /// The feature that carries this interaction out, if any.
    pub fn into_feature(self) -> Option<(FeatureType, NodeId, Box<dyn Feature<SceneManager>>)> {
        match self {
            Interaction::Nothing | Interaction::Deactivate => None,
            Interaction::HighlightAnchors(id) => Some((
                FeatureType::AnchorPoints,
                id,
                Box::new(AnchorHighlightFeature { target: id }),
            )),
            Interaction::Transform(id) => Some((
                FeatureType::Transformer,
                id,
                Box::new(TransformFeature::new(id)),
            )),
            Interaction::DrawArrow { from, side } => Some((
                FeatureType::Arrowing,
                from,
                Box::new(ArrowingFeature::new(from, side)),
            )),
            Interaction::SelectArrow(id) => Some((
                FeatureType::ArrowSelect,
                id,
                Box::new(ArrowSelectFeature::new(id)),
            )),
            Interaction::EditText(id) => Some((
                FeatureType::TextEditing,
                id,
                Box::new(TextEditFeature { target: id }),
            )),
            Interaction::PlayVideo(id) => Some((
                FeatureType::VideoPlayer,
                id,
                Box::new(VideoPlayerFeature { target: id }),
            )),
            Interaction::Drag(id) => {
                Some((FeatureType::Dragging, id, Box::new(DragFeature { target: id })))
            }
        }
    }
}

// ─── Anchor highlight ────────────────────────────────────────────────────

/// Shows a node's anchors so an arrow can be started from one.
pub struct AnchorHighlightFeature {
    target: NodeId,
}

impl Feature<SceneManager> for AnchorHighlightFeature {
    fn on_activated(&mut self, scene: &mut SceneManager) -> Cleanup<SceneManager> {
        scene.show_anchors(self.target);
        Box::new(SceneManager::hide_all_anchors)
    }
}

// ─── Transform handles ───────────────────────────────────────────────────

/// Scale and rotate handles. Text nodes only rotate.
pub struct TransformFeature {
    target: NodeId,
    handles: NodeId,
}

impl TransformFeature {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            handles: target.child("transformer"),
        }
    }
}

impl Feature<SceneManager> for TransformFeature {
    fn on_activated(&mut self, scene: &mut SceneManager) -> Cleanup<SceneManager> {
        let root = scene.layer().root();
        let handles = Drawable::new(
            self.handles,
            DrawableRole::Transformer,
            Shape::Transformer {
                target: self.target,
            },
        );
        scene.layer_mut().add_ranked(root, handles, OVERLAY_RANK);
        let id = self.handles;
        Box::new(move |scene: &mut SceneManager| {
            scene.layer_mut().destroy(id);
        })
    }

    fn handle(&mut self, event: &InputEvent, scene: &mut SceneManager) -> FeatureStatus {
        let InputEvent::Transform {
            scale_x,
            scale_y,
            rotation,
        } = *event
        else {
            return FeatureStatus::Ignored;
        };
        let rotate_only = scene.store().kind_of(self.target) == Some(NodeKind::Text);
        let Some(d) = scene.layer_mut().get_mut(self.target) else {
            return FeatureStatus::Abandoned;
        };
        let patch = if rotate_only {
            d.rotation = rotation;
            NodePatch::rotation(rotation)
        } else {
            (d.scale_x, d.scale_y, d.rotation) = (scale_x, scale_y, rotation);
            NodePatch::transform(scale_x, scale_y, rotation)
        };
        scene.store().update(self.target, &patch);
        scene.refresh_arrows_touching(self.target);
        FeatureStatus::Continue
    }
}

// ─── Arrow drawing ───────────────────────────────────────────────────────

/// Draws a temporary arrow from an anchor to the pointer, snapping to other
/// nodes' anchors, and commits it to the store on release.
pub struct ArrowingFeature {
    start: NodeId,
    side: AnchorSide,
    temp: NodeId,
    origin: Option<Point>,
    end: Option<Anchor>,
    pointer: Option<Point>,
}

impl ArrowingFeature {
    pub fn new(start: NodeId, side: AnchorSide) -> Self {
        Self {
            start,
            side,
            temp: start.child("temp-arrow"),
            origin: None,
            end: None,
            pointer: None,
        }
    }

    fn track(&mut self, pointer: Point, scene: &mut SceneManager) -> FeatureStatus {
        let Some(origin) = self.origin else {
            return FeatureStatus::Abandoned;
        };
        let candidates: Vec<Anchor> = scene
            .visible_anchors()
            .into_iter()
            .filter(|a| a.owner != self.start)
            .collect();
        self.end = snap(pointer, &candidates, scene.config().anchor_snap_threshold).copied();
        self.pointer = Some(pointer);
        let end = self.end.map_or(pointer, |a| a.position);
        let Some(d) = scene.layer_mut().get_mut(self.temp) else {
            return FeatureStatus::Abandoned;
        };
        d.shape = Shape::Arrow {
            points: relative_points(origin, end),
        };
        FeatureStatus::Continue
    }

    fn commit(&mut self, scene: &mut SceneManager) -> FeatureStatus {
        let (Some(origin), Some(pointer)) = (self.origin, self.pointer) else {
            return FeatureStatus::Abandoned;
        };
        let end = self.end.map_or(pointer, |a| a.position);
        if self.end.is_none() && end.distance(origin) <= scene.config().anchor_radius {
            log::debug!("arrowing: released on the start anchor, nothing drawn");
            return FeatureStatus::Abandoned;
        }
        let offset = offset_to_viewport(end - origin, scene.settings());
        let arrow = Arrow {
            id: NodeId::generate(),
            start_node_id: self.start,
            end_node_id: self.end.map(|a| a.owner),
            points: vec![0.0, 0.0, offset.x, offset.y],
            start_anchor: self.side,
            end_anchor: self.end.map(|a| a.side),
        };
        log::debug!(
            "arrowing: committing {} from {} to {:?}",
            arrow.id,
            self.start,
            arrow.end_node_id
        );
        if scene.store().add(CanvasNode::Arrow(arrow)).is_none() {
            return FeatureStatus::Abandoned;
        }
        scene.layer_mut().destroy(self.temp);
        FeatureStatus::Finished
    }
}

impl Feature<SceneManager> for ArrowingFeature {
    fn on_activated(&mut self, scene: &mut SceneManager) -> Cleanup<SceneManager> {
        self.origin = scene.anchor_position(self.start, self.side);
        scene.show_anchors_except(self.start);
        if let Some(origin) = self.origin {
            let root = scene.layer().root();
            let temp = Drawable::new(
                self.temp,
                DrawableRole::TempArrow,
                Shape::Arrow {
                    points: relative_points(origin, origin),
                },
            )
            .at(origin);
            scene.layer_mut().add_ranked(root, temp, OVERLAY_RANK);
        }
        let temp = self.temp;
        Box::new(move |scene: &mut SceneManager| {
            scene.hide_all_anchors();
            scene.layer_mut().destroy(temp);
        })
    }

    fn handle(&mut self, event: &InputEvent, scene: &mut SceneManager) -> FeatureStatus {
        match *event {
            InputEvent::PointerMove { x, y } => self.track(Point::new(x, y), scene),
            InputEvent::PointerUp { x, y } => match self.track(Point::new(x, y), scene) {
                FeatureStatus::Continue => self.commit(scene),
                status => status,
            },
            _ => FeatureStatus::Ignored,
        }
    }
}

// ─── Arrow bend points ───────────────────────────────────────────────────

/// Selected arrow: a marker follows the pointer along the path and clicking
/// it inserts a bend point there.
pub struct ArrowSelectFeature {
    arrow: NodeId,
    marker: NodeId,
    /// Closest path point to the pointer and the segment it lies on.
    hover: Option<(Point, usize)>,
}

impl ArrowSelectFeature {
    pub fn new(arrow: NodeId) -> Self {
        Self {
            arrow,
            marker: arrow.child("bend-marker"),
            hover: None,
        }
    }

    fn track(&mut self, pointer: Point, scene: &mut SceneManager) -> FeatureStatus {
        let Some(origin) = scene.layer().absolute_position(self.arrow) else {
            return FeatureStatus::Abandoned;
        };
        let hit = scene
            .layer()
            .get(self.arrow)
            .and_then(|d| d.arrow_points())
            .and_then(|points| closest_point_on_polyline(origin, points, pointer));
        let tolerance = scene.config().arrow_hit_tolerance;
        self.hover = hit
            .filter(|h| h.distance <= tolerance)
            .map(|h| (h.point, h.segment));
        self.show_marker(scene);
        FeatureStatus::Continue
    }

    fn show_marker(&self, scene: &mut SceneManager) {
        if let Some(marker) = scene.layer_mut().get_mut(self.marker) {
            marker.visible = self.hover.is_some();
            if let Some((p, _)) = self.hover {
                marker.set_position(p);
            }
        }
    }

    /// Insert the hovered point after its segment's first point.
    fn insert_bend(&mut self, click: Point, scene: &mut SceneManager) -> FeatureStatus {
        let Some((point, segment)) = self.hover else {
            return FeatureStatus::Ignored;
        };
        if point.distance(click) > scene.config().arrow_hit_tolerance {
            return FeatureStatus::Ignored;
        }
        let (Some(CanvasNode::Arrow(arrow)), Some(origin)) = (
            scene.store().get(self.arrow),
            scene.layer().absolute_position(self.arrow),
        ) else {
            return FeatureStatus::Abandoned;
        };
        let offset = offset_to_viewport(point - origin, scene.settings());
        let mut points = if arrow.points.len() < 4 {
            vec![0.0; 4]
        } else {
            arrow.points
        };
        let at = (2 * (segment + 1)).min(points.len());
        points.splice(at..at, [offset.x, offset.y]);
        log::debug!("arrow select: bend point {} on {}", at / 2, self.arrow);
        scene.store().update(self.arrow, &NodePatch::points(points));
        self.hover = None;
        self.show_marker(scene);
        FeatureStatus::Continue
    }
}

impl Feature<SceneManager> for ArrowSelectFeature {
    fn on_activated(&mut self, scene: &mut SceneManager) -> Cleanup<SceneManager> {
        let root = scene.layer().root();
        let marker = Drawable::new(
            self.marker,
            DrawableRole::BendMarker,
            Shape::Circle {
                radius: scene.config().anchor_radius,
            },
        )
        .hidden();
        scene.layer_mut().add_ranked(root, marker, OVERLAY_RANK);
        let id = self.marker;
        Box::new(move |scene: &mut SceneManager| {
            scene.layer_mut().destroy(id);
        })
    }

    fn handle(&mut self, event: &InputEvent, scene: &mut SceneManager) -> FeatureStatus {
        match *event {
            InputEvent::PointerMove { x, y } => self.track(Point::new(x, y), scene),
            InputEvent::Click { x, y } => self.insert_bend(Point::new(x, y), scene),
            _ => FeatureStatus::Ignored,
        }
    }
}

// ─── Text editing ────────────────────────────────────────────────────────

/// Hides a text node's label while the host's editor sits over it; the
/// editor's content is written to the store when it loses focus.
pub struct TextEditFeature {
    target: NodeId,
}

impl Feature<SceneManager> for TextEditFeature {
    fn on_activated(&mut self, scene: &mut SceneManager) -> Cleanup<SceneManager> {
        let label = self.target.child("label");
        let node = scene.store().get(self.target);
        let placed = scene.layer().absolute_position(self.target).zip(
            scene
                .layer()
                .get(self.target)
                .map(|d| d.shape.local_bounds().size()),
        );
        match (node, placed) {
            (Some(CanvasNode::Text(text)), Some((origin, size))) => {
                if let Some(d) = scene.layer_mut().get_mut(label) {
                    d.visible = false;
                }
                scene.set_overlay(HostOverlay::TextEditor {
                    node: self.target,
                    origin,
                    size,
                    rotation: text.rotation,
                    text: text.text,
                    font_size: text.font_size,
                });
            }
            _ => log::debug!("text edit: {} is not a drawn text node", self.target),
        }
        let target = self.target;
        Box::new(move |scene: &mut SceneManager| {
            if let Some(d) = scene.layer_mut().get_mut(label) {
                d.visible = true;
            }
            scene.clear_overlay(target);
        })
    }

    fn handle(&mut self, event: &InputEvent, scene: &mut SceneManager) -> FeatureStatus {
        match event {
            InputEvent::TextCommitted { text } => {
                scene.store().update(self.target, &NodePatch::text(text.clone()));
                FeatureStatus::Finished
            }
            _ => FeatureStatus::Ignored,
        }
    }
}

// ─── Video playback ──────────────────────────────────────────────────────

/// Swaps a video thumbnail for the host's embedded player until the host
/// dismisses it.
pub struct VideoPlayerFeature {
    target: NodeId,
}

impl Feature<SceneManager> for VideoPlayerFeature {
    fn on_activated(&mut self, scene: &mut SceneManager) -> Cleanup<SceneManager> {
        let video_id = match scene.store().get(self.target) {
            Some(CanvasNode::Video(video)) => youtube_video_id(&video.src).map(str::to_owned),
            _ => None,
        };
        match (video_id, scene.layer().absolute_bounds(self.target)) {
            (Some(video_id), Some(bounds)) => scene.set_overlay(HostOverlay::VideoPlayer {
                node: self.target,
                video_id,
                bounds,
            }),
            _ => log::debug!("video player: {} has no playable thumbnail", self.target),
        }
        let target = self.target;
        Box::new(move |scene: &mut SceneManager| scene.clear_overlay(target))
    }

    fn handle(&mut self, event: &InputEvent, _scene: &mut SceneManager) -> FeatureStatus {
        match event {
            InputEvent::OverlayDismissed => FeatureStatus::Finished,
            _ => FeatureStatus::Ignored,
        }
    }
}

// ─── Dragging ────────────────────────────────────────────────────────────

/// Moves one node while the host drags it. Activating it clears any other
/// feature, so anchors and transform handles are gone during a drag.
pub struct DragFeature {
    target: NodeId,
}

impl Feature<SceneManager> for DragFeature {
    fn on_activated(&mut self, _scene: &mut SceneManager) -> Cleanup<SceneManager> {
        Box::new(|_: &mut SceneManager| {})
    }

    fn handle(&mut self, event: &InputEvent, scene: &mut SceneManager) -> FeatureStatus {
        match *event {
            InputEvent::DragMove { id, x, y } if id == self.target => {
                if scene.drag_to(id, Point::new(x, y)) {
                    FeatureStatus::Continue
                } else {
                    FeatureStatus::Abandoned
                }
            }
            InputEvent::DragEnd { id } if id == self.target => FeatureStatus::Finished,
            _ => FeatureStatus::Ignored,
        }
    }
}
