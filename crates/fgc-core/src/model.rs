//! Canvas node data model.
//!
//! A stage holds a flat collection of `CanvasNode`s. Every node carries a
//! client-generated UUID that is stable for its lifetime and doubles as the
//! lookup key of its drawable. Positions are stored in viewport units and
//! converted to pixels only at draw time (see `units`).
//!
//! Arrows connect *nodes*: `start_node_id` / `end_node_id` name the owning
//! nodes, the `AnchorSide` fields name which of their anchors is used.

use crate::anchor::AnchorSide;
use crate::id::NodeId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

// ─── Leaf types ──────────────────────────────────────────────────────────

/// Controller scheme a numpad input string is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControllerType {
    #[default]
    Classic,
    Modern,
}

/// Reference to a character move bitmap served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub file_path: String,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<u32>,
}

/// Hosting service of an embedded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoType {
    #[default]
    Youtube,
}

fn default_scale() -> f64 {
    1.0
}

// ─── Node variants ───────────────────────────────────────────────────────

/// A fighting-game input string rendered as a row of command icons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumpadBlock {
    pub id: NodeId,
    pub input: String,
    #[serde(rename = "type")]
    pub controller_type: ControllerType,
    pub x: f64,
    pub y: f64,
}

/// A directional connector starting at one node's anchor.
///
/// `points` is a flat `x, y` list in viewport units relative to the start
/// anchor. For a bound arrow (`end_node_id` set) it is derived from the live
/// anchor positions, never trusted as freehand data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
    pub id: NodeId,
    pub start_node_id: NodeId,
    pub end_node_id: Option<NodeId>,
    pub points: Vec<f64>,
    #[serde(default)]
    pub start_anchor: AnchorSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_anchor: Option<AnchorSide>,
}

impl Arrow {
    /// The free end offset (last point pair), in viewport units.
    pub fn end_offset(&self) -> Option<(f64, f64)> {
        match self.points.as_slice() {
            [.., x, y] => Some((*x, *y)),
            _ => None,
        }
    }
}

/// A character move screenshot placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterMoveImage {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "characterMoveImage")]
    pub image_ref: ImageRef,
    /// User scale override written by the transform handles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font_size: f64,
    pub font_color: String,
    pub background_color: String,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub is_underline: bool,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub src: String,
    #[serde(rename = "type", default)]
    pub video_type: VideoType,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub rotation: f64,
}

// ─── Node sum type ───────────────────────────────────────────────────────

/// Discriminant of a `CanvasNode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    NumpadBlock,
    CharacterMoveImage,
    Arrow,
    Text,
    Video,
}

impl NodeKind {
    /// Draw precedence. Arrows come after the nodes they reference because
    /// endpoint resolution needs those nodes already placed.
    pub fn render_rank(self) -> u8 {
        match self {
            NodeKind::NumpadBlock => 0,
            NodeKind::CharacterMoveImage => 1,
            NodeKind::Arrow => 2,
            NodeKind::Text => 3,
            NodeKind::Video => 4,
        }
    }

    /// Path segment used by the backend routes (`/canvas/<segment>/...`).
    pub fn route(self) -> &'static str {
        match self {
            NodeKind::NumpadBlock => "numpadBlock",
            NodeKind::CharacterMoveImage => "characterMoveImage",
            NodeKind::Arrow => "arrow",
            NodeKind::Text => "text",
            NodeKind::Video => "video",
        }
    }
}

/// One placed canvas entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanvasNode {
    NumpadBlock(NumpadBlock),
    CharacterMoveImage(CharacterMoveImage),
    Arrow(Arrow),
    Text(Text),
    Video(Video),
}

impl CanvasNode {
    pub fn id(&self) -> NodeId {
        match self {
            CanvasNode::NumpadBlock(n) => n.id,
            CanvasNode::CharacterMoveImage(n) => n.id,
            CanvasNode::Arrow(n) => n.id,
            CanvasNode::Text(n) => n.id,
            CanvasNode::Video(n) => n.id,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            CanvasNode::NumpadBlock(_) => NodeKind::NumpadBlock,
            CanvasNode::CharacterMoveImage(_) => NodeKind::CharacterMoveImage,
            CanvasNode::Arrow(_) => NodeKind::Arrow,
            CanvasNode::Text(_) => NodeKind::Text,
            CanvasNode::Video(_) => NodeKind::Video,
        }
    }

    /// Top-left position in viewport units. Arrows have none of their own.
    pub fn position(&self) -> Option<Point> {
        match self {
            CanvasNode::NumpadBlock(n) => Some(Point::new(n.x, n.y)),
            CanvasNode::CharacterMoveImage(n) => Some(Point::new(n.x, n.y)),
            CanvasNode::Text(n) => Some(Point::new(n.x, n.y)),
            CanvasNode::Video(n) => Some(Point::new(n.x, n.y)),
            CanvasNode::Arrow(_) => None,
        }
    }

    /// Move the node's top-left. A no-op for arrows.
    pub fn set_position(&mut self, p: Point) {
        match self {
            CanvasNode::NumpadBlock(n) => (n.x, n.y) = (p.x, p.y),
            CanvasNode::CharacterMoveImage(n) => (n.x, n.y) = (p.x, p.y),
            CanvasNode::Text(n) => (n.x, n.y) = (p.x, p.y),
            CanvasNode::Video(n) => (n.x, n.y) = (p.x, p.y),
            CanvasNode::Arrow(_) => {}
        }
    }

    /// Whether this node is an arrow attached to `id` at either end.
    pub fn references(&self, id: NodeId) -> bool {
        match self {
            CanvasNode::Arrow(a) => a.start_node_id == id || a.end_node_id == Some(id),
            _ => false,
        }
    }

    pub fn as_arrow(&self) -> Option<&Arrow> {
        match self {
            CanvasNode::Arrow(a) => Some(a),
            _ => None,
        }
    }

    /// Merge the fields of `patch` that are meaningful for this kind.
    /// Returns `true` if anything changed.
    pub fn apply(&mut self, patch: &NodePatch) -> bool {
        let before = self.clone();
        if let Some(p) = patch.position {
            self.set_position(p);
        }
        if let Some(rotation) = patch.rotation {
            match self {
                CanvasNode::CharacterMoveImage(n) => n.rotation = rotation,
                CanvasNode::Text(n) => n.rotation = rotation,
                CanvasNode::Video(n) => n.rotation = rotation,
                CanvasNode::NumpadBlock(_) | CanvasNode::Arrow(_) => {}
            }
        }
        if let Some((sx, sy)) = patch.scale {
            match self {
                CanvasNode::CharacterMoveImage(n) => (n.scale_x, n.scale_y) = (Some(sx), Some(sy)),
                CanvasNode::Video(n) => (n.scale_x, n.scale_y) = (sx, sy),
                CanvasNode::NumpadBlock(_) | CanvasNode::Arrow(_) | CanvasNode::Text(_) => {}
            }
        }
        match self {
            CanvasNode::NumpadBlock(n) => {
                if let Some(input) = &patch.input {
                    n.input.clone_from(input);
                }
                if let Some(ct) = patch.controller_type {
                    n.controller_type = ct;
                }
            }
            CanvasNode::Arrow(a) => {
                if let Some(points) = &patch.points {
                    a.points.clone_from(points);
                }
                if let Some(end) = patch.end {
                    a.end_node_id = end.map(|(id, _)| id);
                    a.end_anchor = end.map(|(_, side)| side);
                }
            }
            CanvasNode::Text(t) => {
                if let Some(text) = &patch.text {
                    t.text.clone_from(text);
                }
            }
            CanvasNode::CharacterMoveImage(_) | CanvasNode::Video(_) => {}
        }
        *self != before
    }
}

// ─── Partial updates ─────────────────────────────────────────────────────

/// Typed partial update for `CanvasNode::apply`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    /// New top-left, viewport units.
    pub position: Option<Point>,
    pub input: Option<String>,
    pub controller_type: Option<ControllerType>,
    pub points: Option<Vec<f64>>,
    /// Rebind (or unbind, with `Some(None)`) an arrow's end.
    pub end: Option<Option<(NodeId, AnchorSide)>>,
    pub scale: Option<(f64, f64)>,
    pub rotation: Option<f64>,
    pub text: Option<String>,
}

impl NodePatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            position: Some(Point::new(x, y)),
            ..Self::default()
        }
    }

    pub fn input(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            ..Self::default()
        }
    }

    pub fn transform(scale_x: f64, scale_y: f64, rotation: f64) -> Self {
        Self {
            scale: Some((scale_x, scale_y)),
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: f64) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn points(points: Vec<f64>) -> Self {
        Self {
            points: Some(points),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

// ─── Stage ───────────────────────────────────────────────────────────────

/// Character reference owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRef {
    pub id: u32,
    pub name: String,
}

/// One canvas workspace comparing two characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: NodeId,
    pub name: String,
    pub character_me: CharacterRef,
    pub character_opponent: CharacterRef,
}

// ─── Video helpers ───────────────────────────────────────────────────────

/// Extract the video id from a YouTube `/embed/<id>?...` URL.
pub fn youtube_video_id(src: &str) -> Option<&str> {
    let (_, rest) = src.split_once("/embed/")?;
    let id = rest.split(['?', '/']).next()?;
    (!id.is_empty()).then_some(id)
}

/// Thumbnail image shown in place of an embedded YouTube player.
pub fn youtube_thumbnail_url(src: &str) -> Option<String> {
    youtube_video_id(src).map(|id| format!("https://i.ytimg.com/vi/{id}/hqdefault.jpg"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(id: &str) -> CanvasNode {
        CanvasNode::NumpadBlock(NumpadBlock {
            id: NodeId::intern(id),
            input: "236p".into(),
            controller_type: ControllerType::Classic,
            x: 0.1,
            y: 0.2,
        })
    }

    #[test]
    fn numpad_block_json_uses_backend_shape() {
        let json = serde_json::to_value(block("b1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "NUMPAD_BLOCK",
                "id": "b1",
                "input": "236p",
                "type": "CLASSIC",
                "x": 0.1,
                "y": 0.2
            })
        );
    }

    #[test]
    fn arrow_json_defaults_anchor_sides() {
        let json = r#"{
            "kind": "ARROW",
            "id": "a1",
            "startNodeId": "b1",
            "endNodeId": null,
            "points": [0, 0, 0.1, 0.05]
        }"#;
        let node: CanvasNode = serde_json::from_str(json).unwrap();
        let arrow = node.as_arrow().unwrap();
        assert_eq!(arrow.start_anchor, AnchorSide::Right);
        assert_eq!(arrow.end_anchor, None);
        assert_eq!(arrow.end_offset(), Some((0.1, 0.05)));
        assert!(node.references(NodeId::intern("b1")));
        assert!(!node.references(NodeId::intern("b2")));
    }

    #[test]
    fn move_image_json_reads_nested_reference() {
        let json = r#"{
            "kind": "CHARACTER_MOVE_IMAGE",
            "id": "img",
            "x": 0.3,
            "y": 0.4,
            "rotation": 0,
            "characterMoveImage": {
                "fileName": "5lp.png",
                "filePath": "/images/ryu/5lp.png",
                "width": 320,
                "height": 240
            }
        }"#;
        let node: CanvasNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind(), NodeKind::CharacterMoveImage);
        assert_eq!(node.position(), Some(Point::new(0.3, 0.4)));
    }

    #[test]
    fn apply_merges_only_relevant_fields() {
        let mut node = block("b1");
        let changed = node.apply(&NodePatch {
            position: Some(Point::new(0.5, 0.6)),
            rotation: Some(45.0),
            input: Some("22k".into()),
            ..NodePatch::default()
        });
        assert!(changed);
        match node {
            CanvasNode::NumpadBlock(b) => {
                assert_eq!((b.x, b.y), (0.5, 0.6));
                assert_eq!(b.input, "22k");
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn apply_reports_no_change() {
        let mut node = block("b1");
        assert!(!node.apply(&NodePatch::position(0.1, 0.2)));
    }

    #[test]
    fn apply_rebinds_arrow_end() {
        let mut node = CanvasNode::Arrow(Arrow {
            id: NodeId::intern("a"),
            start_node_id: NodeId::intern("b1"),
            end_node_id: None,
            points: vec![0.0, 0.0, 0.1, 0.1],
            start_anchor: AnchorSide::Right,
            end_anchor: None,
        });
        let patch = NodePatch {
            end: Some(Some((NodeId::intern("b2"), AnchorSide::Left))),
            ..NodePatch::default()
        };
        assert!(node.apply(&patch));
        assert!(node.references(NodeId::intern("b2")));
    }

    #[test]
    fn render_rank_follows_fixed_precedence() {
        assert!(NodeKind::NumpadBlock.render_rank() < NodeKind::CharacterMoveImage.render_rank());
        assert!(NodeKind::CharacterMoveImage.render_rank() < NodeKind::Arrow.render_rank());
    }

    #[test]
    fn youtube_id_is_extracted_from_embed_url() {
        let src = "https://www.youtube.com/embed/dQw4w9WgXcQ?start=12";
        assert_eq!(youtube_video_id(src), Some("dQw4w9WgXcQ"));
        assert_eq!(
            youtube_thumbnail_url(src).as_deref(),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );
        assert_eq!(youtube_video_id("https://youtu.be/abc"), None);
    }
}
