//! Request/response bodies exchanged with the canvas backend.
//!
//! Node bodies reuse the model structs; create requests add the owning
//! `stageId`, sync requests batch every node of one kind.

use crate::id::NodeId;
use crate::model::{
    Arrow, CanvasNode, CharacterMoveImage, NodeKind, NumpadBlock, Stage, Text, Video,
};
use serde::{Deserialize, Serialize};

/// Result of a backend delete, including cascaded removals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub ok: bool,
    pub deleted_entity_ids: Vec<NodeId>,
}

impl DeleteSummary {
    pub fn confirmed(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            ok: true,
            deleted_entity_ids: ids.into_iter().collect(),
        }
    }
}

/// Stage as listed by `GET /canvas/stage`.
pub type StageDto = Stage;

/// Rename request for a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStageDto {
    pub id: NodeId,
    pub name: String,
}

/// Create body: the node's own fields plus the stage it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeDto<'a, T> {
    #[serde(flatten)]
    pub node: &'a T,
    pub stage_id: NodeId,
}

/// Serialise the kind-specific create body for `node`.
pub fn create_body(stage_id: NodeId, node: &CanvasNode) -> serde_json::Result<serde_json::Value> {
    match node {
        CanvasNode::NumpadBlock(n) => serde_json::to_value(CreateNodeDto { node: n, stage_id }),
        CanvasNode::CharacterMoveImage(n) => {
            serde_json::to_value(CreateNodeDto { node: n, stage_id })
        }
        CanvasNode::Arrow(n) => serde_json::to_value(CreateNodeDto { node: n, stage_id }),
        CanvasNode::Text(n) => serde_json::to_value(CreateNodeDto { node: n, stage_id }),
        CanvasNode::Video(n) => serde_json::to_value(CreateNodeDto { node: n, stage_id }),
    }
}

/// Serialise the kind-specific update body (no `kind` tag).
pub fn update_body(node: &CanvasNode) -> serde_json::Result<serde_json::Value> {
    match node {
        CanvasNode::NumpadBlock(n) => serde_json::to_value(n),
        CanvasNode::CharacterMoveImage(n) => serde_json::to_value(n),
        CanvasNode::Arrow(n) => serde_json::to_value(n),
        CanvasNode::Text(n) => serde_json::to_value(n),
        CanvasNode::Video(n) => serde_json::to_value(n),
    }
}

/// Decode an untagged kind-specific node body (as returned by create/update).
pub fn decode_node(kind: NodeKind, json: &str) -> serde_json::Result<CanvasNode> {
    Ok(match kind {
        NodeKind::NumpadBlock => CanvasNode::NumpadBlock(serde_json::from_str(json)?),
        NodeKind::CharacterMoveImage => CanvasNode::CharacterMoveImage(serde_json::from_str(json)?),
        NodeKind::Arrow => CanvasNode::Arrow(serde_json::from_str(json)?),
        NodeKind::Text => CanvasNode::Text(serde_json::from_str(json)?),
        NodeKind::Video => CanvasNode::Video(serde_json::from_str(json)?),
    })
}

/// Decode the untagged node array returned by `GET /canvas/<kind>/get/:stageId`.
pub fn decode_nodes(kind: NodeKind, json: &str) -> serde_json::Result<Vec<CanvasNode>> {
    fn wrap<T: serde::de::DeserializeOwned>(
        json: &str,
        f: fn(T) -> CanvasNode,
    ) -> serde_json::Result<Vec<CanvasNode>> {
        let items: Vec<T> = serde_json::from_str(json)?;
        Ok(items.into_iter().map(f).collect())
    }
    match kind {
        NodeKind::NumpadBlock => wrap(json, CanvasNode::NumpadBlock),
        NodeKind::CharacterMoveImage => wrap(json, CanvasNode::CharacterMoveImage),
        NodeKind::Arrow => wrap(json, CanvasNode::Arrow),
        NodeKind::Text => wrap(json, CanvasNode::Text),
        NodeKind::Video => wrap(json, CanvasNode::Video),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncNumpadBlocks {
    pub stage_id: NodeId,
    pub blocks: Vec<NumpadBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncArrows {
    pub stage_id: NodeId,
    pub arrows: Vec<Arrow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCharacterMoveImages {
    pub stage_id: NodeId,
    pub character_move_images: Vec<CharacterMoveImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTexts {
    pub stage_id: NodeId,
    pub texts: Vec<Text>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncVideos {
    pub stage_id: NodeId,
    pub videos: Vec<Video>,
}

/// Full replacement of one kind's nodes on a stage (`PUT .../sync`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SyncPayload {
    NumpadBlocks(SyncNumpadBlocks),
    Arrows(SyncArrows),
    CharacterMoveImages(SyncCharacterMoveImages),
    Texts(SyncTexts),
    Videos(SyncVideos),
}

impl SyncPayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            SyncPayload::NumpadBlocks(_) => NodeKind::NumpadBlock,
            SyncPayload::Arrows(_) => NodeKind::Arrow,
            SyncPayload::CharacterMoveImages(_) => NodeKind::CharacterMoveImage,
            SyncPayload::Texts(_) => NodeKind::Text,
            SyncPayload::Videos(_) => NodeKind::Video,
        }
    }

    pub fn stage_id(&self) -> NodeId {
        match self {
            SyncPayload::NumpadBlocks(p) => p.stage_id,
            SyncPayload::Arrows(p) => p.stage_id,
            SyncPayload::CharacterMoveImages(p) => p.stage_id,
            SyncPayload::Texts(p) => p.stage_id,
            SyncPayload::Videos(p) => p.stage_id,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SyncPayload::NumpadBlocks(p) => p.blocks.len(),
            SyncPayload::Arrows(p) => p.arrows.len(),
            SyncPayload::CharacterMoveImages(p) => p.character_move_images.len(),
            SyncPayload::Texts(p) => p.texts.len(),
            SyncPayload::Videos(p) => p.videos.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload's nodes wrapped back into `CanvasNode`.
    pub fn into_nodes(self) -> Vec<CanvasNode> {
        match self {
            SyncPayload::NumpadBlocks(p) => p.blocks.into_iter().map(CanvasNode::NumpadBlock).collect(),
            SyncPayload::Arrows(p) => p.arrows.into_iter().map(CanvasNode::Arrow).collect(),
            SyncPayload::CharacterMoveImages(p) => p
                .character_move_images
                .into_iter()
                .map(CanvasNode::CharacterMoveImage)
                .collect(),
            SyncPayload::Texts(p) => p.texts.into_iter().map(CanvasNode::Text).collect(),
            SyncPayload::Videos(p) => p.videos.into_iter().map(CanvasNode::Video).collect(),
        }
    }
}
