//! The backend collaborator: persistence of stages and canvas nodes.
//!
//! `CanvasBackend` is the seam between the editor and wherever nodes live.
//! `HttpBackend` talks to the real service; `MemoryBackend` keeps everything
//! in process for tests and offline demos.

use crate::error::BackendError;
use async_trait::async_trait;
use fgc_core::dto::{DeleteSummary, SyncPayload, UpdateStageDto};
use fgc_core::{CanvasNode, NodeId, NodeKind, Stage};
use std::cell::{Cell, RefCell};

/// Async persistence operations. Futures are not `Send`: the editor runs on a
/// single cooperative thread.
#[async_trait(?Send)]
pub trait CanvasBackend {
    /// Stages owned by the session user.
    async fn list_stages(&self) -> Result<Vec<Stage>, BackendError>;

    async fn create_stage(&self, stage: &Stage) -> Result<Stage, BackendError>;

    async fn rename_stage(&self, update: &UpdateStageDto) -> Result<Stage, BackendError>;

    /// Delete a stage and, server-side, every node on it.
    async fn delete_stage(&self, stage_id: NodeId) -> Result<DeleteSummary, BackendError>;

    /// All nodes of one kind on a stage.
    async fn load_nodes(
        &self,
        stage_id: NodeId,
        kind: NodeKind,
    ) -> Result<Vec<CanvasNode>, BackendError>;

    async fn create(&self, stage_id: NodeId, node: &CanvasNode) -> Result<CanvasNode, BackendError>;

    async fn update(&self, node: &CanvasNode) -> Result<CanvasNode, BackendError>;

    /// Delete one node. The summary lists every id removed, cascades included.
    async fn delete(&self, kind: NodeKind, id: NodeId) -> Result<DeleteSummary, BackendError>;

    /// Replace every node of the payload's kind on its stage.
    async fn sync(&self, payload: &SyncPayload) -> Result<(), BackendError>;
}

// ─── In-memory backend ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryState {
    stages: Vec<Stage>,
    /// `(stage, node)` in creation order.
    nodes: Vec<(NodeId, CanvasNode)>,
    fail_next_delete: Option<BackendError>,
}

/// In-process backend mirroring the service's rules: deleting a node also
/// deletes every arrow attached to it, and deleting a stage deletes its nodes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<MemoryState>,
    delete_calls: Cell<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stage(self, stage: Stage) -> Self {
        self.state.borrow_mut().stages.push(stage);
        self
    }

    /// Insert a node directly, bypassing `create`.
    pub fn seed(&self, stage_id: NodeId, node: CanvasNode) {
        self.state.borrow_mut().nodes.push((stage_id, node));
    }

    /// Snapshot of every node stored for `stage_id`.
    pub fn nodes(&self, stage_id: NodeId) -> Vec<CanvasNode> {
        self.state
            .borrow()
            .nodes
            .iter()
            .filter(|(stage, _)| *stage == stage_id)
            .map(|(_, node)| node.clone())
            .collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.state.borrow().nodes.iter().any(|(_, n)| n.id() == id)
    }

    /// Make the next `delete` call fail with `err`.
    pub fn fail_next_delete(&self, err: BackendError) {
        self.state.borrow_mut().fail_next_delete = Some(err);
    }

    /// Number of `delete` calls received, failed ones included.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.get()
    }
}

#[async_trait(?Send)]
impl CanvasBackend for MemoryBackend {
    async fn list_stages(&self) -> Result<Vec<Stage>, BackendError> {
        tokio::task::yield_now().await;
        Ok(self.state.borrow().stages.clone())
    }

    async fn create_stage(&self, stage: &Stage) -> Result<Stage, BackendError> {
        tokio::task::yield_now().await;
        self.state.borrow_mut().stages.push(stage.clone());
        Ok(stage.clone())
    }

    async fn rename_stage(&self, update: &UpdateStageDto) -> Result<Stage, BackendError> {
        tokio::task::yield_now().await;
        let mut state = self.state.borrow_mut();
        let stage = state
            .stages
            .iter_mut()
            .find(|s| s.id == update.id)
            .ok_or_else(|| BackendError::NotFound(format!("stage {}", update.id)))?;
        stage.name.clone_from(&update.name);
        Ok(stage.clone())
    }

    async fn delete_stage(&self, stage_id: NodeId) -> Result<DeleteSummary, BackendError> {
        tokio::task::yield_now().await;
        let mut state = self.state.borrow_mut();
        let before = state.stages.len();
        state.stages.retain(|s| s.id != stage_id);
        if state.stages.len() == before {
            return Err(BackendError::NotFound(format!("stage {stage_id}")));
        }
        let mut deleted = vec![stage_id];
        state.nodes.retain(|(stage, node)| {
            let keep = *stage != stage_id;
            if !keep {
                deleted.push(node.id());
            }
            keep
        });
        Ok(DeleteSummary::confirmed(deleted))
    }

    async fn load_nodes(
        &self,
        stage_id: NodeId,
        kind: NodeKind,
    ) -> Result<Vec<CanvasNode>, BackendError> {
        tokio::task::yield_now().await;
        Ok(self
            .nodes(stage_id)
            .into_iter()
            .filter(|n| n.kind() == kind)
            .collect())
    }

    async fn create(&self, stage_id: NodeId, node: &CanvasNode) -> Result<CanvasNode, BackendError> {
        tokio::task::yield_now().await;
        let mut state = self.state.borrow_mut();
        if !state.stages.iter().any(|s| s.id == stage_id) {
            return Err(BackendError::NotFound(format!("stage {stage_id}")));
        }
        state.nodes.retain(|(_, n)| n.id() != node.id());
        state.nodes.push((stage_id, node.clone()));
        Ok(node.clone())
    }

    async fn update(&self, node: &CanvasNode) -> Result<CanvasNode, BackendError> {
        tokio::task::yield_now().await;
        let mut state = self.state.borrow_mut();
        let slot = state
            .nodes
            .iter_mut()
            .find(|(_, n)| n.id() == node.id())
            .ok_or_else(|| BackendError::NotFound(format!("node {}", node.id())))?;
        slot.1 = node.clone();
        Ok(node.clone())
    }

    async fn delete(&self, kind: NodeKind, id: NodeId) -> Result<DeleteSummary, BackendError> {
        self.delete_calls.set(self.delete_calls.get() + 1);
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_next_delete.take() {
            return Err(err);
        }
        let found = state
            .nodes
            .iter()
            .any(|(_, n)| n.id() == id && n.kind() == kind);
        if !found {
            return Err(BackendError::NotFound(format!("{} {id}", kind.route())));
        }

        let mut deleted = vec![id];
        state.nodes.retain(|(_, n)| {
            let doomed = n.id() == id || n.references(id);
            if doomed && n.id() != id {
                deleted.push(n.id());
            }
            !doomed
        });
        log::debug!("memory backend: deleted {deleted:?}");
        Ok(DeleteSummary::confirmed(deleted))
    }

    async fn sync(&self, payload: &SyncPayload) -> Result<(), BackendError> {
        tokio::task::yield_now().await;
        let stage_id = payload.stage_id();
        let kind = payload.kind();
        let mut state = self.state.borrow_mut();
        state
            .nodes
            .retain(|(stage, n)| !(*stage == stage_id && n.kind() == kind));
        state.nodes.extend(
            payload
                .clone()
                .into_nodes()
                .into_iter()
                .map(|n| (stage_id, n)),
        );
        Ok(())
    }
}
