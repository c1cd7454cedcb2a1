//! Node Data Store: the authoritative node collection for one stage.
//!
//! State lives behind a `RefCell` so every operation takes `&self`; several
//! deletes on different ids may be awaiting the backend at once on one
//! thread. No borrow is ever held across an `.await`.
//!
//! Every mutation is journaled as a `StoreEvent`; the scene manager drains
//! the journal to keep drawables in step.

use crate::backend::CanvasBackend;
use crate::error::StoreError;
use fgc_core::dto::{SyncArrows, SyncCharacterMoveImages, SyncNumpadBlocks, SyncPayload};
use fgc_core::{CanvasNode, NodeId, NodeKind, NodePatch};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Kinds loaded by `hydrate`, in load order.
const HYDRATE_ORDER: [NodeKind; 3] = [
    NodeKind::NumpadBlock,
    NodeKind::CharacterMoveImage,
    NodeKind::Arrow,
];

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Added(NodeId),
    Updated(NodeId),
    /// Carries the removed node so listeners can still inspect it.
    Removed(CanvasNode),
}

#[derive(Debug, Default)]
struct StoreState {
    nodes: HashMap<NodeId, CanvasNode>,
    /// Encounter order; ties in render order fall back to it.
    encounter: Vec<NodeId>,
    /// Render order, rebuilt after every add/remove.
    order: Vec<NodeId>,
    in_flight: HashSet<NodeId>,
    events: Vec<StoreEvent>,
    dirty: bool,
    last_sync: Option<Instant>,
}

impl StoreState {
    fn rebuild_order(&mut self) {
        let mut order = self.encounter.clone();
        // `sort_by_key` is stable: same-kind nodes keep encounter order.
        order.sort_by_key(|id| self.nodes.get(id).map_or(u8::MAX, |n| n.kind().render_rank()));
        self.order = order;
    }

    fn remove(&mut self, id: NodeId) -> Option<CanvasNode> {
        let node = self.nodes.remove(&id)?;
        self.encounter.retain(|e| *e != id);
        self.events.push(StoreEvent::Removed(node.clone()));
        Some(node)
    }
}

/// Clears an id's in-flight mark on every exit path of `delete`.
struct InFlightGuard<'a> {
    state: &'a RefCell<StoreState>,
    id: NodeId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.borrow_mut().in_flight.remove(&self.id);
    }
}

#[derive(Debug, Default)]
pub struct NodeDataStore {
    state: RefCell<StoreState>,
}

impl NodeDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a node by id and return the stored node.
    /// Overwrites keep the node's place in encounter order. Refused (`None`)
    /// while the id is being deleted.
    pub fn add(&self, node: CanvasNode) -> Option<CanvasNode> {
        let id = node.id();
        let mut state = self.state.borrow_mut();
        if state.in_flight.contains(&id) {
            log::warn!("store: refusing add of {id} while its delete is in flight");
            return None;
        }
        let stored = node.clone();
        let event = if state.nodes.insert(id, node).is_some() {
            StoreEvent::Updated(id)
        } else {
            state.encounter.push(id);
            StoreEvent::Added(id)
        };
        log::debug!("store: {event:?}");
        state.events.push(event);
        state.dirty = true;
        state.rebuild_order();
        Some(stored)
    }

    /// Merge `patch` into the node `id`. No-op when the id is unknown, mid
    /// delete, or nothing changed. Never writes to the backend.
    pub fn update(&self, id: NodeId, patch: &NodePatch) -> bool {
        let mut state = self.state.borrow_mut();
        if state.in_flight.contains(&id) {
            log::debug!("store: ignoring update of {id}, delete in flight");
            return false;
        }
        let changed = match state.nodes.get_mut(&id) {
            Some(node) => node.apply(patch),
            None => return false,
        };
        if changed {
            state.events.push(StoreEvent::Updated(id));
            state.dirty = true;
        }
        changed
    }

    /// Delete `id` through the backend, then drop every id the backend
    /// reports as deleted. Returns the ids removed locally.
    ///
    /// Unknown ids are a no-op. On failure local state is left unchanged.
    pub async fn delete<B>(&self, backend: &B, id: NodeId) -> Result<Vec<NodeId>, StoreError>
    where
        B: CanvasBackend + ?Sized,
    {
        let kind = {
            let mut state = self.state.borrow_mut();
            let Some(kind) = state.nodes.get(&id).map(CanvasNode::kind) else {
                log::debug!("store: delete of unknown {id} ignored");
                return Ok(Vec::new());
            };
            if !state.in_flight.insert(id) {
                return Err(StoreError::DeleteInFlight(id));
            }
            kind
        };
        let _guard = InFlightGuard {
            state: &self.state,
            id,
        };

        let summary = backend.delete(kind, id).await.map_err(|e| {
            log::warn!("store: delete of {id} failed: {e}");
            e
        })?;
        if !summary.ok {
            log::warn!("store: backend did not confirm delete of {id}");
            return Err(StoreError::DeleteNotConfirmed(id));
        }

        let mut state = self.state.borrow_mut();
        let removed: Vec<NodeId> = summary
            .deleted_entity_ids
            .iter()
            .filter_map(|deleted| state.remove(*deleted).map(|n| n.id()))
            .collect();
        state.rebuild_order();
        log::info!("store: deleted {id}, removed {removed:?}");
        Ok(removed)
    }

    /// Drop a node the backend never knew about. Refused while in flight.
    pub fn discard(&self, id: NodeId) -> Option<CanvasNode> {
        let mut state = self.state.borrow_mut();
        if state.in_flight.contains(&id) {
            return None;
        }
        let node = state.remove(id)?;
        state.dirty = true;
        state.rebuild_order();
        log::debug!("store: discarded unsynced {id}");
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<CanvasNode> {
        self.state.borrow().nodes.get(&id).cloned()
    }

    /// Run `f` on the node without cloning it.
    pub fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&CanvasNode) -> R) -> Option<R> {
        self.state.borrow().nodes.get(&id).map(f)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.state.borrow().nodes.contains_key(&id)
    }

    pub fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.with_node(id, CanvasNode::kind)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node ids in render order.
    pub fn ordered_ids(&self) -> Vec<NodeId> {
        self.state.borrow().order.clone()
    }

    /// Nodes in render order: blocks, images, arrows, then the rest.
    pub fn ordered(&self) -> Vec<CanvasNode> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .filter_map(|id| state.nodes.get(id).cloned())
            .collect()
    }

    /// Arrows whose start or end is `id`.
    pub fn arrows_referencing(&self, id: NodeId) -> Vec<NodeId> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .filter(|a| state.nodes.get(a).is_some_and(|n| n.references(id)))
            .copied()
            .collect()
    }

    /// True while any delete is awaiting the backend.
    pub fn is_busy(&self) -> bool {
        !self.state.borrow().in_flight.is_empty()
    }

    pub fn is_deleting(&self, id: NodeId) -> bool {
        self.state.borrow().in_flight.contains(&id)
    }

    /// Drain the change journal.
    pub fn take_events(&self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }

    /// Drop every node without journaling.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.nodes.clear();
        state.encounter.clear();
        state.order.clear();
        state.events.clear();
        state.dirty = false;
    }

    /// Replace the contents with the stage's nodes from the backend.
    ///
    /// Blocks, then images, then arrows. Nothing changes unless every load
    /// succeeds. The journal is left empty; callers rebuild the scene.
    pub async fn hydrate<B>(&self, backend: &B, stage_id: NodeId) -> Result<usize, StoreError>
    where
        B: CanvasBackend + ?Sized,
    {
        let mut loaded = Vec::new();
        for kind in HYDRATE_ORDER {
            loaded.extend(backend.load_nodes(stage_id, kind).await?);
        }
        self.clear();
        let count = loaded.len();
        for node in loaded {
            self.add(node);
        }
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.dirty = false;
        state.last_sync = Some(Instant::now());
        log::info!("store: hydrated {count} nodes for stage {stage_id}");
        Ok(count)
    }

    /// Full-replacement payloads for the kinds the backend syncs.
    pub fn sync_payloads(&self, stage_id: NodeId) -> Vec<SyncPayload> {
        let mut blocks = Vec::new();
        let mut images = Vec::new();
        let mut arrows = Vec::new();
        for node in self.ordered() {
            match node {
                CanvasNode::NumpadBlock(b) => blocks.push(b),
                CanvasNode::CharacterMoveImage(i) => images.push(i),
                CanvasNode::Arrow(a) => arrows.push(a),
                CanvasNode::Text(_) | CanvasNode::Video(_) => {}
            }
        }
        vec![
            SyncPayload::NumpadBlocks(SyncNumpadBlocks { stage_id, blocks }),
            SyncPayload::CharacterMoveImages(SyncCharacterMoveImages {
                stage_id,
                character_move_images: images,
            }),
            SyncPayload::Arrows(SyncArrows { stage_id, arrows }),
        ]
    }

    /// Record a successful sync.
    pub fn mark_synced(&self) {
        let mut state = self.state.borrow_mut();
        state.dirty = false;
        state.last_sync = Some(Instant::now());
    }

    /// Local changes not yet pushed with a sync.
    pub fn is_dirty(&self) -> bool {
        self.state.borrow().dirty
    }

    pub fn last_sync(&self) -> Option<Instant> {
        self.state.borrow().last_sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::BackendError;
    use fgc_core::dto::DeleteSummary;
    use fgc_core::{
        AnchorSide, Arrow, CharacterMoveImage, CharacterRef, ControllerType, ImageRef,
        NumpadBlock, Stage,
    };
    use pretty_assertions::assert_eq;
    use std::task::Poll;

    fn block(id: &str) -> CanvasNode {
        CanvasNode::NumpadBlock(NumpadBlock {
            id: NodeId::intern(id),
            input: "5mp".into(),
            controller_type: ControllerType::Classic,
            x: 0.1,
            y: 0.2,
        })
    }

    fn image(id: &str) -> CanvasNode {
        CanvasNode::CharacterMoveImage(CharacterMoveImage {
            id: NodeId::intern(id),
            x: 0.5,
            y: 0.5,
            image_ref: ImageRef {
                file_name: None,
                file_path: "/img/ryu-5mp.png".into(),
                width: 200.0,
                height: 400.0,
                character_id: None,
            },
            scale_x: None,
            scale_y: None,
            rotation: 0.0,
        })
    }

    fn arrow(id: &str, start: &str) -> CanvasNode {
        CanvasNode::Arrow(Arrow {
            id: NodeId::intern(id),
            start_node_id: NodeId::intern(start),
            end_node_id: None,
            points: vec![0.0, 0.0, 0.05, 0.0],
            start_anchor: AnchorSide::Right,
            end_anchor: None,
        })
    }

    fn stage(id: &str) -> Stage {
        Stage {
            id: NodeId::intern(id),
            name: "test".into(),
            character_me: CharacterRef { id: 1, name: "Ryu".into() },
            character_opponent: CharacterRef { id: 2, name: "Ken".into() },
        }
    }

    fn names(ids: &[NodeId]) -> Vec<&'static str> {
        ids.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn render_order_groups_by_kind_stably() {
        let store = NodeDataStore::new();
        store.add(arrow("ro-a1", "ro-b1"));
        store.add(image("ro-i1"));
        store.add(block("ro-b1"));
        store.add(arrow("ro-a2", "ro-b1"));
        store.add(block("ro-b2"));
        store.add(image("ro-i2"));
        assert_eq!(
            names(&store.ordered_ids()),
            ["ro-b1", "ro-b2", "ro-i1", "ro-i2", "ro-a1", "ro-a2"]
        );
    }

    #[test]
    fn overwrite_keeps_encounter_position() {
        let store = NodeDataStore::new();
        store.add(block("ow-1"));
        store.add(block("ow-2"));
        assert_eq!(store.add(block("ow-1")), Some(block("ow-1")));
        assert_eq!(names(&store.ordered_ids()), ["ow-1", "ow-2"]);
        assert_eq!(
            store.take_events(),
            [
                StoreEvent::Added(NodeId::intern("ow-1")),
                StoreEvent::Added(NodeId::intern("ow-2")),
                StoreEvent::Updated(NodeId::intern("ow-1")),
            ]
        );
    }

    #[test]
    fn update_merges_and_journals_only_changes() {
        let store = NodeDataStore::new();
        let id = NodeId::intern("up-1");
        store.add(block("up-1"));
        store.take_events();

        assert!(store.update(id, &NodePatch::position(0.3, 0.4)));
        assert!(!store.update(id, &NodePatch::position(0.3, 0.4)));
        assert!(!store.update(NodeId::intern("up-missing"), &NodePatch::input("2")));
        assert_eq!(store.take_events(), [StoreEvent::Updated(id)]);
        assert_eq!(
            store.with_node(id, |n| n.position()),
            Some(Some(kurbo::Point::new(0.3, 0.4)))
        );
    }

    #[test]
    fn discard_drops_locally_and_journals() {
        let store = NodeDataStore::new();
        store.add(arrow("ds-a", "ds-b"));
        store.mark_synced();
        store.take_events();

        let dropped = store.discard(NodeId::intern("ds-a"));
        assert_eq!(dropped, Some(arrow("ds-a", "ds-b")));
        assert!(store.is_empty());
        assert!(store.is_dirty());
        assert_eq!(store.take_events(), [StoreEvent::Removed(arrow("ds-a", "ds-b"))]);
        assert_eq!(store.discard(NodeId::intern("ds-a")), None);
    }

    #[tokio::test]
    async fn delete_removes_everything_the_backend_reports() {
        let backend = MemoryBackend::new().with_stage(stage("dl-stage"));
        let s = NodeId::intern("dl-stage");
        let store = NodeDataStore::new();
        for node in [block("dl-b1"), block("dl-b2"), arrow("dl-a1", "dl-b1"), arrow("dl-a2", "dl-b1"), arrow("dl-a3", "dl-b2")] {
            backend.seed(s, node.clone());
            store.add(node);
        }

        let removed = store.delete(&backend, NodeId::intern("dl-b1")).await.unwrap();
        assert_eq!(names(&removed), ["dl-b1", "dl-a1", "dl-a2"]);
        assert_eq!(names(&store.ordered_ids()), ["dl-b2", "dl-a3"]);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn unknown_id_never_reaches_the_backend() {
        let backend = MemoryBackend::new();
        let store = NodeDataStore::new();
        let removed = store.delete(&backend, NodeId::intern("dl-nope")).await.unwrap();
        assert!(removed.is_empty());
        assert_eq!(backend.delete_calls(), 0);
    }

    #[tokio::test]
    async fn failed_delete_leaves_state_and_clears_busy() {
        let backend = MemoryBackend::new().with_stage(stage("fail-stage"));
        let store = NodeDataStore::new();
        backend.seed(NodeId::intern("fail-stage"), block("fail-b1"));
        store.add(block("fail-b1"));
        backend.fail_next_delete(BackendError::Unauthorized);

        let err = store.delete(&backend, NodeId::intern("fail-b1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(BackendError::Unauthorized)));
        assert!(store.contains(NodeId::intern("fail-b1")));
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn second_delete_of_same_id_is_refused_while_in_flight() {
        let backend = MemoryBackend::new().with_stage(stage("if-stage"));
        let s = NodeId::intern("if-stage");
        let store = NodeDataStore::new();
        for node in [block("if-b1"), block("if-b2")] {
            backend.seed(s, node.clone());
            store.add(node);
        }
        let b1 = NodeId::intern("if-b1");
        let b2 = NodeId::intern("if-b2");

        let (first, second, other) = tokio::join!(
            store.delete(&backend, b1),
            store.delete(&backend, b1),
            store.delete(&backend, b2),
        );
        // Whichever b1 delete was polled first wins; the other is refused.
        let (won, refused) = match (first, second) {
            (Ok(ids), Err(e)) | (Err(e), Ok(ids)) => (ids, e),
            other => panic!("expected exactly one refused delete, got {other:?}"),
        };
        assert_eq!(names(&won), ["if-b1"]);
        assert!(matches!(refused, StoreError::DeleteInFlight(id) if id == b1));
        assert_eq!(names(&other.unwrap()), ["if-b2"]);
        assert_eq!(backend.delete_calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn updates_are_refused_while_deleting() {
        let backend = MemoryBackend::new().with_stage(stage("ud-stage"));
        let store = NodeDataStore::new();
        let id = NodeId::intern("ud-b1");
        backend.seed(NodeId::intern("ud-stage"), block("ud-b1"));
        store.add(block("ud-b1"));

        // Poll once: the delete parks on the backend round-trip.
        let mut pending = Box::pin(store.delete(&backend, id));
        let first = std::future::poll_fn(|cx| Poll::Ready(pending.as_mut().poll(cx))).await;
        assert!(first.is_pending());
        assert!(store.is_busy());
        assert!(store.is_deleting(id));
        assert!(!store.update(id, &NodePatch::position(0.9, 0.9)));
        assert_eq!(store.add(block("ud-b1")), None);

        assert!(pending.await.is_ok());
        assert!(!store.is_deleting(id));
    }

    struct Unconfirmed;

    #[async_trait::async_trait(?Send)]
    impl CanvasBackend for Unconfirmed {
        async fn list_stages(&self) -> Result<Vec<Stage>, BackendError> {
            Ok(Vec::new())
        }
        async fn create_stage(&self, stage: &Stage) -> Result<Stage, BackendError> {
            Ok(stage.clone())
        }
        async fn rename_stage(&self, _: &fgc_core::dto::UpdateStageDto) -> Result<Stage, BackendError> {
            Err(BackendError::Rejected { status: 501 })
        }
        async fn delete_stage(&self, _: NodeId) -> Result<DeleteSummary, BackendError> {
            Ok(DeleteSummary::default())
        }
        async fn load_nodes(&self, _: NodeId, _: NodeKind) -> Result<Vec<CanvasNode>, BackendError> {
            Ok(Vec::new())
        }
        async fn create(&self, _: NodeId, node: &CanvasNode) -> Result<CanvasNode, BackendError> {
            Ok(node.clone())
        }
        async fn update(&self, node: &CanvasNode) -> Result<CanvasNode, BackendError> {
            Ok(node.clone())
        }
        async fn delete(&self, _: NodeKind, _: NodeId) -> Result<DeleteSummary, BackendError> {
            Ok(DeleteSummary::default())
        }
        async fn sync(&self, _: &SyncPayload) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unconfirmed_delete_is_an_error() {
        let store = NodeDataStore::new();
        let id = NodeId::intern("uc-b1");
        store.add(block("uc-b1"));
        let err = store.delete(&Unconfirmed, id).await.unwrap_err();
        assert!(matches!(err, StoreError::DeleteNotConfirmed(e) if e == id));
        assert!(store.contains(id));
    }

    #[tokio::test]
    async fn hydrate_loads_kinds_in_order_and_resets_journal() {
        let backend = MemoryBackend::new().with_stage(stage("hy-stage"));
        let s = NodeId::intern("hy-stage");
        backend.seed(s, arrow("hy-a1", "hy-b1"));
        backend.seed(s, image("hy-i1"));
        backend.seed(s, block("hy-b1"));

        let store = NodeDataStore::new();
        store.add(block("hy-stale"));
        assert_eq!(store.hydrate(&backend, s).await.unwrap(), 3);
        assert_eq!(names(&store.ordered_ids()), ["hy-b1", "hy-i1", "hy-a1"]);
        assert!(store.take_events().is_empty());
        assert!(!store.is_dirty());
        assert!(store.last_sync().is_some());
    }

    #[test]
    fn sync_payloads_cover_persisted_kinds() {
        let store = NodeDataStore::new();
        store.add(block("sp-b1"));
        store.add(arrow("sp-a1", "sp-b1"));
        assert!(store.is_dirty());
        let payloads = store.sync_payloads(NodeId::intern("sp-stage"));
        let sizes: Vec<(NodeKind, usize)> = payloads.iter().map(|p| (p.kind(), p.len())).collect();
        assert_eq!(
            sizes,
            [
                (NodeKind::NumpadBlock, 1),
                (NodeKind::CharacterMoveImage, 0),
                (NodeKind::Arrow, 1),
            ]
        );
        store.mark_synced();
        assert!(!store.is_dirty());
    }
}
