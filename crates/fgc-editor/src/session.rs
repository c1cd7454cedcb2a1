//! Canvas session: one open stage wired to a backend and an image loader.
//!
//! The session owns the store, the scene and the feature slot, routes input
//! between them, and runs the async follow-ups a mutation needs (image
//! loads, cascading arrow deletes).

use crate::assets::ImageLoader;
use crate::backend::CanvasBackend;
use crate::error::{BackendError, StoreError};
use crate::feature::{FeatureManager, FeatureStatus, FeatureType};
use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::NodeDataStore;
use crate::sync::SceneManager;
use crate::tools::Interaction;
use fgc_core::{CanvasNode, EngineConfig, NodeId, NodePatch, UserSettings};
use fgc_scene::hit_test;
use kurbo::Point;
use std::rc::Rc;

pub struct CanvasSession<B, L> {
    backend: B,
    loader: L,
    store: Rc<NodeDataStore>,
    scene: SceneManager,
    features: FeatureManager<SceneManager>,
    stage: Option<NodeId>,
    /// Set when a gesture ended on pointer-up; the host's trailing click
    /// for the same press is swallowed.
    suppress_click: bool,
}

impl<B: CanvasBackend, L: ImageLoader> CanvasSession<B, L> {
    pub fn new(backend: B, loader: L, settings: UserSettings, config: EngineConfig) -> Self {
        let store = Rc::new(NodeDataStore::new());
        let scene = SceneManager::new(Rc::clone(&store), settings, config);
        Self {
            backend,
            loader,
            store,
            scene,
            features: FeatureManager::new(),
            stage: None,
            suppress_click: false,
        }
    }

    /// Load `stage_id` from the backend and draw it. Returns the node count.
    pub async fn open(&mut self, stage_id: NodeId) -> Result<usize, StoreError> {
        self.features.deactivate(&mut self.scene);
        let count = self.store.hydrate(&self.backend, stage_id).await?;
        self.stage = Some(stage_id);
        self.scene.initialize_from_store();
        let images = self.pump_images().await;
        log::info!("session: opened stage {stage_id} ({count} nodes, {images} images)");
        Ok(count)
    }

    pub async fn handle_input(&mut self, event: InputEvent) -> Result<(), StoreError> {
        if let InputEvent::Key {
            key,
            ctrl,
            shift,
            alt,
            meta,
        } = &event
        {
            return self
                .run_shortcut(ShortcutMap::resolve(key, *ctrl, *shift, *alt, *meta))
                .await;
        }

        match self.features.dispatch(&event, &mut self.scene) {
            FeatureStatus::Ignored => self.handle_default(&event),
            FeatureStatus::Finished | FeatureStatus::Abandoned
                if matches!(event, InputEvent::PointerUp { .. }) =>
            {
                self.suppress_click = true;
            }
            _ => {}
        }
        self.settle().await;
        Ok(())
    }

    async fn run_shortcut(&mut self, action: Option<ShortcutAction>) -> Result<(), StoreError> {
        match action {
            Some(ShortcutAction::Deselect) => {
                self.features.deactivate(&mut self.scene);
            }
            Some(ShortcutAction::Delete) => {
                if let Some((
                    FeatureType::Transformer | FeatureType::AnchorPoints | FeatureType::ArrowSelect,
                    target,
                )) = self.features.active()
                {
                    self.delete_node(target).await?;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn handle_default(&mut self, event: &InputEvent) {
        let tolerance = self.scene.config().arrow_hit_tolerance;
        let interaction = match *event {
            InputEvent::Click { x, y } => {
                if std::mem::take(&mut self.suppress_click) {
                    log::trace!("session: click swallowed after gesture");
                    return;
                }
                let hit = hit_test(self.scene.layer(), Point::new(x, y), tolerance);
                self.scene.handle_click(hit)
            }
            InputEvent::DoubleClick { x, y } => {
                let hit = hit_test(self.scene.layer(), Point::new(x, y), tolerance);
                self.scene.handle_double_click(hit)
            }
            InputEvent::PointerDown { x, y } => {
                self.suppress_click = false;
                let hit = hit_test(self.scene.layer(), Point::new(x, y), tolerance);
                self.scene.handle_pointer_down(hit)
            }
            InputEvent::DragStart { id } => self.scene.handle_drag_start(id),
            InputEvent::DragMove { id, x, y } => {
                self.scene.drag_to(id, Point::new(x, y));
                Interaction::Nothing
            }
            _ => Interaction::Nothing,
        };
        self.run(interaction);
    }

    fn run(&mut self, interaction: Interaction) {
        if interaction == Interaction::Deactivate {
            self.features.deactivate(&mut self.scene);
        } else if let Some((kind, target, feature)) = interaction.into_feature() {
            self.features.activate(kind, target, feature, &mut self.scene);
        }
    }

    /// Persist a new node, then add and draw it.
    pub async fn add_node(&mut self, node: CanvasNode) -> Result<NodeId, StoreError> {
        let stage = self.stage.ok_or(StoreError::NoStage)?;
        let created = self.backend.create(stage, &node).await?;
        let id = created.id();
        self.store.add(created);
        self.settle().await;
        Ok(id)
    }

    /// Apply `patch` locally, redraw, and write the node through. Returns
    /// `false` when nothing changed.
    pub async fn update_node(&mut self, id: NodeId, patch: &NodePatch) -> Result<bool, StoreError> {
        if !self.store.update(id, patch) {
            return Ok(false);
        }
        self.settle().await;
        if let Some(node) = self.store.get(id) {
            self.backend.update(&node).await?;
        }
        Ok(true)
    }

    /// Delete `id` and every arrow left attached to it.
    pub async fn delete_node(&mut self, id: NodeId) -> Result<Vec<NodeId>, StoreError> {
        let removed = self.store.delete(&self.backend, id).await?;
        self.settle().await;
        Ok(removed)
    }

    /// Push blocks, images and arrows to the backend as full replacements.
    pub async fn sync(&mut self) -> Result<usize, StoreError> {
        let stage = self.stage.ok_or(StoreError::NoStage)?;
        let payloads = self.store.sync_payloads(stage);
        for payload in &payloads {
            log::debug!("session: syncing {} {:?}", payload.len(), payload.kind());
            self.backend.sync(payload).await?;
        }
        self.store.mark_synced();
        Ok(payloads.len())
    }

    /// Load every queued image and attach the ones still wanted.
    pub async fn pump_images(&mut self) -> usize {
        let mut attached = 0;
        while self.scene.has_pending_loads() {
            for load in self.scene.take_pending_loads() {
                let result = self.loader.load(&load.src).await;
                if self.scene.attach_loaded_image(&load, result) {
                    attached += 1;
                }
            }
        }
        attached
    }

    /// Redraw from the store journal and finish any cascade it reveals.
    async fn settle(&mut self) {
        let mut dangling = self.scene.apply_store_events();
        while let Some(arrow) = dangling.pop() {
            match self.store.delete(&self.backend, arrow).await {
                Ok(_) => {}
                // Drawn but never synced: the backend has nothing to delete.
                Err(StoreError::Backend(BackendError::NotFound(_))) => {
                    self.store.discard(arrow);
                }
                Err(e) => log::warn!("session: could not delete dangling arrow {arrow}: {e}"),
            }
            dangling.extend(self.scene.apply_store_events());
        }
        if let Some((kind, target)) = self.features.active()
            && !self.store.contains(target)
        {
            log::debug!("session: {target} is gone, dropping {kind:?}");
            self.features.deactivate(&mut self.scene);
        }
        self.pump_images().await;
    }

    pub fn store(&self) -> &NodeDataStore {
        &self.store
    }

    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneManager {
        &mut self.scene
    }

    pub fn features(&self) -> &FeatureManager<SceneManager> {
        &self.features
    }

    pub fn stage(&self) -> Option<NodeId> {
        self.stage
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}
