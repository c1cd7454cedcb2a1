//! Feature manager: the single slot for the active interaction.
//!
//! At most one feature is active at a time. Activating another runs the
//! current feature's cleanup first; re-activating the same
//! `(FeatureType, target)` is a no-op. While active, the feature receives
//! input through `dispatch` and may end itself by returning `Finished` or
//! `Abandoned`.
//!
//! The manager is generic over the world features mutate so it carries no
//! knowledge of scenes or stores.

use crate::input::InputEvent;
use fgc_core::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Transformer,
    AnchorPoints,
    Arrowing,
    Dragging,
    ArrowSelect,
    TextEditing,
    VideoPlayer,
}

/// What a feature did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureStatus {
    /// Not consumed; the caller may handle it.
    Ignored,
    /// Consumed; the feature stays active.
    Continue,
    /// Gesture completed; the feature is deactivated.
    Finished,
    /// Gesture failed; the feature is deactivated without committing.
    Abandoned,
}

/// Undo a feature's activation side effects. Runs exactly once.
pub type Cleanup<W> = Box<dyn FnOnce(&mut W)>;

pub trait Feature<W> {
    /// Apply activation side effects and return their cleanup.
    fn on_activated(&mut self, world: &mut W) -> Cleanup<W>;

    fn handle(&mut self, _event: &InputEvent, _world: &mut W) -> FeatureStatus {
        FeatureStatus::Ignored
    }
}

struct ActiveFeature<W> {
    kind: FeatureType,
    target: NodeId,
    feature: Box<dyn Feature<W>>,
    cleanup: Cleanup<W>,
}

pub struct FeatureManager<W> {
    active: Option<ActiveFeature<W>>,
}

impl<W> Default for FeatureManager<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> FeatureManager<W> {
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Make `feature` the active one. Returns `false` when the same
    /// `(kind, target)` is already active and nothing happened.
    pub fn activate(
        &mut self,
        kind: FeatureType,
        target: NodeId,
        mut feature: Box<dyn Feature<W>>,
        world: &mut W,
    ) -> bool {
        if self.is_active(kind, target) {
            log::trace!("feature {kind:?} on {target} already active");
            return false;
        }
        self.deactivate(world);
        let cleanup = feature.on_activated(world);
        log::debug!("feature {kind:?} activated on {target}");
        self.active = Some(ActiveFeature {
            kind,
            target,
            feature,
            cleanup,
        });
        true
    }

    /// Run the active feature's cleanup and go idle. Returns whether anything
    /// was active.
    pub fn deactivate(&mut self, world: &mut W) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        log::debug!("feature {:?} deactivated on {}", active.kind, active.target);
        (active.cleanup)(world);
        true
    }

    /// Deactivate only if the active feature is of `kind`.
    pub fn deactivate_kind(&mut self, kind: FeatureType, world: &mut W) -> bool {
        if self.active.as_ref().is_some_and(|a| a.kind == kind) {
            self.deactivate(world)
        } else {
            false
        }
    }

    pub fn is_active(&self, kind: FeatureType, target: NodeId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.kind == kind && a.target == target)
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<(FeatureType, NodeId)> {
        self.active.as_ref().map(|a| (a.kind, a.target))
    }

    /// Route `event` to the active feature. A `Finished` or `Abandoned`
    /// result deactivates it.
    pub fn dispatch(&mut self, event: &InputEvent, world: &mut W) -> FeatureStatus {
        let Some(active) = self.active.as_mut() else {
            return FeatureStatus::Ignored;
        };
        let status = active.feature.handle(event, world);
        if matches!(status, FeatureStatus::Finished | FeatureStatus::Abandoned) {
            log::debug!("feature {:?} ended: {status:?}", active.kind);
            self.deactivate(world);
        }
        status
    }
}
