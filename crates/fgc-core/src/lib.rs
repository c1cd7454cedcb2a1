pub mod anchor;
pub mod dto;
pub mod error;
pub mod id;
pub mod model;
pub mod numpad;
pub mod settings;
pub mod units;

pub use anchor::{Anchor, AnchorSide, PathHit, anchor_points, snap};
pub use dto::{DeleteSummary, SyncPayload};
pub use error::{CoreError, CoreResult};
pub use id::NodeId;
pub use model::*;
pub use numpad::{NumpadToken, compile};
pub use settings::{EngineConfig, LayoutSetting, UserSettings};

// Re-export kurbo so downstream crates share one geometry version
pub use kurbo;
