pub mod assets;
pub mod backend;
pub mod error;
pub mod feature;
pub mod http;
pub mod input;
pub mod session;
pub mod shortcuts;
pub mod store;
pub mod sync;
pub mod tools;

pub use assets::{ImageLoader, LoadedImage, StaticImageLoader};
pub use backend::{CanvasBackend, MemoryBackend};
pub use error::{AssetError, BackendError, StoreError};
pub use feature::{Feature, FeatureManager, FeatureStatus, FeatureType};
pub use http::{HttpBackend, HttpBackendConfig};
pub use input::InputEvent;
pub use session::CanvasSession;
pub use store::{NodeDataStore, StoreEvent};
pub use sync::{HostOverlay, SceneManager};
pub use tools::{
    ArrowSelectFeature, Interaction, TextEditFeature, TransformFeature, VideoPlayerFeature,
};
