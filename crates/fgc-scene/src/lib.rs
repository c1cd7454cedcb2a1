pub mod drawable;
pub mod hit;
pub mod layer;
pub mod paint;

pub use drawable::{Drawable, DrawableRole, Shape};
pub use hit::{Hit, hit_test};
pub use layer::Layer;
pub use paint::{PaintItem, PaintOp, paint_layer};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::stable_graph::NodeIndex;
