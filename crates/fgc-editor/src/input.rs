//! Input abstraction layer.
//!
//! Normalizes the host's pointer, drag and keyboard events into one
//! `InputEvent` enum. Coordinates are stage pixels.

use fgc_core::NodeId;
use kurbo::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    /// Emitted by the host after a down/up pair on the same spot.
    Click { x: f64, y: f64 },
    DoubleClick { x: f64, y: f64 },

    /// A draggable drawable started moving.
    DragStart { id: NodeId },
    /// The dragged drawable's new top-left, in stage pixels.
    DragMove { id: NodeId, x: f64, y: f64 },
    DragEnd { id: NodeId },

    /// Transform handles changed the selected drawable.
    Transform {
        scale_x: f64,
        scale_y: f64,
        /// Degrees.
        rotation: f64,
    },

    /// The host's text editor lost focus with this content.
    TextCommitted { text: String },
    /// The host closed its overlay (pointer left the video player).
    OverlayDismissed,

    Key {
        key: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    },
}

impl InputEvent {
    /// A key press without modifiers.
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y }
            | Self::Click { x, y }
            | Self::DoubleClick { x, y }
            | Self::DragMove { x, y, .. } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }
}
