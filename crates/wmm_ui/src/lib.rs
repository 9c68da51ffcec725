//! wmm_ui - view-agnostic primitives shared by every Web Map Manager view
//!
//! Geometry, pointer/keyboard events, reactive signals and the overlay
//! primitive batches consumed by the shared render surface.

mod color;
mod event;
mod layout;
mod overlay;
mod signal;

pub use color::{Color, Rgb};
pub use event::{Event, Key, Modifiers, MouseButton, TapTracker, DEFAULT_DOUBLE_TAP_WINDOW};
pub use layout::{Point, Rectangle, Size};
pub use overlay::{PrimitiveBatch, PrimitiveKind};
pub use signal::{Signal, Subscription};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::color::{Color, Rgb};
    pub use crate::event::{Event, Key, Modifiers, MouseButton};
    pub use crate::layout::{Point, Rectangle, Size};
    pub use crate::signal::{Signal, Subscription};
}
