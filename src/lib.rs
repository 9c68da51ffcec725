//! WMM - Web Map Manager viewer core
//!
//! The synchronized multi-view layer of the Web Map Manager image viewer:
//! a registry of mounted views, the camera store, one shared render
//! surface that lays every view and minimap out as sub-viewports, overlay
//! layers decoded from annotation backend buffers, and the edit-mode and
//! linked-view rules that tie them together.
//!
//! A session creates one [`AppState`] and one [`SharedRenderSurface`], then
//! mounts an [`ImageView`] per time point shown.

pub mod backend;
pub mod config;
pub mod constants;
pub mod edit_mode;
pub mod error;
pub mod link;
pub mod model;
pub mod overlay;
pub mod state;
pub mod surface;
pub mod viewer;
pub mod zoom_math;
pub mod zscroll;

pub use backend::{AlertSink, ImageHandle, TimePoint};
pub use config::AppConfig;
pub use edit_mode::EditSession;
pub use error::{BackendError, ViewerError};
pub use model::{CameraState, EditMode, Target, ViewId, ZRange};
pub use state::AppState;
pub use surface::{CameraRequest, SharedRenderSurface};
pub use viewer::{ImageView, ViewOptions};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
