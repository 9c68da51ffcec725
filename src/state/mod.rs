//! Application state management modules.

mod app_state;
mod camera_store;
mod registry;

pub use app_state::AppState;
pub use camera_store::{CameraStore, CameraTransaction, CameraUpdate};
pub use registry::{RegistrySnapshot, ViewConfig, ViewRegistration, ViewRegistry};
