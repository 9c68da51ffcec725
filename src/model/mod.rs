//! Plain data shared by the registry, the camera store and the overlays.

mod camera;
mod ids;
mod z_range;

pub use camera::{CameraState, Target};
pub use ids::{FeatureId, SegmentId, SpineId, ViewId, OVERVIEW_PREFIX};
pub use z_range::ZRange;

/// Structural edit tools available while a segment is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditMode {
    /// Drag spines of the edited segment (default tool)
    #[default]
    MoveSpine,
    /// Edit the segment's path
    Path,
    /// Click to add spines to the segment
    AddSpine,
    /// Click to place the segment origin
    SetOrigin,
}

impl EditMode {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            EditMode::MoveSpine => "Move Spines",
            EditMode::Path => "Edit Segment Path",
            EditMode::AddSpine => "Add Spines",
            EditMode::SetOrigin => "Set Segment Origin",
        }
    }

    /// Get all edit modes.
    pub fn all() -> &'static [EditMode] {
        &[
            EditMode::MoveSpine,
            EditMode::Path,
            EditMode::AddSpine,
            EditMode::SetOrigin,
        ]
    }
}

/// Extent of one time point's pixel stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Number of z slices
    pub slices: u32,
    /// Number of channels
    pub channels: u32,
}

impl ImageShape {
    pub fn new(width: u32, height: u32, slices: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            slices,
            channels,
        }
    }

    /// True when there is no pixel data to show.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.channels == 0
    }
}
