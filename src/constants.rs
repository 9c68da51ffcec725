//! Global constants for the viewer core

/// Lowest zoom a camera may reach (base-2 exponent).
pub const MIN_ZOOM: f64 = -2.0;

/// Highest zoom a camera may reach (base-2 exponent).
pub const MAX_ZOOM: f64 = 4.0;

/// Nudge applied to a repeated zoom request so the store still sees a change.
pub const ZOOM_EPSILON: f64 = 1e-14;

/// Fraction of the viewport a freshly mounted image fills.
pub const DEFAULT_ZOOM_FRACTION: f64 = 0.5;

/// Fraction of the viewport the image fills after the home action.
pub const HOME_ZOOM_FRACTION: f64 = 0.95;

/// Zoom requested when jumping to a spine.
pub const JUMP_ZOOM: f64 = 10.0;

/// Double-click window in milliseconds.
pub const DOUBLE_TAP_WINDOW_MS: u64 = 300;

/// Slices skipped by one z scroll step with shift held.
pub const Z_FAST_STEP: i64 = 3;

/// Default minimap box (screen pixels).
pub const OVERVIEW_MAX_WIDTH: f32 = 150.0;
pub const OVERVIEW_MAX_HEIGHT: f32 = 150.0;
pub const OVERVIEW_MARGIN: f32 = 8.0;
pub const OVERVIEW_SCALE: f32 = 0.2;

/// Default channel contrast window.
pub const DEFAULT_CONTRAST: (f64, f64) = (0.0, 2048.0);

/// Default raster cache budget: 512 MiB.
pub const DEFAULT_RASTER_CACHE_BYTES: usize = 512 * 1024 * 1024;

/// Alpha used for ghosted (out of z range) features.
pub const GHOST_ALPHA: u8 = 127;

/// Screen-pixel tolerance for picking lines and points.
pub const PICK_TOLERANCE_PX: f64 = 4.0;
