//! Configuration file support.
//!
//! Viewer tuning (zoom limits, minimap box, double-click window), channel
//! defaults and the logging level, stored as versioned JSON.

use serde::{Deserialize, Serialize};
use wmm_ui::{Rgb, Size};

use crate::constants;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Corner of the parent view a minimap is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MinimapCorner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Minimap box settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimapConfig {
    pub max_width: f32,
    pub max_height: f32,
    pub min_width: f32,
    pub min_height: f32,
    /// Gap between the minimap and the parent's edges
    pub margin: f32,
    /// Minimap size relative to the parent view
    pub scale: f32,
    pub position: MinimapCorner,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            max_width: constants::OVERVIEW_MAX_WIDTH,
            max_height: constants::OVERVIEW_MAX_HEIGHT,
            min_width: 0.0,
            min_height: 0.0,
            margin: constants::OVERVIEW_MARGIN,
            scale: constants::OVERVIEW_SCALE,
            position: MinimapCorner::TopLeft,
        }
    }
}

impl MinimapConfig {
    pub fn max_size(&self) -> Size {
        Size::new(self.max_width, self.max_height)
    }

    pub fn min_size(&self) -> Size {
        Size::new(self.min_width, self.min_height)
    }
}

/// Camera and interaction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Fraction of the viewport a freshly mounted image fills
    pub default_zoom_fraction: f64,
    /// Fraction of the viewport the image fills after "home"
    pub home_zoom_fraction: f64,
    /// Zoom used when jumping to a spine
    pub jump_zoom: f64,
    pub double_tap_window_ms: u64,
    pub minimap: MinimapConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_zoom: constants::MIN_ZOOM,
            max_zoom: constants::MAX_ZOOM,
            default_zoom_fraction: constants::DEFAULT_ZOOM_FRACTION,
            home_zoom_fraction: constants::HOME_ZOOM_FRACTION,
            jump_zoom: constants::JUMP_ZOOM,
            double_tap_window_ms: constants::DOUBLE_TAP_WINDOW_MS,
            minimap: MinimapConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn double_tap_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.double_tap_window_ms)
    }

    /// Clamp a zoom into the configured range. NaN maps to the minimum.
    ///
    /// Never panics, even on a range that [`ViewerConfig::validate`] would
    /// refuse; the upper bound wins then.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.max(self.min_zoom).min(self.max_zoom)
    }

    /// Reject zoom settings the camera math cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            self.min_zoom,
            self.max_zoom,
            self.jump_zoom,
            self.home_zoom_fraction,
            self.default_zoom_fraction,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite || self.min_zoom > self.max_zoom {
            return Err(ConfigError::InvalidZoomRange {
                min_zoom: self.min_zoom,
                max_zoom: self.max_zoom,
            });
        }
        Ok(())
    }

    pub fn zoom_in_range(&self, zoom: f64) -> bool {
        zoom >= self.min_zoom && zoom <= self.max_zoom
    }
}

/// Defaults applied to channels that carry no explicit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub default_contrast: (f64, f64),
    /// Color of channel `i` is `palette[i % palette.len()]`
    pub palette: Vec<Rgb>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            default_contrast: constants::DEFAULT_CONTRAST,
            palette: vec![[0, 255, 0], [255, 0, 255], [0, 255, 255], [255, 255, 0]],
        }
    }
}

impl ChannelConfig {
    pub fn color(&self, channel: usize) -> Rgb {
        if self.palette.is_empty() {
            return [255, 255, 255];
        }
        self.palette[channel % self.palette.len()]
    }
}

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub channels: ChannelConfig,

    /// Byte budget of the raster slice cache
    #[serde(default = "default_raster_cache_capacity")]
    pub raster_cache_capacity: usize,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_raster_cache_capacity() -> usize {
    constants::DEFAULT_RASTER_CACHE_BYTES
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            viewer: ViewerConfig::default(),
            channels: ChannelConfig::default(),
            raster_cache_capacity: default_raster_cache_capacity(),
            log_level: LogLevel::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }
        config.viewer.validate()?;

        Ok(config)
    }

    /// Load a config file, falling back to defaults when it is missing or broken.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "wmm-viewer-config";

    /// Try to load configuration from localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// Zoom bounds are non-finite or inverted
    #[error("Invalid zoom settings: min_zoom {min_zoom}, max_zoom {max_zoom}")]
    InvalidZoomRange { min_zoom: f64, max_zoom: f64 },
}
