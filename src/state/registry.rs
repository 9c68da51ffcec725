//! Registry of mounted views.
//!
//! A view is registered exactly while it is mounted with a drawable size.
//! The registry is a signal: the render surface subscribes and recomputes
//! on every effective change. Writing an identical configuration is not a
//! change.

use std::rc::Rc;

use wmm_ui::{Point, Rectangle, Rgb, Signal, Size, Subscription};

use crate::backend::ImageHandle;
use crate::config::ChannelConfig;
use crate::error::ViewerError;
use crate::model::{Target, ViewId};
use crate::overlay::LayerSet;

/// Configuration a mounted view registers with.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    /// Top-left corner within the surface
    pub position: Point,
    pub size: Size,
    /// Indexed by channel
    pub channels_visible: Vec<bool>,
    /// Indexed by channel
    pub colors: Vec<Rgb>,
    /// Indexed by channel
    pub contrast_limits: Vec<(f64, f64)>,
    pub minimap_enabled: bool,
    pub linked: bool,
    pub image: ImageHandle,
    /// Latest overlay build for this view
    pub overlay_layers: LayerSet,
    /// Requested camera target, applied when `version` changes
    pub target: Option<Target>,
    /// Requested zoom, applied when `version` changes
    pub zoom: Option<f64>,
    /// Bumped by every external camera request
    pub version: u64,
}

impl ViewConfig {
    /// Configuration with every channel of `image` visible.
    pub fn new(image: ImageHandle, bounds: Rectangle, channels: &ChannelConfig) -> Self {
        let count = image.image_shape().channels as usize;
        Self {
            position: bounds.position(),
            size: bounds.size(),
            channels_visible: vec![true; count],
            colors: (0..count).map(|c| channels.color(c)).collect(),
            contrast_limits: vec![channels.default_contrast; count],
            minimap_enabled: false,
            linked: false,
            image,
            overlay_layers: LayerSet::empty(),
            target: None,
            zoom: None,
            version: 0,
        }
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_parts(self.position, self.size)
    }
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRegistration {
    pub id: ViewId,
    pub config: ViewConfig,
}

/// Registry contents in registration order.
pub type RegistrySnapshot = Rc<[ViewRegistration]>;

/// Process-wide map from view id to view configuration. Clones share state.
#[derive(Clone)]
pub struct ViewRegistry {
    entries: Signal<RegistrySnapshot>,
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self {
            entries: Signal::new(Rc::from(Vec::new())),
        }
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.entries.get()
    }

    pub fn get(&self, id: &ViewId) -> Option<ViewRegistration> {
        self.entries
            .with(|entries| entries.iter().find(|r| &r.id == id).cloned())
    }

    pub fn contains(&self, id: &ViewId) -> bool {
        self.entries.with(|entries| entries.iter().any(|r| &r.id == id))
    }

    pub fn len(&self) -> usize {
        self.entries.with(|entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` after every effective change.
    pub fn subscribe(&self, f: impl Fn(&RegistrySnapshot) + 'static) -> Subscription {
        self.entries.subscribe(f)
    }

    /// Insert or replace a registration.
    ///
    /// A size that is not strictly positive removes any existing entry and
    /// is reported as [`ViewerError::InvalidSize`]. Returns whether the
    /// registry changed.
    pub fn register(&self, id: ViewId, config: ViewConfig) -> Result<bool, ViewerError> {
        if !config.size.is_drawable() || !config.position.is_finite() {
            self.unregister(&id);
            log::warn!(
                "⚠️ refusing to register {} with size {}x{}",
                id,
                config.size.width,
                config.size.height
            );
            return Err(ViewerError::InvalidSize {
                id,
                width: config.size.width,
                height: config.size.height,
            });
        }

        let mut entries: Vec<ViewRegistration> = self.snapshot().to_vec();
        match entries.iter_mut().find(|r| r.id == id) {
            Some(existing) if existing.config == config => return Ok(false),
            Some(existing) => existing.config = config,
            None => {
                log::debug!("🪟 registered view {}", id);
                entries.push(ViewRegistration { id, config });
            }
        }
        Ok(self.entries.set(Rc::from(entries)))
    }

    /// Remove a registration; a missing id is not an error.
    pub fn unregister(&self, id: &ViewId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let entries: Vec<ViewRegistration> = self
            .snapshot()
            .iter()
            .filter(|r| &r.id != id)
            .cloned()
            .collect();
        log::debug!("🪟 unregistered view {}", id);
        self.entries.set(Rc::from(entries))
    }

    /// Modify a registered view's configuration in place.
    pub fn update(
        &self,
        id: &ViewId,
        f: impl FnOnce(&mut ViewConfig),
    ) -> Result<bool, ViewerError> {
        let Some(mut registration) = self.get(id) else {
            return Err(ViewerError::UnknownView { id: id.clone() });
        };
        f(&mut registration.config);
        self.register(registration.id, registration.config)
    }

    /// Replace a view's overlay layers.
    pub fn set_layers(&self, id: &ViewId, layers: LayerSet) -> Result<bool, ViewerError> {
        self.update(id, |config| config.overlay_layers = layers)
    }
}
