//! View-state store: one camera per view id and per minimap id.
//!
//! Writes go through a [`CameraTransaction`] and land in one commit, so a
//! reconciliation pass over many views produces a single notification.
//! Entries of unregistered views are kept; they are only overwritten if the
//! view comes back with a different version.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use wmm_ui::{Signal, Size, Subscription};

use crate::backend::ImageHandle;
use crate::config::ViewerConfig;
use crate::constants::ZOOM_EPSILON;
use crate::model::{CameraState, Target, ViewId};

/// Store contents.
pub type CameraMap = Rc<BTreeMap<ViewId, CameraState>>;

/// A full or partial camera change requested from outside the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraUpdate {
    pub target: Option<Target>,
    pub zoom: Option<f64>,
    pub version: u64,
}

/// Process-wide camera store. Clones share state.
#[derive(Clone)]
pub struct CameraStore {
    cameras: Signal<CameraMap>,
    writes: Rc<Cell<u64>>,
    viewer: ViewerConfig,
}

impl CameraStore {
    pub fn new(viewer: ViewerConfig) -> Self {
        Self {
            cameras: Signal::new(Rc::new(BTreeMap::new())),
            writes: Rc::new(Cell::new(0)),
            viewer,
        }
    }

    pub fn get(&self, id: &ViewId) -> Option<CameraState> {
        self.cameras.with(|map| map.get(id).copied())
    }

    pub fn snapshot(&self) -> CameraMap {
        self.cameras.get()
    }

    /// Number of commits that changed the store.
    pub fn write_count(&self) -> u64 {
        self.writes.get()
    }

    pub fn viewer(&self) -> &ViewerConfig {
        &self.viewer
    }

    pub fn subscribe(&self, f: impl Fn(&CameraMap) + 'static) -> Subscription {
        self.cameras.subscribe(f)
    }

    pub fn transaction(&self) -> CameraTransaction<'_> {
        CameraTransaction {
            store: self,
            map: (*self.snapshot()).clone(),
            dirty: false,
        }
    }

    /// Direct user pan/zoom: overwrite without a version check.
    pub fn apply_render_surface_update(&self, id: &ViewId, camera: CameraState) -> bool {
        let mut tx = self.transaction();
        tx.apply_render_surface_update(id, camera);
        tx.commit()
    }
}

/// Pending store changes; nothing is visible until [`commit`](Self::commit).
pub struct CameraTransaction<'a> {
    store: &'a CameraStore,
    map: BTreeMap<ViewId, CameraState>,
    dirty: bool,
}

impl CameraTransaction<'_> {
    pub fn get(&self, id: &ViewId) -> Option<CameraState> {
        self.map.get(id).copied()
    }

    pub fn contains(&self, id: &ViewId) -> bool {
        self.map.contains_key(id)
    }

    /// Store `camera` and mirror its target into the view's minimap.
    fn write(&mut self, id: &ViewId, camera: CameraState) {
        if self.map.get(id) == Some(&camera) {
            return;
        }
        self.map.insert(id.clone(), camera);
        self.dirty = true;

        if !id.is_minimap() {
            if let Some(mini) = self.map.get_mut(&id.minimap()) {
                mini.target = camera.target;
            }
        }
    }

    /// Insert a camera as-is, clamping its zoom.
    pub fn insert(&mut self, id: &ViewId, mut camera: CameraState) {
        camera.zoom = self.store.viewer.clamp_zoom(camera.zoom);
        self.write(id, camera);
    }

    /// Create the starting camera of a view if it has none yet.
    ///
    /// Returns the stored camera, or `None` when the image has no extent.
    pub fn ensure_initialized(
        &mut self,
        id: &ViewId,
        image: &ImageHandle,
        viewport: Size,
        back_off: f64,
        version: u64,
    ) -> Option<CameraState> {
        if let Some(existing) = self.get(id) {
            return Some(existing);
        }
        let Some((target, zoom)) = image.default_camera(viewport, back_off) else {
            log::warn!("⚠️ no default camera for {}: empty image", id);
            return None;
        };
        self.insert(id, CameraState::new(target, zoom, version));
        self.get(id)
    }

    /// Merge an external request. Ignored when the stored version already
    /// matches. A request that would leave the camera unchanged nudges the
    /// zoom so the renderer still refreshes.
    pub fn apply_external_update(&mut self, id: &ViewId, update: CameraUpdate) -> bool {
        let previous = self.get(id);
        if previous.is_some_and(|p| p.version == update.version) {
            return false;
        }

        let target = update
            .target
            .or(previous.map(|p| p.target))
            .unwrap_or_default();
        let mut zoom = update.zoom.or(previous.map(|p| p.zoom)).unwrap_or(0.0);
        if !target.is_finite() || !zoom.is_finite() {
            log::warn!("⚠️ ignoring non-finite camera update for {}", id);
            return false;
        }

        let viewer = &self.store.viewer;
        if let Some(previous) = previous {
            if previous.target == target && previous.zoom == zoom {
                zoom = if zoom + ZOOM_EPSILON <= viewer.max_zoom {
                    zoom + ZOOM_EPSILON
                } else {
                    zoom - ZOOM_EPSILON
                };
            }
        }

        self.write(
            id,
            CameraState::new(target, viewer.clamp_zoom(zoom), update.version),
        );
        true
    }

    /// Unconditional overwrite from direct interaction.
    pub fn apply_render_surface_update(&mut self, id: &ViewId, camera: CameraState) {
        if !camera.is_finite() {
            log::warn!("⚠️ ignoring non-finite camera for {}", id);
            return;
        }
        self.insert(id, camera);
    }

    /// Apply a linked view's pan delta and zoom.
    pub fn apply_linked_update(&mut self, id: &ViewId, pan: Target, zoom: f64) {
        let Some(mut camera) = self.get(id) else {
            return;
        };
        camera.target = camera.target + pan;
        camera.zoom = zoom;
        self.apply_render_surface_update(id, camera);
    }

    /// Point the minimap of `parent` at the parent's target, creating it
    /// with `zoom` if missing. An existing minimap keeps its zoom.
    pub fn sync_minimap(&mut self, parent: &ViewId, zoom: f64) {
        let Some(parent_camera) = self.get(parent) else {
            return;
        };
        let id = parent.minimap();
        let camera = match self.get(&id) {
            Some(mini) => CameraState {
                target: parent_camera.target,
                ..mini
            },
            None => CameraState::new(parent_camera.target, zoom, parent_camera.version),
        };
        self.write(&id, camera);
    }

    /// Publish all pending changes in one store write.
    pub fn commit(self) -> bool {
        if !self.dirty {
            return false;
        }
        let changed = self.store.cameras.set(Rc::new(self.map));
        if changed {
            self.store.writes.set(self.store.writes.get() + 1);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    fn store() -> CameraStore {
        CameraStore::new(ViewerConfig::default())
    }

    fn seed(store: &CameraStore, id: &str, camera: CameraState) {
        let mut tx = store.transaction();
        tx.insert(&id.into(), camera);
        tx.commit();
    }

    #[test]
    fn test_ensure_initialized_uses_default_camera() {
        let store = store();
        let image = ImageHandle::from_backend(MemoryBackend::demo());
        let viewport = Size::new(800.0, 600.0);
        let mut tx = store.transaction();
        let camera = tx
            .ensure_initialized(&"v1".into(), &image, viewport, 0.5, 3)
            .unwrap();
        assert!(tx.commit());

        let (target, zoom) = image.default_camera(viewport, 0.5).unwrap();
        assert_eq!(camera.target, target);
        assert_eq!(camera.zoom, zoom);
        assert_eq!(camera.version, 3);

        // A second call leaves the store alone
        let mut tx = store.transaction();
        tx.ensure_initialized(&"v1".into(), &image, viewport, 0.9, 4);
        assert!(!tx.commit());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_external_update_is_version_gated() {
        let store = store();
        seed(&store, "v1", CameraState::new(Target::new(1.0, 1.0), 0.0, 5));

        let mut tx = store.transaction();
        let applied = tx.apply_external_update(
            &"v1".into(),
            CameraUpdate {
                target: Some(Target::new(9.0, 9.0)),
                zoom: None,
                version: 5,
            },
        );
        assert!(!applied);
        assert!(!tx.commit());
    }

    #[test]
    fn test_partial_update_keeps_other_half() {
        let store = store();
        seed(&store, "v1", CameraState::new(Target::new(1.0, 2.0), 1.5, 0));

        let mut tx = store.transaction();
        tx.apply_external_update(
            &"v1".into(),
            CameraUpdate {
                target: Some(Target::new(7.0, 8.0)),
                zoom: None,
                version: 1,
            },
        );
        tx.commit();
        let camera = store.get(&"v1".into()).unwrap();
        assert_eq!(camera.target, Target::new(7.0, 8.0));
        assert_eq!(camera.zoom, 1.5);
        assert_eq!(camera.version, 1);
    }

    #[test]
    fn test_external_zoom_is_clamped() {
        let store = store();
        seed(&store, "v1", CameraState::new(Target::new(0.0, 0.0), 0.0, 0));
        let mut tx = store.transaction();
        tx.apply_external_update(
            &"v1".into(),
            CameraUpdate {
                target: None,
                zoom: Some(10.0),
                version: 1,
            },
        );
        tx.commit();
        assert_eq!(store.get(&"v1".into()).unwrap().zoom, 4.0);
    }

    #[test]
    fn test_repeated_request_forces_refresh() {
        let store = store();
        seed(&store, "v1", CameraState::new(Target::new(3.0, 3.0), 1.0, 0));
        let request = |version| CameraUpdate {
            target: Some(Target::new(3.0, 3.0)),
            zoom: Some(1.0),
            version,
        };

        let mut tx = store.transaction();
        tx.apply_external_update(&"v1".into(), request(1));
        assert!(tx.commit());
        let first = store.get(&"v1".into()).unwrap();

        let mut tx = store.transaction();
        tx.apply_external_update(&"v1".into(), request(2));
        assert!(tx.commit());
        let second = store.get(&"v1".into()).unwrap();

        assert_ne!(first, second);
        assert_ne!(first.version, second.version);
        assert!((first.zoom - 1.0).abs() < 1e-12);
        assert!((second.zoom - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_request_at_max_zoom_stays_in_range() {
        let store = store();
        seed(&store, "v1", CameraState::new(Target::new(0.0, 0.0), 4.0, 0));
        let mut tx = store.transaction();
        tx.apply_external_update(
            &"v1".into(),
            CameraUpdate {
                target: Some(Target::new(0.0, 0.0)),
                zoom: Some(4.0),
                version: 1,
            },
        );
        tx.commit();
        let camera = store.get(&"v1".into()).unwrap();
        assert!(camera.zoom <= 4.0);
        assert!(camera.zoom != 4.0);
    }

    #[test]
    fn test_minimap_mirrors_parent_target() {
        let store = store();
        let parent: ViewId = "v1".into();
        let mut tx = store.transaction();
        tx.insert(&parent, CameraState::new(Target::new(5.0, 5.0), 2.0, 0));
        tx.sync_minimap(&parent, -1.0);
        tx.commit();

        store.apply_render_surface_update(&parent, CameraState::new(Target::new(40.0, 2.0), 3.0, 0));
        let mini = store.get(&parent.minimap()).unwrap();
        assert_eq!(mini.target, Target::new(40.0, 2.0));
        assert_eq!(mini.zoom, -1.0);
    }

    #[test]
    fn test_non_finite_interaction_is_ignored() {
        let store = store();
        seed(&store, "v1", CameraState::new(Target::new(1.0, 1.0), 0.0, 0));
        let changed = store.apply_render_surface_update(
            &"v1".into(),
            CameraState::new(Target::new(f64::NAN, 1.0), 0.0, 0),
        );
        assert!(!changed);
        assert_eq!(store.get(&"v1".into()).unwrap().target, Target::new(1.0, 1.0));
    }

    #[test]
    fn test_linked_update_shifts_target() {
        let store = store();
        seed(&store, "v2", CameraState::new(Target::new(100.0, 100.0), 0.0, 0));
        let mut tx = store.transaction();
        tx.apply_linked_update(&"v2".into(), Target::new(10.0, 5.0), 1.0);
        tx.commit();
        let camera = store.get(&"v2".into()).unwrap();
        assert_eq!(camera.target, Target::new(110.0, 105.0));
        assert_eq!(camera.zoom, 1.0);
    }
}
