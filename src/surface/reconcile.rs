//! Camera reconciliation after registry changes.
//!
//! Linked views share one zoom. It comes from an explicit zoom request on
//! a linked view, else from a linked view's stored camera, else from the
//! default camera of the first linked view initialised in this pass.
//! Multiple linked views mounting in one pass resolve in registration
//! order.

use crate::config::ViewerConfig;
use crate::state::{CameraTransaction, CameraUpdate, ViewRegistration};
use crate::zoom_math;

use super::layout::Frame;

/// Bring the store in line with the registry. Everything is written into
/// `tx`; the caller commits once.
pub fn reconcile(
    tx: &mut CameraTransaction<'_>,
    registrations: &[ViewRegistration],
    frame: &Frame,
    viewer: &ViewerConfig,
) {
    let mut linked_zoom = registrations
        .iter()
        .filter(|r| r.config.linked)
        .find_map(|r| r.config.zoom.or_else(|| tx.get(&r.id).map(|c| c.zoom)));

    for registration in registrations {
        let id = &registration.id;
        let config = &registration.config;
        let mut zoom = config.zoom;
        if config.linked && linked_zoom.is_some() {
            zoom = linked_zoom;
        }

        let parent_changed = match tx.get(id) {
            None => {
                let Some(default) = tx.ensure_initialized(
                    id,
                    &config.image,
                    config.size,
                    viewer.default_zoom_fraction,
                    config.version,
                ) else {
                    continue;
                };
                if config.linked && zoom.is_none() && linked_zoom.is_none() {
                    linked_zoom = Some(default.zoom);
                }
                let mut camera = default;
                camera.zoom = zoom.unwrap_or(default.zoom);
                camera.target = config.target.unwrap_or(default.target);
                tx.insert(id, camera);
                true
            }
            Some(stored) if stored.version != config.version => {
                tx.apply_external_update(
                    id,
                    CameraUpdate {
                        target: config.target,
                        zoom,
                        version: config.version,
                    },
                );
                true
            }
            Some(_) => false,
        };

        if !config.minimap_enabled {
            continue;
        }
        let mini_id = id.minimap();
        if tx.contains(&mini_id) && !parent_changed {
            continue;
        }
        let shape = config.image.image_shape();
        let mini_zoom = frame
            .get(&mini_id)
            .and_then(|v| zoom_math::fit_zoom((shape.width, shape.height), v.bounds.size(), 0.0))
            .unwrap_or(viewer.min_zoom);
        tx.sync_minimap(id, mini_zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::ImageHandle;
    use crate::config::ChannelConfig;
    use crate::model::{CameraState, Target, ViewId};
    use crate::state::{CameraStore, ViewConfig};
    use wmm_ui::{Rectangle, Size};

    fn registration(id: &str, linked: bool) -> ViewRegistration {
        let mut config = ViewConfig::new(
            ImageHandle::from_backend(MemoryBackend::demo()),
            Rectangle::new(0.0, 0.0, 800.0, 600.0),
            &ChannelConfig::default(),
        );
        config.linked = linked;
        ViewRegistration {
            id: id.into(),
            config,
        }
    }

    fn run(store: &CameraStore, regs: &[ViewRegistration]) -> bool {
        let viewer = ViewerConfig::default();
        let frame = Frame::compute(regs, Size::new(1600.0, 600.0), &viewer.minimap);
        let mut tx = store.transaction();
        reconcile(&mut tx, regs, &frame, &viewer);
        tx.commit()
    }

    #[test]
    fn test_new_views_get_default_camera_in_one_write() {
        let store = CameraStore::new(ViewerConfig::default());
        let regs = vec![registration("a", false), registration("b", false)];
        assert!(run(&store, &regs));
        assert_eq!(store.write_count(), 1);

        let image = &regs[0].config.image;
        let (target, zoom) = image.default_camera(Size::new(800.0, 600.0), 0.5).unwrap();
        let camera = store.get(&"a".into()).unwrap();
        assert_eq!(camera.target, target);
        assert_eq!(camera.zoom, zoom);

        // Nothing changed: no second write
        assert!(!run(&store, &regs));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_linked_views_adopt_stored_zoom() {
        let store = CameraStore::new(ViewerConfig::default());
        let mut tx = store.transaction();
        tx.insert(&"a".into(), CameraState::new(Target::new(1.0, 1.0), 2.5, 0));
        tx.commit();

        let regs = vec![registration("a", true), registration("b", true)];
        run(&store, &regs);
        assert_eq!(store.get(&"b".into()).unwrap().zoom, 2.5);
    }

    #[test]
    fn test_first_linked_default_seeds_the_rest() {
        let store = CameraStore::new(ViewerConfig::default());
        let mut a = registration("a", true);
        a.config.size = Size::new(400.0, 300.0);
        let regs = vec![a, registration("b", true)];
        run(&store, &regs);

        let a_zoom = store.get(&"a".into()).unwrap().zoom;
        let b_zoom = store.get(&"b".into()).unwrap().zoom;
        assert_eq!(a_zoom, b_zoom);
    }

    #[test]
    fn test_version_change_applies_requested_target() {
        let store = CameraStore::new(ViewerConfig::default());
        let mut regs = vec![registration("a", false)];
        run(&store, &regs);
        let before = store.get(&"a".into()).unwrap();

        regs[0].config.target = Some(Target::new(3.0, 4.0));
        regs[0].config.version = 1;
        run(&store, &regs);
        let after = store.get(&"a".into()).unwrap();
        assert_eq!(after.target, Target::new(3.0, 4.0));
        assert_eq!(after.zoom, before.zoom);
        assert_eq!(after.version, 1);
    }

    #[test]
    fn test_minimap_entry_follows_parent() {
        let store = CameraStore::new(ViewerConfig::default());
        let mut reg = registration("a", false);
        reg.config.minimap_enabled = true;
        run(&store, std::slice::from_ref(&reg));

        let parent = store.get(&"a".into()).unwrap();
        let mini = store.get(&ViewId::from("a").minimap()).unwrap();
        assert_eq!(mini.target, parent.target);
        assert!(mini.zoom < parent.zoom);
    }

    #[test]
    fn test_stale_entries_survive() {
        let store = CameraStore::new(ViewerConfig::default());
        run(&store, &[registration("gone", false)]);
        run(&store, &[registration("a", false)]);
        assert!(store.get(&"gone".into()).is_some());
    }
}
