//! Process-wide viewer state.
//!
//! One [`AppState`] is created at start-up and passed to every component
//! that needs it. Clones share the same signals.

use std::collections::BTreeSet;
use std::rc::Rc;

use wmm_ui::{Modifiers, Signal};

use crate::backend::{AlertSink, LogAlertSink};
use crate::link::{CameraLink, LinkBus, ZLink};
use crate::model::{SegmentId, SpineId};

/// Selection, filter and revision signals shared by all views.
#[derive(Clone)]
pub struct AppState {
    pub selected_segment: Signal<Option<SegmentId>>,
    pub selected_spine: Signal<Option<SpineId>>,
    /// Spines the overlays are restricted to
    pub filters: Signal<Option<BTreeSet<SpineId>>>,
    /// Bumped whenever backend annotation data changed
    pub revision: Signal<u64>,
    /// Pan/zoom broadcast between linked views
    pub camera_links: LinkBus<CameraLink>,
    /// Z window broadcast between linked views
    pub z_links: LinkBus<ZLink>,
    alerts: Rc<dyn AlertSink>,
}

impl AppState {
    pub fn new(alerts: Rc<dyn AlertSink>) -> Self {
        Self {
            selected_segment: Signal::new(None),
            selected_spine: Signal::new(None),
            filters: Signal::new(None),
            revision: Signal::new(0),
            camera_links: LinkBus::new(),
            z_links: LinkBus::new(),
            alerts,
        }
    }

    pub fn alerts(&self) -> Rc<dyn AlertSink> {
        Rc::clone(&self.alerts)
    }

    /// Advance the revision counter.
    pub fn bump_revision(&self) {
        let next = self.revision.get() + 1;
        log::debug!("🔁 data revision {}", next);
        self.revision.set(next);
    }

    /// Advance the revision counter only when `changed` is true.
    pub fn data_changed(&self, changed: bool) -> bool {
        if changed {
            self.bump_revision();
        }
        changed
    }

    /// Update the spine filter. Shift adds to the current filter, alt
    /// intersects with it, anything else replaces it. `None` clears it.
    pub fn set_filters(&self, selection: Option<&[SpineId]>, modifiers: Modifiers) {
        let Some(selection) = selection else {
            self.filters.set(None);
            return;
        };
        let mut next: BTreeSet<SpineId> = selection.iter().copied().collect();
        if let Some(current) = self.filters.get() {
            if modifiers.shift {
                next.extend(current);
            } else if modifiers.alt {
                next.retain(|id| current.contains(id));
            }
        }
        self.filters.set(Some(next));
    }

    /// Drop all selections and filters, e.g. when a new project is opened.
    pub fn reset(&self) {
        log::info!("🧹 resetting viewer state");
        self.selected_segment.set(None);
        self.selected_spine.set(None);
        self.filters.set(None);
        self.bump_revision();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Rc::new(LogAlertSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[SpineId]) -> Option<BTreeSet<SpineId>> {
        Some(ids.iter().copied().collect())
    }

    #[test]
    fn test_data_changed_only_bumps_on_true() {
        let state = AppState::default();
        assert!(!state.data_changed(false));
        assert_eq!(state.revision.get(), 0);
        assert!(state.data_changed(true));
        assert_eq!(state.revision.get(), 1);
    }

    #[test]
    fn test_filters_replace_union_intersect() {
        let state = AppState::default();
        state.set_filters(Some(&[1, 2, 3]), Modifiers::default());
        assert_eq!(state.filters.get(), set(&[1, 2, 3]));

        state.set_filters(Some(&[3, 4]), Modifiers::shift());
        assert_eq!(state.filters.get(), set(&[1, 2, 3, 4]));

        state.set_filters(Some(&[2, 4, 9]), Modifiers::alt());
        assert_eq!(state.filters.get(), set(&[2, 4]));

        state.set_filters(Some(&[7]), Modifiers::default());
        assert_eq!(state.filters.get(), set(&[7]));

        state.set_filters(None, Modifiers::default());
        assert_eq!(state.filters.get(), None);
    }

    #[test]
    fn test_modifiers_ignored_without_existing_filter() {
        let state = AppState::default();
        state.set_filters(Some(&[5]), Modifiers::alt());
        assert_eq!(state.filters.get(), set(&[5]));
    }

    #[test]
    fn test_reset_clears_selection() {
        let state = AppState::default();
        state.selected_segment.set(Some(1));
        state.selected_spine.set(Some(2));
        state.set_filters(Some(&[2]), Modifiers::default());

        state.reset();
        assert_eq!(state.selected_segment.get(), None);
        assert_eq!(state.selected_spine.get(), None);
        assert_eq!(state.filters.get(), None);
        assert_eq!(state.revision.get(), 1);
    }

    #[test]
    fn test_clones_share_signals() {
        let state = AppState::default();
        let other = state.clone();
        other.selected_spine.set(Some(9));
        assert_eq!(state.selected_spine.get(), Some(9));
    }
}
