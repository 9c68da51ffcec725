//! Structural edit sessions.
//!
//! A session pairs the segment under edit with the active tool. Tool
//! buttons toggle: pressing the active tool again falls back to
//! [`EditMode::MoveSpine`], and pressing `MoveSpine` while it is active
//! ends the session.

use wmm_ui::{Signal, Subscription};

use crate::model::{EditMode, SegmentId, ZRange};

/// Edit session of one view. Clones share the same signals.
#[derive(Clone, Default)]
pub struct EditSession {
    /// Segment under edit, `None` when no session is active
    pub editing: Signal<Option<SegmentId>>,
    /// Active tool; only meaningful while `editing` is set
    pub mode: Signal<EditMode>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.editing.get().is_some()
    }

    /// Active tool, or `None` outside a session.
    pub fn current_mode(&self) -> Option<EditMode> {
        self.is_active().then(|| self.mode.get())
    }

    /// Press the tool button for `mode`. `selected` is the segment a new
    /// session would edit.
    pub fn set_mode(&self, mode: EditMode, selected: Option<SegmentId>) {
        if self.editing.get().is_none() {
            let Some(segment) = selected else {
                log::debug!("✏️ {} ignored, no segment selected", mode.name());
                return;
            };
            log::debug!("✏️ editing segment {} with {}", segment, mode.name());
            self.mode.set(mode);
            self.editing.set(Some(segment));
            return;
        }

        let current = self.mode.get();
        if current != mode {
            log::debug!("✏️ switching tool to {}", mode.name());
            self.mode.set(mode);
        } else if mode == EditMode::MoveSpine {
            self.end();
        } else {
            self.mode.set(EditMode::MoveSpine);
        }
    }

    /// Start editing the path of a freshly created segment and select it.
    pub fn start_new_path(&self, segment: SegmentId, selected: &Signal<Option<SegmentId>>) {
        log::debug!("✏️ new segment {}", segment);
        self.editing.set(Some(segment));
        self.mode.set(EditMode::Path);
        selected.set(Some(segment));
    }

    /// Leave the session. The mode falls back to the default tool.
    pub fn end(&self) {
        if self.editing.set(None) {
            log::debug!("✏️ edit session ended");
        }
        self.mode.set(EditMode::MoveSpine);
    }

    /// Keep `z` at a single slice around its midpoint while a session is
    /// active.
    pub fn restrict_z(&self, z: &Signal<ZRange>) -> [Subscription; 2] {
        let collapse = {
            let editing = self.editing.clone();
            let z = z.clone();
            move || {
                if editing.get().is_none() {
                    return;
                }
                let range = z.get();
                if range.len() != 1 {
                    z.set(ZRange::single(range.mid()));
                }
            }
        };
        collapse();

        let on_edit = {
            let collapse = collapse.clone();
            self.editing.subscribe(move |_| collapse())
        };
        let on_z = z.subscribe(move |_| collapse());
        [on_edit, on_z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_mode_without_selection_is_noop() {
        let session = EditSession::new();
        session.set_mode(EditMode::Path, None);
        assert!(!session.is_active());
        assert_eq!(session.current_mode(), None);
    }

    #[test]
    fn test_move_spine_twice_ends_session() {
        let session = EditSession::new();
        session.set_mode(EditMode::MoveSpine, Some(4));
        assert_eq!(session.editing.get(), Some(4));

        session.set_mode(EditMode::MoveSpine, Some(4));
        assert_eq!(session.editing.get(), None);
    }

    #[test]
    fn test_other_tool_twice_returns_to_move_spine() {
        let session = EditSession::new();
        session.set_mode(EditMode::Path, Some(4));
        session.set_mode(EditMode::Path, Some(4));
        assert_eq!(session.editing.get(), Some(4));
        assert_eq!(session.mode.get(), EditMode::MoveSpine);
    }

    #[test]
    fn test_switching_tools_keeps_target() {
        let session = EditSession::new();
        session.set_mode(EditMode::AddSpine, Some(4));
        // A different selection does not retarget a running session
        session.set_mode(EditMode::SetOrigin, Some(9));
        assert_eq!(session.editing.get(), Some(4));
        assert_eq!(session.mode.get(), EditMode::SetOrigin);
    }

    #[test]
    fn test_new_path_bypasses_toggles() {
        let session = EditSession::new();
        let selected = Signal::new(None);
        session.set_mode(EditMode::Path, Some(1));

        session.start_new_path(7, &selected);
        assert_eq!(session.editing.get(), Some(7));
        assert_eq!(session.mode.get(), EditMode::Path);
        assert_eq!(selected.get(), Some(7));
    }

    #[test]
    fn test_active_session_collapses_z_window() {
        let session = EditSession::new();
        let z = Signal::new(ZRange::new(10, 15));
        let _subs = session.restrict_z(&z);
        assert_eq!(z.get(), ZRange::new(10, 15));

        session.set_mode(EditMode::SetOrigin, Some(1));
        assert_eq!(z.get(), ZRange::new(12, 13));

        z.set(ZRange::new(20, 30));
        assert_eq!(z.get(), ZRange::new(25, 26));

        session.end();
        z.set(ZRange::new(0, 4));
        assert_eq!(z.get(), ZRange::new(0, 4));
    }
}
