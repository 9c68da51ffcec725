//! Pointer interaction with overlay features.
//!
//! Routes clicks, double clicks, drags and hovers on picked features to the
//! selection signals and to the dataset's backend callables. Every backend
//! call goes through the guarded backend; a truthy result bumps the data
//! revision so overlays rebuild.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use web_time::Instant;
use wmm_ui::{Modifiers, MouseButton, Point, Signal, Subscription, TapTracker};

use super::builder::LayerSet;
use super::dataset::{DatasetProperties, DragFn, DragState, SelectionKey};
use super::pick::Pick;
use crate::backend::GuardedBackend;
use crate::edit_mode::EditSession;
use crate::model::{EditMode, FeatureId, SegmentId, SpineId, Target, ZRange};
use crate::state::AppState;

/// One pointer-down as seen by a view.
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    /// Position within the view, used for double-tap detection
    pub screen: Point,
    /// Image position under the pointer
    pub world: Target,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub at: Instant,
}

/// What a pointer-down did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Not the primary button
    Ignored,
    /// The dataset's click callable ran
    Clicked,
    /// A selection signal was written
    Selected { key: SelectionKey, id: FeatureId },
    /// A double click started an edit session
    Editing(SegmentId),
    /// A click on empty space added a spine to the edited segment
    SpineAdded(SpineId),
    Nothing,
}

struct ActiveDrag {
    /// Surface-wide id of the layer the drag started on
    layer: String,
    drag: DragFn,
    feature: FeatureId,
    state: Rc<Cell<DragState>>,
    position: Rc<Cell<Target>>,
    _z_watch: Subscription,
}

struct HoverTarget {
    layer_id: String,
    properties: Rc<DatasetProperties>,
    feature: FeatureId,
}

/// Pointer handling of one view's overlays.
pub struct InteractionController {
    state: AppState,
    session: EditSession,
    z: Signal<ZRange>,
    backend: GuardedBackend,
    taps: RefCell<TapTracker>,
    drag: RefCell<Option<ActiveDrag>>,
    hovered: RefCell<Option<HoverTarget>>,
}

impl InteractionController {
    pub fn new(
        state: AppState,
        session: EditSession,
        z: Signal<ZRange>,
        backend: GuardedBackend,
        taps: TapTracker,
    ) -> Self {
        Self {
            state,
            session,
            z,
            backend,
            taps: RefCell::new(taps),
            drag: RefCell::new(None),
            hovered: RefCell::new(None),
        }
    }

    fn mid_z(&self) -> i64 {
        self.z.get().mid()
    }

    /// Handle a pointer-down; `pick` is the feature under the pointer.
    pub fn on_press(&self, layers: &LayerSet, pick: Option<&Pick>, input: &PointerInput) -> PressOutcome {
        if input.button != MouseButton::Left {
            return PressOutcome::Ignored;
        }
        let taps = self.taps.borrow_mut().register(input.screen, input.at);

        let Some(pick) = pick else {
            return self.background_click(layers, input);
        };
        let Some(layer) = layers.get(pick.layer) else {
            return PressOutcome::Nothing;
        };
        let properties = &layer.properties;
        let world = input.world;

        if let Some(click) = &properties.click {
            let mid = self.mid_z();
            let changed = self.backend.mutation("click", || click(pick.feature, world.x, world.y, mid));
            self.state.data_changed(changed);
            return PressOutcome::Clicked;
        }

        if taps >= 2 {
            if let Some(key) = properties.edit {
                log::debug!("✏️ double click on {} {}", key.as_str(), pick.feature);
                self.session.mode.set(key.edit_mode().unwrap_or_default());
                self.session.editing.set(Some(pick.feature));
                return PressOutcome::Editing(pick.feature);
            }
        }

        if let Some(key) = properties.select {
            self.select(key, pick.feature);
            return PressOutcome::Selected {
                key,
                id: pick.feature,
            };
        }
        PressOutcome::Nothing
    }

    /// Write `id` into the signal behind `key`.
    pub fn select(&self, key: SelectionKey, id: FeatureId) {
        log::debug!("👆 {} = {}", key.as_str(), id);
        match key {
            SelectionKey::SegmentId => {
                self.state.selected_segment.set(Some(id));
            }
            SelectionKey::SpineId => {
                self.state.selected_spine.set(Some(id));
            }
            SelectionKey::SegmentIdEditing => {
                self.session.mode.set(key.edit_mode().unwrap_or_default());
                self.session.editing.set(Some(id));
            }
        }
    }

    fn background_click(&self, layers: &LayerSet, input: &PointerInput) -> PressOutcome {
        if !layers.has_background_hit() {
            return PressOutcome::Nothing;
        }
        let Some(segment) = self.session.editing.get() else {
            return PressOutcome::Nothing;
        };
        if !input.modifiers.shift && self.session.mode.get() != EditMode::AddSpine {
            return PressOutcome::Nothing;
        }

        let Some(spine) = self
            .backend
            .add_spine(segment, input.world.x, input.world.y, self.mid_z())
        else {
            return PressOutcome::Nothing;
        };
        self.state.selected_spine.set(Some(spine));
        self.state.bump_revision();
        PressOutcome::SpineAdded(spine)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.borrow().is_some()
    }

    /// Begin dragging the picked feature and return the id of its layer.
    /// Later drag events must carry that id. `None` when the dataset has no
    /// drag callable.
    pub fn drag_start(&self, layers: &LayerSet, pick: &Pick, world: Target) -> Option<String> {
        let layer = layers.get(pick.layer)?;
        let drag = layer.properties.drag.clone()?;
        self.drag_end_silently();

        let state = Rc::new(Cell::new(DragState::Start));
        let position = Rc::new(Cell::new(world));

        // Re-send the drag at the new depth when z moves mid-drag.
        let z_watch = {
            let drag = Rc::clone(&drag);
            let state = Rc::clone(&state);
            let position = Rc::clone(&position);
            let backend = self.backend.clone();
            let app = self.state.clone();
            let feature = pick.feature;
            self.z.subscribe(move |z| {
                if state.get() != DragState::Dragging {
                    return;
                }
                let at = position.get();
                let changed = backend.mutation("drag", || drag(feature, at.x, at.y, z.mid(), DragState::Dragging));
                app.data_changed(changed);
            })
        };

        log::debug!("✋ drag start on {} in {}", pick.feature, layer.id);
        *self.drag.borrow_mut() = Some(ActiveDrag {
            layer: layer.id.clone(),
            drag,
            feature: pick.feature,
            state,
            position,
            _z_watch: z_watch,
        });
        Some(layer.id.clone())
    }

    /// Id of the layer being dragged.
    pub fn drag_layer(&self) -> Option<String> {
        self.drag.borrow().as_ref().map(|d| d.layer.clone())
    }

    /// Pointer moved while dragging. Events from any other layer are
    /// ignored.
    pub fn drag_move(&self, layer: &str, world: Target) -> bool {
        let Some((drag, feature, state)) = self
            .drag
            .borrow()
            .as_ref()
            .filter(|d| d.layer == layer)
            .map(|d| {
                d.position.set(world);
                (Rc::clone(&d.drag), d.feature, d.state.replace(DragState::Dragging))
            })
        else {
            return false;
        };
        let mid = self.mid_z();
        let changed = self.backend.mutation("drag", || drag(feature, world.x, world.y, mid, state));
        self.state.data_changed(changed)
    }

    /// Pointer released. Stops the z watch. A release from another layer
    /// leaves the drag running.
    pub fn drag_end(&self, layer: &str, world: Target) -> bool {
        let active = {
            let mut current = self.drag.borrow_mut();
            if current.as_ref().is_none_or(|d| d.layer != layer) {
                return false;
            }
            current.take()
        };
        let Some(active) = active else {
            return false;
        };
        active.state.set(DragState::End);
        let mid = self.mid_z();
        let changed = self.backend.mutation("drag", || {
            (active.drag)(active.feature, world.x, world.y, mid, DragState::End)
        });
        log::debug!("✋ drag end on {}", active.feature);
        drop(active);
        self.state.data_changed(changed)
    }

    fn drag_end_silently(&self) {
        if self.drag.borrow_mut().take().is_some() {
            log::warn!("⚠️ previous drag was never released");
        }
    }

    /// Pointer moved without a button held.
    pub fn hover(&self, layers: &LayerSet, pick: Option<&Pick>, world: Target) -> bool {
        let next = pick.and_then(|p| {
            layers.get(p.layer).map(|layer| HoverTarget {
                layer_id: layer.id.clone(),
                properties: Rc::clone(&layer.properties),
                feature: p.feature,
            })
        });

        let unchanged = match (&*self.hovered.borrow(), &next) {
            (Some(current), Some(next)) => {
                current.layer_id == next.layer_id && current.feature == next.feature
            }
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }

        let mut changed = false;
        let previous = self.hovered.borrow_mut().take();
        if let Some(previous) = previous {
            if let Some(hover_out) = &previous.properties.hover_out {
                changed |= self.backend.mutation("hover_out", || hover_out());
            }
        }
        if let Some(next) = next {
            if let Some(hover) = &next.properties.hover {
                let mid = self.mid_z();
                changed |= self
                    .backend
                    .mutation("hover", || hover(next.feature, world.x, world.y, mid));
            }
            *self.hovered.borrow_mut() = Some(next);
        }
        self.state.data_changed(changed)
    }

    /// Backspace on the active view: the backend's generic delete first,
    /// then the selected spine while an edit session is active.
    pub fn on_backspace(&self) -> bool {
        if self.backend.on_delete_selection() {
            self.state.bump_revision();
            return true;
        }
        if !self.session.is_active() {
            return false;
        }
        let Some(spine) = self.state.selected_spine.get() else {
            return false;
        };
        if !self.backend.delete_spine(spine) {
            return false;
        }
        log::debug!("🗑️ spine {} deleted", spine);
        self.state.selected_spine.set(None);
        self.state.bump_revision();
        true
    }
}
