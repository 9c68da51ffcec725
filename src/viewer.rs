//! Image view: one mounted view on the shared render surface.
//!
//! An [`ImageView`] owns its z window, edit session, overlay builder and
//! pointer interaction, registers itself with the surface while mounted and
//! keeps its overlay layers in step with every input they depend on.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use web_time::Instant;
use wmm_ui::{Key, Modifiers, MouseButton, Point, Rectangle, Rgb, Signal, Subscription, TapTracker};

use crate::backend::{
    AnnotationRequest, CancelToken, GuardedBackend, ImageHandle, OverlayToggles, RasterCache, RasterSlice,
    SliceKey,
};
use crate::config::{ChannelConfig, ViewerConfig};
use crate::constants::PICK_TOLERANCE_PX;
use crate::edit_mode::EditSession;
use crate::error::{RasterError, ViewerError};
use crate::model::{CameraState, EditMode, SegmentId, SpineId, Target, ViewId, ZRange};
use crate::overlay::{
    pick, InteractionController, LayerSet, OverlayBuilder, OverlayInputs, Pick, PointerInput, PressOutcome,
    SelectionKey,
};
use crate::state::{AppState, ViewConfig};
use crate::surface::{grid_cell, CameraRequest, SharedRenderSurface};
use crate::zoom_math;
use crate::zscroll::ZRangeControl;

/// How a view is mounted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewOptions {
    /// Position and size within the surface
    pub bounds: Rectangle,
    pub linked: bool,
    pub minimap: bool,
    pub toggles: OverlayToggles,
}

impl ViewOptions {
    pub fn new(bounds: Rectangle) -> Self {
        Self {
            bounds,
            linked: false,
            minimap: false,
            toggles: OverlayToggles::default(),
        }
    }

    /// Options for time point `index` of `count` tiled over `area`.
    pub fn tiled(area: Rectangle, count: usize, index: usize) -> Self {
        Self::new(grid_cell(area, count, index))
    }
}

/// One mounted image view.
pub struct ImageView {
    id: ViewId,
    state: AppState,
    surface: Rc<SharedRenderSurface>,
    image: ImageHandle,
    backend: GuardedBackend,
    session: EditSession,
    z: ZRangeControl,
    toggles: Cell<OverlayToggles>,
    visible: Cell<bool>,
    /// Nesting depth of [`ImageView::batch`]
    batch_depth: Cell<u32>,
    refresh_pending: Cell<bool>,
    builder: OverlayBuilder,
    interaction: InteractionController,
    _subscriptions: Vec<Subscription>,
}

fn on_change<T: Clone + PartialEq + 'static>(signal: &Signal<T>, view: &Weak<ImageView>) -> Subscription {
    let view = view.clone();
    signal.subscribe(move |_| {
        if let Some(view) = view.upgrade() {
            view.request_refresh();
        }
    })
}

impl ImageView {
    /// Register a view on `surface` and build its first overlays.
    pub fn mount(
        id: ViewId,
        image: ImageHandle,
        surface: Rc<SharedRenderSurface>,
        state: &AppState,
        channels: &ChannelConfig,
        options: ViewOptions,
    ) -> Result<Rc<Self>, ViewerError> {
        let mut config = ViewConfig::new(image.clone(), options.bounds, channels);
        config.linked = options.linked;
        config.minimap_enabled = options.minimap;
        surface.mount(id.clone(), config)?;

        let viewer = *surface.viewer();
        let backend = GuardedBackend::new(image.clone(), state.alerts());
        let session = EditSession::new();
        let z = ZRangeControl::new(
            id.clone(),
            Signal::new(ZRange::default()),
            i64::from(image.image_shape().slices),
            options.linked,
            surface.active().clone(),
            state.z_links.clone(),
        );
        let interaction = InteractionController::new(
            state.clone(),
            session.clone(),
            z.range().clone(),
            backend.clone(),
            TapTracker::new(viewer.double_tap_window()),
        );

        let view = Rc::new_cyclic(|weak: &Weak<ImageView>| {
            let mut subscriptions = Vec::from(session.restrict_z(z.range()));
            subscriptions.extend([
                on_change(&state.revision, weak),
                on_change(&state.selected_segment, weak),
                on_change(&state.selected_spine, weak),
                on_change(&state.filters, weak),
                on_change(&session.editing, weak),
                on_change(&session.mode, weak),
                on_change(z.range(), weak),
                on_change(surface.active(), weak),
            ]);

            Self {
                id,
                state: state.clone(),
                builder: OverlayBuilder::new(backend.clone()),
                surface,
                image,
                backend,
                session,
                z,
                toggles: Cell::new(options.toggles),
                visible: Cell::new(true),
                batch_depth: Cell::new(0),
                refresh_pending: Cell::new(false),
                interaction,
                _subscriptions: subscriptions,
            }
        });

        log::info!("🪟 mounted view {}", view.id);
        view.refresh_overlays();
        Ok(view)
    }

    pub fn id(&self) -> &ViewId {
        &self.id
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn z(&self) -> &ZRangeControl {
        &self.z
    }

    pub fn camera(&self) -> Option<CameraState> {
        self.surface.camera(&self.id)
    }

    /// Current overlay layers as registered on the surface.
    pub fn layers(&self) -> LayerSet {
        self.surface
            .registry()
            .get(&self.id)
            .map(|r| r.config.overlay_layers)
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.surface.active().with(|a| a.as_ref() == Some(&self.id))
    }

    /// Make this view the one receiving keyboard input.
    pub fn activate(&self) {
        self.surface.active().set(Some(self.id.clone()));
    }

    fn viewer(&self) -> ViewerConfig {
        *self.surface.viewer()
    }

    fn overlay_inputs(&self) -> OverlayInputs {
        OverlayInputs {
            view: self.id.clone(),
            visible: self.visible.get(),
            is_active: self.is_active(),
            request: AnnotationRequest {
                z_range: self.z.get(),
                filters: self.state.filters.get(),
                selected_segment: self.state.selected_segment.get(),
                selected_spine: self.state.selected_spine.get(),
                editing_segment: self.session.editing.get(),
                edit_mode: self.session.mode.get(),
                toggles: self.toggles.get(),
            },
            revision: self.state.revision.get(),
        }
    }

    /// Rebuild overlays if any input changed and hand them to the surface.
    pub fn refresh_overlays(&self) {
        let layers = self.builder.build(&self.overlay_inputs());
        if let Err(e) = self.surface.registry().set_layers(&self.id, layers) {
            log::debug!("🎨 overlays of {} not registered: {}", self.id, e);
        }
    }

    fn request_refresh(&self) {
        if self.batch_depth.get() > 0 {
            self.refresh_pending.set(true);
        } else {
            self.refresh_overlays();
        }
    }

    /// Run `f` with overlay refreshes held back; at most one refresh runs
    /// once the outermost batch ends.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.batch_depth.set(self.batch_depth.get() + 1);
        let result = f();
        self.batch_depth.set(self.batch_depth.get() - 1);
        if self.batch_depth.get() == 0 && self.refresh_pending.replace(false) {
            self.refresh_overlays();
        }
        result
    }

    /// Number of overlay rebuilds that reached the backend.
    pub fn overlay_build_count(&self) -> u64 {
        self.builder.build_count()
    }

    pub fn set_toggles(&self, toggles: OverlayToggles) {
        if self.toggles.replace(toggles) != toggles {
            self.refresh_overlays();
        }
    }

    pub fn set_visible(&self, visible: bool) {
        if self.visible.replace(visible) != visible {
            self.refresh_overlays();
        }
    }

    fn reconfigure(&self, f: impl FnOnce(&mut ViewConfig)) -> Result<bool, ViewerError> {
        let Some(registration) = self.surface.registry().get(&self.id) else {
            return Err(ViewerError::UnknownView { id: self.id.clone() });
        };
        let mut config = registration.config;
        f(&mut config);
        self.surface.mount(self.id.clone(), config)
    }

    /// Move or resize the view. A size that cannot be drawn unregisters it.
    pub fn set_bounds(&self, bounds: Rectangle) -> Result<bool, ViewerError> {
        self.reconfigure(|config| {
            config.position = bounds.position();
            config.size = bounds.size();
        })
    }

    pub fn set_linked(&self, linked: bool) -> Result<bool, ViewerError> {
        self.z.set_linked(linked);
        self.reconfigure(|config| config.linked = linked)
    }

    pub fn set_minimap(&self, enabled: bool) -> Result<bool, ViewerError> {
        self.reconfigure(|config| config.minimap_enabled = enabled)
    }

    pub fn set_channel_visible(&self, channel: usize, visible: bool) -> Result<bool, ViewerError> {
        self.reconfigure(|config| {
            if let Some(slot) = config.channels_visible.get_mut(channel) {
                *slot = visible;
            }
        })
    }

    pub fn set_channel_color(&self, channel: usize, color: Rgb) -> Result<bool, ViewerError> {
        self.reconfigure(|config| {
            if let Some(slot) = config.colors.get_mut(channel) {
                *slot = color;
            }
        })
    }

    pub fn set_contrast_limits(&self, channel: usize, limits: (f64, f64)) -> Result<bool, ViewerError> {
        self.reconfigure(|config| {
            if let Some(slot) = config.contrast_limits.get_mut(channel) {
                *slot = limits;
            }
        })
    }

    /// Reset the camera to the whole image.
    pub fn home(&self) -> Result<(), ViewerError> {
        self.surface.set_camera_target(
            &self.id,
            CameraRequest::Home {
                back_off: self.viewer().home_zoom_fraction,
            },
        )
    }

    /// Centre the z window and the camera on a spine, as one update.
    pub fn jump_to_spine(&self, spine: SpineId) -> bool {
        let Some([x, y, z]) = self.backend.spine_position(spine) else {
            return false;
        };
        log::debug!("🎯 jumping {} to spine {}", self.id, spine);
        self.batch(|| {
            self.z.center_on(z.floor() as i64);
            self.surface
                .set_camera_target(
                    &self.id,
                    CameraRequest::Jump {
                        target: Target::new(x, y),
                        zoom: Some(self.viewer().jump_zoom),
                    },
                )
                .is_ok()
        })
    }

    /// Select a spine from outside the canvas; alt also jumps to it.
    pub fn select_spine(&self, spine: Option<SpineId>, modifiers: Modifiers) {
        self.state.selected_spine.set(spine);
        if let (Some(spine), true) = (spine, modifiers.alt) {
            self.jump_to_spine(spine);
        }
    }

    /// Press the tool button for `mode`.
    pub fn set_edit_mode(&self, mode: EditMode) {
        self.session.set_mode(mode, self.state.selected_segment.get());
    }

    /// Create a segment and start editing its path.
    pub fn new_segment(&self) -> Option<SegmentId> {
        let segment = self.backend.new_segment()?;
        self.session.start_new_path(segment, &self.state.selected_segment);
        self.state.bump_revision();
        Some(segment)
    }

    /// Delete a segment. On failure the user is alerted and nothing changes.
    pub fn delete_segment(&self, segment: SegmentId) -> bool {
        if !self.backend.delete_segment(segment) {
            return false;
        }
        if self.state.selected_segment.get() == Some(segment) {
            self.state.selected_segment.set(None);
        }
        if self.session.editing.get() == Some(segment) {
            self.session.end();
        }
        self.state.bump_revision();
        true
    }

    pub fn set_segment_color(&self, segment: SegmentId, color: Rgb) -> bool {
        let changed = self.backend.set_segment_color(segment, color);
        self.state.data_changed(changed)
    }

    /// Keyboard input. Only the active view reacts.
    pub fn handle_key(&self, key: Key, modifiers: Modifiers) -> bool {
        if !self.is_active() {
            return false;
        }
        match key {
            Key::Enter => self.home().is_ok(),
            Key::Escape => self.escape(),
            Key::Backspace => self.interaction.on_backspace(),
            Key::Left | Key::Right => {
                let forward = key == Key::Right;
                let current = self.state.selected_spine.get();
                match self.backend.neighbour_spine(current, forward) {
                    Some(next) => {
                        self.select_spine(Some(next), modifiers);
                        true
                    }
                    None => false,
                }
            }
            Key::Up => self.z.scroll(1, modifiers.shift),
            Key::Down => self.z.scroll(-1, modifiers.shift),
            _ => false,
        }
    }

    /// Clear the selected spine, or else leave the edit session.
    fn escape(&self) -> bool {
        if self.state.selected_spine.set(None) {
            return true;
        }
        if self.session.is_active() {
            self.session.end();
            return true;
        }
        false
    }

    fn world_at(&self, local: Point) -> Option<(Target, f64)> {
        let camera = self.camera()?;
        let world = self.surface.screen_to_world(&self.id, local)?;
        Some((world, camera.scale()))
    }

    fn pick_at(&self, local: Point) -> Option<(LayerSet, Option<Pick>, Target)> {
        let (world, scale) = self.world_at(local)?;
        let layers = self.layers();
        let picked = pick(&layers, world, scale, PICK_TOLERANCE_PX);
        Some((layers, picked, world))
    }

    /// Pointer-down at a view-local position.
    pub fn on_press(&self, local: Point, button: MouseButton, modifiers: Modifiers, at: Instant) -> PressOutcome {
        self.activate();
        let Some((layers, picked, world)) = self.pick_at(local) else {
            return PressOutcome::Nothing;
        };
        let input = PointerInput {
            screen: local,
            world,
            button,
            modifiers,
            at,
        };
        let outcome = self.interaction.on_press(&layers, picked.as_ref(), &input);
        if let PressOutcome::Selected {
            key: SelectionKey::SpineId,
            id,
        } = outcome
        {
            if modifiers.alt {
                self.jump_to_spine(id);
            }
        }
        outcome
    }

    /// Start dragging whatever is under `local` and return the id of the
    /// layer that owns the drag. `None` when there is nothing draggable; the
    /// caller then pans instead.
    pub fn on_drag_start(&self, local: Point) -> Option<String> {
        let (layers, picked, world) = self.pick_at(local)?;
        self.interaction.drag_start(&layers, &picked?, world)
    }

    /// Drag motion delivered to `layer`.
    pub fn on_drag_move(&self, layer: &str, local: Point) -> bool {
        let Some((world, _)) = self.world_at(local) else {
            return false;
        };
        self.interaction.drag_move(layer, world)
    }

    /// Drag release delivered to `layer`.
    pub fn on_drag_end(&self, layer: &str, local: Point) -> bool {
        let Some((world, _)) = self.world_at(local) else {
            return false;
        };
        self.interaction.drag_end(layer, world)
    }

    pub fn on_hover(&self, local: Point) -> bool {
        let Some((layers, picked, world)) = self.pick_at(local) else {
            return false;
        };
        self.interaction.hover(&layers, picked.as_ref(), world)
    }

    /// Pan by a screen-space delta.
    pub fn pan(&self, dx: f32, dy: f32) -> bool {
        self.surface.pan_view(&self.id, dx, dy)
    }

    /// Wheel zoom around a view-local anchor.
    pub fn on_wheel(&self, delta: f32, anchor: Point) -> bool {
        self.surface.zoom_view(&self.id, f64::from(delta), anchor)
    }

    /// Screen position of an image point, for hit testing and tooltips.
    pub fn world_to_screen(&self, world: Target) -> Option<Point> {
        let camera = self.camera()?;
        let viewport = self.surface.frame().get(&self.id)?.bounds.size();
        Some(zoom_math::world_to_screen(&camera, viewport, world))
    }

    /// Max-projected pixels of `channel` over the current z window.
    pub async fn load_slice(
        &self,
        channel: u32,
        cache: &RasterCache,
        cancel: &CancelToken,
    ) -> Result<RasterSlice, RasterError> {
        let visible = self
            .surface
            .registry()
            .get(&self.id)
            .and_then(|r| r.config.channels_visible.get(channel as usize).copied())
            .unwrap_or(false);
        let key = SliceKey {
            view: self.id.clone(),
            time_point: self.image.index(),
            channel,
            z: self.z.get(),
        };
        cache.load(key, visible, &self.image, cancel).await
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        self.surface.unmount(&self.id);
        log::info!("🪟 unmounted view {}", self.id);
    }
}
