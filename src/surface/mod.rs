//! The shared render surface.
//!
//! Exactly one surface exists at a time. Every mounted view, plus its
//! optional minimap, is laid out on it as a sub-viewport; registry changes
//! trigger one synchronous recomputation of the frame and of the cameras.
//! User pan/zoom enters through [`SharedRenderSurface::handle_camera_change`],
//! which enforces the zoom range and feeds linked views.

mod layout;
mod reconcile;
mod routing;

use std::cell::Cell;
use std::rc::{Rc, Weak};

use wmm_ui::{Point, Signal, Size, Subscription};

pub use layout::{grid_cell, minimap_bounds, minimap_size, Frame, SubViewport, ViewportKind};
pub use reconcile::reconcile;
pub use routing::{route_pointer, LayoutHost, LayoutLeaf, RoutedPointer};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::link::{CameraLink, LinkBus};
use crate::model::{CameraState, Target, ViewId};
use crate::state::{AppState, CameraStore, ViewConfig, ViewRegistry};
use crate::zoom_math;

thread_local! {
    static SURFACE_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// External camera request for one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraRequest {
    /// Recentre on the whole image, backed off by `back_off` zoom steps
    Home { back_off: f64 },
    /// Look at `target`, optionally at a new zoom
    Jump { target: Target, zoom: Option<f64> },
}

/// A pointer-down resolved to a sub-viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHit {
    pub view: ViewId,
    pub kind: ViewportKind,
    /// Position relative to the sub-viewport
    pub local: Point,
    /// True when the docking layout switched tabs for this pointer-down
    pub switched: bool,
}

struct SurfaceInner {
    registry: ViewRegistry,
    cameras: CameraStore,
    viewer: ViewerConfig,
    canvas: Cell<Size>,
    frame: Signal<Rc<Frame>>,
    active: Signal<Option<ViewId>>,
    links: LinkBus<CameraLink>,
    recomputes: Cell<u64>,
}

impl SurfaceInner {
    fn recompute(&self) {
        let registrations = self.registry.snapshot();
        let frame = Frame::compute(&registrations, self.canvas.get(), &self.viewer.minimap);

        let mut tx = self.cameras.transaction();
        reconcile(&mut tx, &registrations, &frame, &self.viewer);
        tx.commit();

        self.frame.set(Rc::new(frame));
        self.recomputes.set(self.recomputes.get() + 1);
        log::trace!("🖼️ surface recomputed for {} views", registrations.len());
    }

    /// Apply another view's pan/zoom to every other linked view.
    fn apply_linked(&self, event: &CameraLink) {
        let registrations = self.registry.snapshot();
        let origin_linked = registrations
            .iter()
            .any(|r| r.id == event.origin && r.config.linked);
        if !origin_linked {
            return;
        }

        let mut tx = self.cameras.transaction();
        for r in registrations
            .iter()
            .filter(|r| r.config.linked && r.id != event.origin)
        {
            tx.apply_linked_update(&r.id, event.pan, event.zoom);
        }
        tx.commit();
    }

    fn is_linked(&self, id: &ViewId) -> bool {
        self.registry.get(id).is_some_and(|r| r.config.linked)
    }
}

/// The single surface all views render on.
pub struct SharedRenderSurface {
    inner: Rc<SurfaceInner>,
    _registry_sub: Subscription,
    _link_sub: Subscription,
}

impl SharedRenderSurface {
    /// Create the surface. Fails while another surface is alive on this
    /// thread.
    pub fn new(state: &AppState, viewer: ViewerConfig, canvas: Size) -> Result<Self, ViewerError> {
        if SURFACE_ACTIVE.with(|active| active.replace(true)) {
            log::error!("❌ a render surface already exists");
            return Err(ViewerError::SurfaceActive);
        }

        let inner = Rc::new(SurfaceInner {
            registry: ViewRegistry::new(),
            cameras: CameraStore::new(viewer),
            viewer,
            canvas: Cell::new(canvas),
            frame: Signal::new(Rc::new(Frame::default())),
            active: Signal::new(None),
            links: state.camera_links.clone(),
            recomputes: Cell::new(0),
        });

        let weak: Weak<SurfaceInner> = Rc::downgrade(&inner);
        let registry_sub = inner.registry.subscribe(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.recompute();
            }
        });

        let weak: Weak<SurfaceInner> = Rc::downgrade(&inner);
        let link_sub = state.camera_links.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_linked(event);
            }
        });

        inner.recompute();
        log::info!("🖼️ render surface created ({}x{})", canvas.width, canvas.height);

        Ok(Self {
            inner,
            _registry_sub: registry_sub,
            _link_sub: link_sub,
        })
    }

    pub fn registry(&self) -> &ViewRegistry {
        &self.inner.registry
    }

    pub fn cameras(&self) -> &CameraStore {
        &self.inner.cameras
    }

    pub fn viewer(&self) -> &ViewerConfig {
        &self.inner.viewer
    }

    /// Current frame layout; the same `Rc` until the layout changes.
    pub fn frame(&self) -> Rc<Frame> {
        self.inner.frame.get()
    }

    /// Id of the view that last received a pointer-down.
    pub fn active(&self) -> &Signal<Option<ViewId>> {
        &self.inner.active
    }

    pub fn camera(&self, id: &ViewId) -> Option<CameraState> {
        self.inner.cameras.get(id)
    }

    /// Number of recomputation passes so far.
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.get()
    }

    pub fn set_canvas(&self, canvas: Size) {
        if self.inner.canvas.replace(canvas) != canvas {
            self.inner.recompute();
        }
    }

    /// Register or update a mounted view.
    pub fn mount(&self, id: ViewId, config: ViewConfig) -> Result<bool, ViewerError> {
        self.inner.registry.register(id, config)
    }

    pub fn unmount(&self, id: &ViewId) -> bool {
        if self.inner.active.with(|a| a.as_ref() == Some(id)) {
            self.inner.active.set(None);
        }
        self.inner.registry.unregister(id)
    }

    /// Camera change from direct interaction with view `id`.
    ///
    /// An out-of-range zoom is clamped and the pan that came with it is
    /// dropped. Changes on a minimap pan its parent instead. Returns whether
    /// the store changed.
    pub fn handle_camera_change(&self, id: &ViewId, proposed: CameraState) -> bool {
        let inner = &self.inner;
        let Some(previous) = inner.cameras.get(id) else {
            log::warn!("⚠️ camera change for unknown view {}", id);
            return false;
        };
        if !proposed.is_finite() {
            log::warn!("⚠️ ignoring non-finite camera change for {}", id);
            return false;
        }

        // Minimap zoom is derived from its box; only the target moves the parent
        if let Some(parent) = id.minimap_parent() {
            let Some(parent_camera) = inner.cameras.get(&parent) else {
                return false;
            };
            return self.handle_camera_change(
                &parent,
                CameraState {
                    target: proposed.target,
                    ..parent_camera
                },
            );
        }

        let mut camera = proposed;
        if !inner.viewer.zoom_in_range(camera.zoom) {
            camera.zoom = inner.viewer.clamp_zoom(camera.zoom);
            camera.target = previous.target;
        }

        if !inner.cameras.apply_render_surface_update(id, camera) {
            return false;
        }

        if inner.is_linked(id) {
            inner.links.publish(&CameraLink {
                origin: id.clone(),
                pan: camera.target - previous.target,
                zoom: camera.zoom,
            });
        }
        true
    }

    /// Drag a view by a screen-space delta.
    pub fn pan_view(&self, id: &ViewId, dx: f32, dy: f32) -> bool {
        let Some(camera) = self.camera(id) else {
            return false;
        };
        self.handle_camera_change(id, zoom_math::pan_by(&camera, dx, dy))
    }

    /// Zoom a view by `delta` steps around a viewport-local anchor.
    pub fn zoom_view(&self, id: &ViewId, delta: f64, anchor: Point) -> bool {
        let (Some(camera), Some(viewport)) = (self.camera(id), self.frame().get(id).cloned()) else {
            return false;
        };
        let zoomed = zoom_math::zoom_at(&camera, viewport.bounds.size(), anchor, camera.zoom + delta);
        self.handle_camera_change(id, zoomed)
    }

    /// Request a camera for a view from outside the interaction path
    /// ("home", "jump to spine").
    pub fn set_camera_target(&self, id: &ViewId, request: CameraRequest) -> Result<(), ViewerError> {
        let registration = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| ViewerError::UnknownView { id: id.clone() })?;

        let (target, zoom) = match request {
            CameraRequest::Home { back_off } => registration
                .config
                .image
                .default_camera(registration.config.size, back_off)
                .ok_or_else(|| ViewerError::InvalidSize {
                    id: id.clone(),
                    width: registration.config.size.width,
                    height: registration.config.size.height,
                })?,
            CameraRequest::Jump { target, zoom } => {
                let zoom = zoom
                    .or(registration.config.zoom)
                    .or_else(|| self.camera(id).map(|c| c.zoom))
                    .unwrap_or(self.inner.viewer.min_zoom);
                (target, zoom)
            }
        };
        if !target.is_finite() || !zoom.is_finite() {
            return Err(ViewerError::NonFiniteCamera { id: id.clone() });
        }

        log::debug!("🎯 camera request for {}: {:?}", id, request);
        self.inner.registry.update(id, |config| {
            config.target = Some(target);
            config.zoom = Some(self.inner.viewer.clamp_zoom(zoom));
            config.version += 1;
        })?;
        Ok(())
    }

    /// Resolve a surface pointer-down to the sub-viewport under it and make
    /// its view the active one.
    pub fn route_pointer(&self, host: &dyn LayoutHost, position: Point) -> Option<SurfaceHit> {
        let routed = route_pointer(host, position)?;
        let frame = self.frame();
        let viewport = frame.viewport_at(position)?;

        let owner = match &viewport.kind {
            ViewportKind::Detail => viewport.id.clone(),
            ViewportKind::Minimap { parent } => parent.clone(),
        };
        self.inner.active.set(Some(owner));

        Some(SurfaceHit {
            view: viewport.id.clone(),
            kind: viewport.kind.clone(),
            local: viewport.bounds.to_local(position),
            switched: routed.switched,
        })
    }

    /// Image position under a viewport-local point.
    pub fn screen_to_world(&self, id: &ViewId, local: Point) -> Option<Target> {
        let camera = self.camera(id)?;
        let viewport = self.frame().get(id)?.bounds.size();
        Some(zoom_math::screen_to_world(&camera, viewport, local))
    }
}

impl Drop for SharedRenderSurface {
    fn drop(&mut self) {
        SURFACE_ACTIVE.with(|active| active.set(false));
        log::debug!("🖼️ render surface dropped");
    }
}
