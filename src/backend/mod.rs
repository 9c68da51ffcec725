//! The annotation backend as seen by the viewer core.
//!
//! Each time point of a project is exposed as a [`TimePoint`]: pixel data,
//! annotation datasets for the overlays and the structural edit operations.
//! All calls are synchronous except slice fetches.

mod guard;
pub mod memory;
pub mod raster;

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::rc::Rc;

use wmm_ui::{Rgb, Size};

pub use guard::{AlertSink, GuardedBackend, LogAlertSink, RecordingAlertSink};
pub use raster::{CancelToken, RasterCache, RasterSlice, SliceKey};

use crate::error::BackendError;
use crate::model::{EditMode, ImageShape, SegmentId, SpineId, Target, ZRange};
use crate::overlay::AnnotationDataset;
use crate::zoom_math;

/// Future returned by [`TimePoint::fetch_slice`].
pub type SliceFuture<'a> = Pin<Box<dyn Future<Output = Result<RasterSlice, BackendError>> + 'a>>;

/// Which overlay families a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayToggles {
    pub line_segments: bool,
    pub anchors: bool,
    pub labels: bool,
    pub spines: bool,
    pub radius: bool,
    pub origin: bool,
}

impl Default for OverlayToggles {
    fn default() -> Self {
        Self {
            line_segments: true,
            anchors: true,
            labels: true,
            spines: true,
            radius: false,
            origin: true,
        }
    }
}

/// Everything the backend needs to produce one view's annotation datasets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationRequest {
    pub z_range: ZRange,
    /// Only these spines are shown when set
    pub filters: Option<BTreeSet<SpineId>>,
    pub selected_segment: Option<SegmentId>,
    pub selected_spine: Option<SpineId>,
    pub editing_segment: Option<SegmentId>,
    pub edit_mode: EditMode,
    pub toggles: OverlayToggles,
}

/// One time point of the annotation backend.
pub trait TimePoint {
    /// Position of this time point in its project.
    fn index(&self) -> u32;

    fn image_shape(&self) -> ImageShape;

    /// Starting camera for a viewport: the image centred and fitted, backed
    /// off by `back_off` zoom steps.
    fn default_camera(&self, viewport: Size, back_off: f64) -> Option<(Target, f64)> {
        let shape = self.image_shape();
        zoom_math::default_camera((shape.width, shape.height), viewport, back_off)
    }

    /// Annotation datasets to draw for the request, bottom layer first.
    fn decode_annotations(
        &self,
        request: &AnnotationRequest,
    ) -> Result<Vec<AnnotationDataset>, BackendError>;

    /// Add a spine to `segment` at image position `(x, y, z)`.
    fn add_spine(
        &self,
        segment: SegmentId,
        x: f64,
        y: f64,
        z: i64,
    ) -> Result<Option<SpineId>, BackendError>;

    fn delete_spine(&self, spine: SpineId) -> Result<(), BackendError>;

    /// Fails (or returns false) when the segment still owns spines.
    fn delete_segment(&self, segment: SegmentId) -> Result<bool, BackendError>;

    fn set_segment_color(&self, segment: SegmentId, color: Rgb) -> Result<bool, BackendError>;

    fn new_segment(&self) -> Result<SegmentId, BackendError>;

    /// Generic "delete whatever is selected" hook. Returns whether anything
    /// was deleted.
    fn on_delete_selection(&self) -> Result<bool, BackendError>;

    /// `(x, y, z)` of a spine.
    fn spine_position(&self, spine: SpineId) -> Result<Option<[f64; 3]>, BackendError>;

    /// Spine after (`forward`) or before `spine` in the backend's ordering.
    fn neighbour_spine(
        &self,
        spine: Option<SpineId>,
        forward: bool,
    ) -> Result<Option<SpineId>, BackendError>;

    /// Max-projection of `channel` over `z`. Must reject with
    /// [`BackendError::Cancelled`] once `cancel` fires.
    fn fetch_slice(&self, channel: u32, z: ZRange, cancel: &CancelToken) -> SliceFuture<'_>;
}

/// Handle of one time point, exclusively owned by the view showing it.
///
/// Handles compare by identity.
#[derive(Clone)]
pub struct ImageHandle(Rc<dyn TimePoint>);

impl ImageHandle {
    pub fn new(time_point: Rc<dyn TimePoint>) -> Self {
        Self(time_point)
    }

    pub fn from_backend(time_point: impl TimePoint + 'static) -> Self {
        Self(Rc::new(time_point))
    }
}

impl Deref for ImageHandle {
    type Target = dyn TimePoint;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageHandle").field(&self.0.index()).finish()
    }
}
