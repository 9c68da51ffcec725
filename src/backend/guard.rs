//! Error boundary around backend calls.
//!
//! Interaction handlers never see a backend error: failures are logged,
//! reported to an [`AlertSink`] and turned into "nothing happened".

use std::cell::RefCell;
use std::rc::Rc;

use wmm_ui::Rgb;

use super::{AnnotationRequest, ImageHandle};
use crate::error::BackendError;
use crate::model::{SegmentId, SpineId};
use crate::overlay::AnnotationDataset;

/// Receives user-visible failure messages.
pub trait AlertSink {
    fn alert(&self, message: &str);
}

/// Sink that only logs; used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn alert(&self, message: &str) {
        log::warn!("⚠️ {}", message);
    }
}

/// Sink that keeps every message, for headless sessions and tests.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    messages: RefCell<Vec<String>>,
}

impl RecordingAlertSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// A time point whose failing calls report to an alert sink instead of
/// returning errors.
#[derive(Clone)]
pub struct GuardedBackend {
    handle: ImageHandle,
    alerts: Rc<dyn AlertSink>,
}

impl GuardedBackend {
    pub fn new(handle: ImageHandle, alerts: Rc<dyn AlertSink>) -> Self {
        Self { handle, alerts }
    }

    pub fn handle(&self) -> &ImageHandle {
        &self.handle
    }

    pub fn alerts(&self) -> &Rc<dyn AlertSink> {
        &self.alerts
    }

    /// Turn a failed result into `None`, alerting unless it was cancelled.
    pub fn guard<T>(&self, operation: &str, result: Result<T, BackendError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                report(&*self.alerts, operation, &err);
                None
            }
        }
    }

    /// Run an interaction callable; failures count as "no change".
    pub fn mutation(&self, operation: &str, f: impl FnOnce() -> Result<bool, BackendError>) -> bool {
        self.guard(operation, f()).unwrap_or(false)
    }

    pub fn decode_annotations(&self, request: &AnnotationRequest) -> Option<Vec<AnnotationDataset>> {
        self.guard("decode_annotations", self.handle.decode_annotations(request))
    }

    pub fn add_spine(&self, segment: SegmentId, x: f64, y: f64, z: i64) -> Option<SpineId> {
        self.guard("add_spine", self.handle.add_spine(segment, x, y, z))
            .flatten()
    }

    pub fn delete_spine(&self, spine: SpineId) -> bool {
        self.guard("delete_spine", self.handle.delete_spine(spine))
            .is_some()
    }

    pub fn delete_segment(&self, segment: SegmentId) -> bool {
        self.mutation("delete_segment", || self.handle.delete_segment(segment))
    }

    pub fn set_segment_color(&self, segment: SegmentId, color: Rgb) -> bool {
        self.mutation("set_segment_color", || {
            self.handle.set_segment_color(segment, color)
        })
    }

    pub fn new_segment(&self) -> Option<SegmentId> {
        self.guard("new_segment", self.handle.new_segment())
    }

    pub fn on_delete_selection(&self) -> bool {
        self.mutation("on_delete_selection", || self.handle.on_delete_selection())
    }

    pub fn spine_position(&self, spine: SpineId) -> Option<[f64; 3]> {
        self.guard("spine_position", self.handle.spine_position(spine))
            .flatten()
    }

    pub fn neighbour_spine(&self, spine: Option<SpineId>, forward: bool) -> Option<SpineId> {
        self.guard("neighbour_spine", self.handle.neighbour_spine(spine, forward))
            .flatten()
    }
}

/// Log a backend failure and alert the user unless it was a cancellation.
pub(crate) fn report(alerts: &dyn AlertSink, operation: &str, err: &BackendError) {
    if err.is_cancelled() {
        log::debug!("🚫 {} cancelled", operation);
        return;
    }
    log::error!("❌ {} failed: {}", operation, err);
    alerts.alert(&err.user_message());
}
