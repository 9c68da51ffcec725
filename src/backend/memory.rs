//! In-memory reference backend.
//!
//! Holds segments (paths) and their spines for one time point and renders
//! them as annotation datasets. Pixel data is synthesised on the fly. Used
//! by the demo binary and by every interaction test.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use wmm_ui::Rgb;

use super::{AnnotationRequest, CancelToken, RasterSlice, SliceFuture, TimePoint};
use crate::constants::GHOST_ALPHA;
use crate::error::BackendError;
use crate::model::{ImageShape, SegmentId, SpineId};
use crate::overlay::encode_features;
use crate::overlay::{AnnotationDataset, DatasetProperties, DragState, SelectionKey, StyleValue};

const EDITING_COLOR: Rgb = [0, 255, 0];
const SELECTED_COLOR: Rgb = [255, 255, 0];
const SPINE_COLOR: Rgb = [0, 150, 255];
const SELECTED_SPINE_COLOR: Rgb = [255, 0, 0];

#[derive(Debug, Clone)]
struct Segment {
    path: Vec<[f64; 3]>,
    color: Rgb,
}

#[derive(Debug, Clone, Copy)]
struct Spine {
    segment: SegmentId,
    position: [f64; 3],
}

#[derive(Debug)]
struct Store {
    shape: ImageShape,
    index: u32,
    segments: BTreeMap<SegmentId, Segment>,
    spines: BTreeMap<SpineId, Spine>,
    next_id: u64,
    hovered: Option<SpineId>,
    drags: Vec<(SpineId, DragState)>,
}

impl Store {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn move_spine(&mut self, spine: SpineId, x: f64, y: f64, z: i64) -> Result<(), BackendError> {
        let entry = self
            .spines
            .get_mut(&spine)
            .ok_or_else(|| BackendError::failed("drag", format!("KeyError: no spine {spine}")))?;
        entry.position = [x, y, z as f64];
        Ok(())
    }
}

/// One time point held entirely in memory. Clones share the same data.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Rc<RefCell<Store>>,
}

impl MemoryBackend {
    /// An empty time point with the given pixel extent.
    pub fn new(shape: ImageShape, index: u32) -> Self {
        Self {
            store: Rc::new(RefCell::new(Store {
                shape,
                index,
                segments: BTreeMap::new(),
                spines: BTreeMap::new(),
                next_id: 1,
                hovered: None,
                drags: Vec::new(),
            })),
        }
    }

    /// A small annotated stack: two segments carrying spines and one empty
    /// segment.
    pub fn demo() -> Self {
        let backend = Self::new(ImageShape::new(512, 512, 20, 2), 0);
        let first = backend.add_segment(
            vec![[40.0, 60.0, 2.0], [160.0, 120.0, 4.0], [300.0, 180.0, 6.0], [420.0, 260.0, 8.0]],
            [255, 0, 255],
        );
        let second = backend.add_segment(
            vec![[80.0, 400.0, 10.0], [240.0, 380.0, 12.0], [460.0, 440.0, 14.0]],
            [0, 255, 255],
        );
        backend.add_segment(vec![[20.0, 480.0, 1.0], [60.0, 500.0, 1.0]], [200, 200, 200]);

        for (segment, position) in [
            (first, [150.0, 100.0, 3.0]),
            (first, [310.0, 200.0, 5.0]),
            (second, [230.0, 360.0, 12.0]),
            (second, [450.0, 460.0, 15.0]),
        ] {
            let mut store = backend.store.borrow_mut();
            let id = store.allocate_id();
            store.spines.insert(id, Spine { segment, position });
        }
        backend
    }

    /// Add a segment with a path; returns its id.
    pub fn add_segment(&self, path: Vec<[f64; 3]>, color: Rgb) -> SegmentId {
        let mut store = self.store.borrow_mut();
        let id = store.allocate_id();
        store.segments.insert(id, Segment { path, color });
        id
    }

    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.store.borrow().segments.keys().copied().collect()
    }

    pub fn spine_ids(&self) -> Vec<SpineId> {
        self.store.borrow().spines.keys().copied().collect()
    }

    pub fn spines_of(&self, segment: SegmentId) -> Vec<SpineId> {
        self.store
            .borrow()
            .spines
            .iter()
            .filter(|(_, s)| s.segment == segment)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn segment_color(&self, segment: SegmentId) -> Option<Rgb> {
        self.store.borrow().segments.get(&segment).map(|s| s.color)
    }

    /// Spine currently under the pointer, as reported by hover callbacks.
    pub fn hovered(&self) -> Option<SpineId> {
        self.store.borrow().hovered
    }

    /// Every drag callback received so far.
    pub fn drag_log(&self) -> Vec<(SpineId, DragState)> {
        self.store.borrow().drags.clone()
    }

    fn segments_dataset(store: &Store, request: &AnnotationRequest) -> Option<AnnotationDataset> {
        let mut positions = Vec::new();
        let mut feature_index = Vec::new();
        let mut start_indices = Vec::new();
        let mut ids = Vec::new();
        for (&id, segment) in store.segments.iter().filter(|(_, s)| !s.path.is_empty()) {
            start_indices.push(positions.len() as u32);
            for &[x, y, _] in &segment.path {
                positions.push([x as f32, y as f32]);
                feature_index.push(ids.len() as u32);
            }
            ids.push(id);
        }
        if ids.is_empty() {
            return None;
        }

        let colors: BTreeMap<SegmentId, Rgb> =
            store.segments.iter().map(|(&id, s)| (id, s.color)).collect();
        let selected = request.selected_segment;
        let editing = request.editing_segment;

        let mut properties = DatasetProperties::new("segments");
        properties.select = Some(SelectionKey::SegmentId);
        properties.edit = Some(SelectionKey::SegmentIdEditing);
        properties.stroke = Some(StyleValue::accessor(move |id| {
            let rgb = if Some(id) == editing {
                EDITING_COLOR
            } else if Some(id) == selected {
                SELECTED_COLOR
            } else {
                colors.get(&id).copied().unwrap_or(SELECTED_COLOR)
            };
            rgb.to_vec()
        }));
        properties.stroke_width = Some(StyleValue::Constant(3.0));

        let mut dataset = AnnotationDataset::new(properties);
        dataset.lines = Some(encode_features(&positions, &feature_index, &start_indices, &ids));
        Some(dataset)
    }

    fn anchors_dataset(store: &Store, request: &AnnotationRequest) -> Option<AnnotationDataset> {
        let anchors: Vec<(SegmentId, [f32; 2])> = store
            .segments
            .iter()
            .flat_map(|(&id, s)| s.path.iter().map(move |p| (id, p)))
            .filter(|(_, p)| request.z_range.contains(p[2] as i64))
            .map(|(id, p)| (id, [p[0] as f32, p[1] as f32]))
            .collect();
        if anchors.is_empty() {
            return None;
        }

        let positions: Vec<[f32; 2]> = anchors.iter().map(|(_, p)| *p).collect();
        let feature_index: Vec<u32> = (0..anchors.len() as u32).collect();
        let ids: Vec<u64> = anchors.iter().map(|(id, _)| *id).collect();

        let mut properties = DatasetProperties::new("anchors");
        properties.fill = Some(StyleValue::Constant(vec![255, 255, 255]));
        properties.radius = Some(StyleValue::Constant(2.0));
        properties.opacity = Some(GHOST_ALPHA);

        let mut dataset = AnnotationDataset::new(properties);
        dataset.points = Some(encode_features(&positions, &feature_index, &[], &ids));
        Some(dataset)
    }

    fn origin_dataset(store: &Store, segment: SegmentId) -> Option<AnnotationDataset> {
        let origin = store.segments.get(&segment)?.path.first()?;
        let mut properties = DatasetProperties::new("origin");
        properties.fill = Some(StyleValue::Constant(EDITING_COLOR.to_vec()));
        properties.radius = Some(StyleValue::Constant(5.0));

        let mut dataset = AnnotationDataset::new(properties);
        dataset.points = Some(encode_features(
            &[[origin[0] as f32, origin[1] as f32]],
            &[0],
            &[],
            &[segment],
        ));
        Some(dataset)
    }

    fn visible_spines(store: &Store, request: &AnnotationRequest) -> Vec<(SpineId, Spine)> {
        store
            .spines
            .iter()
            .filter(|(_, s)| request.z_range.contains(s.position[2] as i64))
            .filter(|(id, _)| request.filters.as_ref().is_none_or(|f| f.contains(id)))
            .map(|(&id, &s)| (id, s))
            .collect()
    }

    fn spines_dataset(&self, spines: &[(SpineId, Spine)], request: &AnnotationRequest) -> AnnotationDataset {
        let owners: BTreeMap<SpineId, SegmentId> =
            spines.iter().map(|(id, s)| (*id, s.segment)).collect();
        let selected = request.selected_spine;
        let editing = request.editing_segment;

        let mut properties = DatasetProperties::new("spines");
        properties.select = Some(SelectionKey::SpineId);
        properties.fill = Some(StyleValue::accessor(move |id| {
            let [r, g, b] = if Some(id) == selected {
                SELECTED_SPINE_COLOR
            } else {
                SPINE_COLOR
            };
            let ghosted = editing.is_some_and(|seg| owners.get(&id) != Some(&seg));
            vec![r, g, b, if ghosted { GHOST_ALPHA } else { 255 }]
        }));
        properties.radius = Some(StyleValue::Constant(4.0));

        let store = Rc::clone(&self.store);
        properties.drag = Some(Rc::new(
            move |id: SpineId, x: f64, y: f64, z: i64, state: DragState| -> Result<bool, BackendError> {
                let mut store = store.borrow_mut();
                store.drags.push((id, state));
                match state {
                    DragState::Start => Ok(false),
                    DragState::Dragging | DragState::End => {
                        store.move_spine(id, x, y, z)?;
                        Ok(true)
                    }
                }
            },
        ));
        let store = Rc::clone(&self.store);
        properties.hover = Some(Rc::new(
            move |id: SpineId, _: f64, _: f64, _: i64| -> Result<bool, BackendError> {
                store.borrow_mut().hovered = Some(id);
                Ok(false)
            },
        ));
        let store = Rc::clone(&self.store);
        properties.hover_out = Some(Rc::new(move || -> Result<bool, BackendError> {
            store.borrow_mut().hovered = None;
            Ok(false)
        }));

        let mut dataset = AnnotationDataset::new(properties);
        dataset.points = Some(Self::encode_spines(spines));
        dataset
    }

    fn labels_dataset(spines: &[(SpineId, Spine)]) -> AnnotationDataset {
        let mut properties = DatasetProperties::new("labels");
        properties.label = true;
        properties.fill = Some(StyleValue::Constant(vec![255, 255, 255]));

        let mut dataset = AnnotationDataset::new(properties);
        dataset.points = Some(Self::encode_spines(spines));
        dataset
    }

    fn encode_spines(spines: &[(SpineId, Spine)]) -> crate::overlay::RawFeatures {
        let positions: Vec<[f32; 2]> = spines
            .iter()
            .map(|(_, s)| [s.position[0] as f32, s.position[1] as f32])
            .collect();
        let feature_index: Vec<u32> = (0..spines.len() as u32).collect();
        let ids: Vec<u64> = spines.iter().map(|(id, _)| *id).collect();
        encode_features(&positions, &feature_index, &[], &ids)
    }
}

/// Synthetic intensity of one voxel.
fn voxel(x: u32, y: u32, z: i64, channel: u32) -> u16 {
    let base = (x ^ y) as i64 + z * 37 + channel as i64 * 101;
    (base.rem_euclid(2048)) as u16
}

impl TimePoint for MemoryBackend {
    fn index(&self) -> u32 {
        self.store.borrow().index
    }

    fn image_shape(&self) -> ImageShape {
        self.store.borrow().shape
    }

    fn decode_annotations(
        &self,
        request: &AnnotationRequest,
    ) -> Result<Vec<AnnotationDataset>, BackendError> {
        let store = self.store.borrow();
        let toggles = request.toggles;
        let mut datasets = Vec::new();

        if toggles.line_segments {
            datasets.extend(Self::segments_dataset(&store, request));
        }
        if toggles.anchors {
            datasets.extend(Self::anchors_dataset(&store, request));
        }
        if toggles.origin {
            if let Some(segment) = request.editing_segment {
                datasets.extend(Self::origin_dataset(&store, segment));
            }
        }

        let spines = Self::visible_spines(&store, request);
        if toggles.spines && !spines.is_empty() {
            datasets.push(self.spines_dataset(&spines, request));
        }
        if toggles.labels && !spines.is_empty() {
            datasets.push(Self::labels_dataset(&spines));
        }
        Ok(datasets)
    }

    fn add_spine(
        &self,
        segment: SegmentId,
        x: f64,
        y: f64,
        z: i64,
    ) -> Result<Option<SpineId>, BackendError> {
        let mut store = self.store.borrow_mut();
        if !store.segments.contains_key(&segment) {
            return Ok(None);
        }
        let id = store.allocate_id();
        store.spines.insert(
            id,
            Spine {
                segment,
                position: [x, y, z as f64],
            },
        );
        log::debug!("➕ spine {} added to segment {}", id, segment);
        Ok(Some(id))
    }

    fn delete_spine(&self, spine: SpineId) -> Result<(), BackendError> {
        self.store
            .borrow_mut()
            .spines
            .remove(&spine)
            .map(|_| ())
            .ok_or_else(|| BackendError::failed("delete_spine", format!("KeyError: no spine {spine}")))
    }

    fn delete_segment(&self, segment: SegmentId) -> Result<bool, BackendError> {
        let mut store = self.store.borrow_mut();
        if !store.segments.contains_key(&segment) {
            return Ok(false);
        }
        if store.spines.values().any(|s| s.segment == segment) {
            return Err(BackendError::failed(
                "delete_segment",
                format!("ValueError: segment {segment} still has spines"),
            ));
        }
        store.segments.remove(&segment);
        Ok(true)
    }

    fn set_segment_color(&self, segment: SegmentId, color: Rgb) -> Result<bool, BackendError> {
        let mut store = self.store.borrow_mut();
        let Some(entry) = store.segments.get_mut(&segment) else {
            return Ok(false);
        };
        entry.color = color;
        Ok(true)
    }

    fn new_segment(&self) -> Result<SegmentId, BackendError> {
        Ok(self.add_segment(Vec::new(), [255, 255, 255]))
    }

    fn on_delete_selection(&self) -> Result<bool, BackendError> {
        // No generic selection beyond spines and segments.
        Ok(false)
    }

    fn spine_position(&self, spine: SpineId) -> Result<Option<[f64; 3]>, BackendError> {
        Ok(self.store.borrow().spines.get(&spine).map(|s| s.position))
    }

    fn neighbour_spine(
        &self,
        spine: Option<SpineId>,
        forward: bool,
    ) -> Result<Option<SpineId>, BackendError> {
        let store = self.store.borrow();
        let next = match (spine, forward) {
            (None, true) => store.spines.keys().next(),
            (None, false) => store.spines.keys().next_back(),
            (Some(id), true) => store.spines.range(id + 1..).next().map(|(k, _)| k),
            (Some(id), false) => store.spines.range(..id).next_back().map(|(k, _)| k),
        };
        Ok(next.copied())
    }

    fn fetch_slice(&self, channel: u32, z: crate::model::ZRange, cancel: &CancelToken) -> SliceFuture<'_> {
        let cancel = cancel.clone();
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let shape = self.image_shape();
            if channel >= shape.channels {
                return Err(BackendError::failed(
                    "fetch_slice",
                    format!("IndexError: channel {channel} out of range"),
                ));
            }

            let low = z.low.max(0);
            let high = z.high.min(shape.slices as i64);
            let (width, height) = (shape.width, shape.height);
            let data: Vec<u16> = (0..height)
                .flat_map(|y| {
                    (0..width).map(move |x| (low..high).map(|z| voxel(x, y, z, channel)).max().unwrap_or(0))
                })
                .collect();
            Ok(RasterSlice::new(width, height, data))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ZRange;
    use crate::overlay::decode_features;
    use wmm_ui::PrimitiveKind;

    fn request(z: ZRange) -> AnnotationRequest {
        AnnotationRequest {
            z_range: z,
            ..Default::default()
        }
    }

    fn dataset<'a>(datasets: &'a [AnnotationDataset], id: &str) -> Option<&'a AnnotationDataset> {
        datasets.iter().find(|d| d.properties.id == id)
    }

    #[test]
    fn test_demo_segment_spine_ownership() {
        let backend = MemoryBackend::demo();
        let segments = backend.segment_ids();
        assert_eq!(segments.len(), 3);
        assert_eq!(backend.spines_of(segments[0]).len(), 2);
        assert!(backend.spines_of(segments[2]).is_empty());
    }

    #[test]
    fn test_spines_follow_z_window_and_filters() {
        let backend = MemoryBackend::demo();
        let datasets = backend.decode_annotations(&request(ZRange::new(0, 10))).unwrap();
        let spines = dataset(&datasets, "spines").unwrap();
        let batch = decode_features(PrimitiveKind::Points, spines.points.as_ref().unwrap()).unwrap();
        assert_eq!(batch.ids.len(), 2);

        let first = batch.ids[0];
        let mut filtered = request(ZRange::new(0, 10));
        filtered.filters = Some([first].into_iter().collect());
        let datasets = backend.decode_annotations(&filtered).unwrap();
        let spines = dataset(&datasets, "spines").unwrap();
        let batch = decode_features(PrimitiveKind::Points, spines.points.as_ref().unwrap()).unwrap();
        assert_eq!(batch.ids, vec![first]);
    }

    #[test]
    fn test_segments_are_one_path_each() {
        let backend = MemoryBackend::demo();
        let datasets = backend.decode_annotations(&request(ZRange::new(0, 20))).unwrap();
        let segments = dataset(&datasets, "segments").unwrap();
        let batch = decode_features(PrimitiveKind::Lines, segments.lines.as_ref().unwrap()).unwrap();
        assert_eq!(batch.primitive_count(), 3);
        assert_eq!(batch.ids, backend.segment_ids());
    }

    #[test]
    fn test_origin_only_while_editing() {
        let backend = MemoryBackend::demo();
        let mut req = request(ZRange::new(0, 20));
        let datasets = backend.decode_annotations(&req).unwrap();
        assert!(dataset(&datasets, "origin").is_none());

        req.editing_segment = Some(backend.segment_ids()[0]);
        let datasets = backend.decode_annotations(&req).unwrap();
        assert!(dataset(&datasets, "origin").is_some());
    }

    #[test]
    fn test_delete_segment_with_spines_fails() {
        let backend = MemoryBackend::demo();
        let segments = backend.segment_ids();
        assert!(backend.delete_segment(segments[0]).is_err());
        assert_eq!(backend.delete_segment(segments[2]), Ok(true));
        assert_eq!(backend.delete_segment(segments[2]), Ok(false));
    }

    #[test]
    fn test_neighbour_spine_walks_in_id_order() {
        let backend = MemoryBackend::demo();
        let spines = backend.spine_ids();
        assert_eq!(backend.neighbour_spine(None, true), Ok(Some(spines[0])));
        assert_eq!(backend.neighbour_spine(Some(spines[0]), true), Ok(Some(spines[1])));
        assert_eq!(backend.neighbour_spine(Some(spines[0]), false), Ok(None));
        assert_eq!(backend.neighbour_spine(None, false), Ok(spines.last().copied()));
    }

    #[test]
    fn test_drag_moves_spine_after_start() {
        let backend = MemoryBackend::demo();
        let datasets = backend.decode_annotations(&request(ZRange::new(0, 10))).unwrap();
        let drag = dataset(&datasets, "spines").unwrap().properties.drag.clone().unwrap();
        let spine = backend.spine_ids()[0];

        assert_eq!(drag(spine, 1.0, 2.0, 3, DragState::Start), Ok(false));
        assert_eq!(drag(spine, 7.0, 8.0, 4, DragState::Dragging), Ok(true));
        assert_eq!(backend.spine_position(spine), Ok(Some([7.0, 8.0, 4.0])));
        assert_eq!(
            backend.drag_log(),
            vec![(spine, DragState::Start), (spine, DragState::Dragging)]
        );
    }

    #[test]
    fn test_slice_is_max_projection() {
        let backend = MemoryBackend::new(ImageShape::new(2, 2, 4, 1), 0);
        let slice = pollster::block_on(backend.fetch_slice(0, ZRange::new(1, 3), &CancelToken::new())).unwrap();
        assert_eq!(slice.pixel(0, 0), Some(voxel(0, 0, 2, 0)));
        assert_eq!(slice.data.len(), 4);
    }
}
