//! Per-view overlay layer construction.
//!
//! A rebuild decodes every dataset the backend returns for the current
//! inputs. Inputs are compared against the last build; identical inputs
//! (including the revision counter) hand back the same layer set without
//! touching the backend.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use wmm_ui::{PrimitiveBatch, PrimitiveKind};

use super::dataset::{AnnotationDataset, DatasetProperties};
use super::decode::decode_features;
use super::style::{resolve_feature, FeatureStyle, LayerStyle};
use crate::backend::{AnnotationRequest, GuardedBackend};
use crate::model::{EditMode, ViewId};

/// Renderable form of one dataset.
pub struct OverlayLayer {
    /// Surface-wide unique layer id
    pub id: String,
    pub properties: Rc<DatasetProperties>,
    pub style: LayerStyle,
    pub batches: Vec<PrimitiveBatch>,
    /// Resolved feature styles, parallel to `batches`, indexed by feature index
    pub feature_styles: Vec<Vec<FeatureStyle>>,
    pub pickable: bool,
}

impl OverlayLayer {
    /// Id of the dataset this layer came from.
    pub fn layer_id(&self) -> &str {
        &self.properties.id
    }

    pub fn feature_style(&self, batch: usize, feature: u32) -> Option<&FeatureStyle> {
        self.feature_styles.get(batch)?.get(feature as usize)
    }
}

impl fmt::Debug for OverlayLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayLayer")
            .field("id", &self.id)
            .field("batches", &self.batches.len())
            .field("pickable", &self.pickable)
            .finish()
    }
}

/// Surface-wide id of a view's annotation layer.
pub fn layer_key(view: &ViewId, layer_id: &str) -> String {
    format!("-#{view}#-annotations-{layer_id}")
}

/// All overlay layers of one view, bottom first. Replaced wholesale on each
/// rebuild; compares by identity.
#[derive(Clone)]
pub struct LayerSet {
    layers: Rc<[OverlayLayer]>,
    /// Full-canvas layer that turns clicks on empty space into spine inserts
    background_hit: bool,
}

impl LayerSet {
    pub fn new(layers: Vec<OverlayLayer>, background_hit: bool) -> Self {
        Self {
            layers: Rc::from(layers),
            background_hit,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn layers(&self) -> &[OverlayLayer] {
        &self.layers
    }

    pub fn get(&self, index: usize) -> Option<&OverlayLayer> {
        self.layers.get(index)
    }

    pub fn find(&self, layer_id: &str) -> Option<&OverlayLayer> {
        self.layers.iter().find(|l| l.layer_id() == layer_id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn has_background_hit(&self) -> bool {
        self.background_hit
    }

    pub fn ptr_eq(&self, other: &LayerSet) -> bool {
        Rc::ptr_eq(&self.layers, &other.layers)
    }
}

impl Default for LayerSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for LayerSet {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) && self.background_hit == other.background_hit
    }
}

impl fmt::Debug for LayerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerSet")
            .field("layers", &self.layers)
            .field("background_hit", &self.background_hit)
            .finish()
    }
}

/// Everything a rebuild depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayInputs {
    pub view: ViewId,
    pub visible: bool,
    pub is_active: bool,
    pub request: AnnotationRequest,
    pub revision: u64,
}

/// Builds and caches one view's overlay layers.
pub struct OverlayBuilder {
    backend: GuardedBackend,
    last: RefCell<Option<(OverlayInputs, LayerSet)>>,
    builds: Cell<u64>,
}

impl OverlayBuilder {
    pub fn new(backend: GuardedBackend) -> Self {
        Self {
            backend,
            last: RefCell::new(None),
            builds: Cell::new(0),
        }
    }

    /// Number of rebuilds that went to the backend.
    pub fn build_count(&self) -> u64 {
        self.builds.get()
    }

    /// Forget the cached build; the next call rebuilds.
    pub fn invalidate(&self) {
        self.last.borrow_mut().take();
    }

    /// Layers for `inputs`, reusing the previous set when nothing changed.
    pub fn build(&self, inputs: &OverlayInputs) -> LayerSet {
        if let Some((cached, layers)) = &*self.last.borrow() {
            if cached == inputs {
                log::trace!("♻️ overlay cache hit for {}", inputs.view);
                return layers.clone();
            }
        }

        let layers = self.rebuild(inputs);
        *self.last.borrow_mut() = Some((inputs.clone(), layers.clone()));
        layers
    }

    fn rebuild(&self, inputs: &OverlayInputs) -> LayerSet {
        if !inputs.visible {
            return LayerSet::empty();
        }
        self.builds.set(self.builds.get() + 1);

        let mut request = inputs.request.clone();
        if request.editing_segment.is_none() {
            request.edit_mode = EditMode::MoveSpine;
        }
        request.toggles.origin |= request.edit_mode == EditMode::SetOrigin;

        let datasets = self.backend.decode_annotations(&request).unwrap_or_default();
        let layers: Vec<OverlayLayer> = datasets
            .into_iter()
            .map(|dataset| build_layer(&inputs.view, dataset))
            .collect();

        let background_hit = inputs.is_active && request.editing_segment.is_some();
        log::debug!(
            "🎨 rebuilt {} overlay layers for {} at revision {}",
            layers.len(),
            inputs.view,
            inputs.revision
        );
        LayerSet::new(layers, background_hit)
    }
}

fn build_layer(view: &ViewId, dataset: AnnotationDataset) -> OverlayLayer {
    let AnnotationDataset {
        properties,
        points,
        lines,
        polygons,
    } = dataset;

    let families = [
        (PrimitiveKind::Points, points),
        (PrimitiveKind::Lines, lines),
        (PrimitiveKind::Polygons, polygons),
    ];

    let mut batches = Vec::new();
    for (kind, raw) in families {
        let Some(raw) = raw else { continue };
        match decode_features(kind, &raw) {
            Ok(batch) => batches.push(batch),
            Err(e) => {
                log::warn!("⚠️ skipping {:?} of layer '{}': {}", kind, properties.id, e);
            }
        }
    }
    let feature_styles = batches
        .iter()
        .map(|batch| {
            batch
                .ids
                .iter()
                .map(|&id| resolve_feature(&properties, id))
                .collect()
        })
        .collect();

    OverlayLayer {
        id: layer_key(view, &properties.id),
        style: LayerStyle::for_properties(&properties),
        pickable: properties.is_pickable(),
        properties: Rc::new(properties),
        batches,
        feature_styles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{AlertSink, ImageHandle, RecordingAlertSink};
    use crate::model::ZRange;

    fn builder() -> (OverlayBuilder, MemoryBackend) {
        let backend = MemoryBackend::demo();
        let guarded = GuardedBackend::new(
            ImageHandle::from_backend(backend.clone()),
            Rc::new(RecordingAlertSink::default()) as Rc<dyn AlertSink>,
        );
        (OverlayBuilder::new(guarded), backend)
    }

    fn inputs(revision: u64) -> OverlayInputs {
        OverlayInputs {
            view: ViewId::new("v1"),
            visible: true,
            is_active: true,
            request: AnnotationRequest {
                z_range: ZRange::new(0, 10),
                ..Default::default()
            },
            revision,
        }
    }

    #[test]
    fn test_same_inputs_return_same_layers() {
        let (builder, _) = builder();
        let first = builder.build(&inputs(0));
        let second = builder.build(&inputs(0));
        assert!(first.ptr_eq(&second));
        assert_eq!(builder.build_count(), 1);
    }

    #[test]
    fn test_revision_bump_rebuilds() {
        let (builder, _) = builder();
        let first = builder.build(&inputs(0));
        let second = builder.build(&inputs(1));
        assert!(!first.ptr_eq(&second));
        assert_eq!(builder.build_count(), 2);
    }

    #[test]
    fn test_layer_ids_are_scoped_to_view() {
        let (builder, _) = builder();
        let layers = builder.build(&inputs(0));
        assert!(!layers.is_empty());
        assert!(
            layers
                .layers()
                .iter()
                .all(|l| l.id.starts_with("-#v1#-annotations-"))
        );
        assert!(layers.find("spines").is_some());
    }

    #[test]
    fn test_hidden_view_has_no_layers() {
        let (builder, _) = builder();
        let mut hidden = inputs(0);
        hidden.visible = false;
        assert!(builder.build(&hidden).is_empty());
        assert_eq!(builder.build_count(), 0);
    }

    #[test]
    fn test_label_layer_renders_without_interactions() {
        let (builder, _) = builder();
        let layers = builder.build(&inputs(0));
        let labels = layers.find("labels").unwrap();
        assert!(!labels.pickable);
        let text = labels.feature_style(0, 0).and_then(|s| s.text.clone());
        assert!(text.is_some());
    }

    #[test]
    fn test_background_hit_needs_active_edit_session() {
        let (builder, backend) = builder();
        assert!(!builder.build(&inputs(0)).has_background_hit());

        let mut editing = inputs(0);
        editing.request.editing_segment = Some(backend.segment_ids()[0]);
        assert!(builder.build(&editing).has_background_hit());

        editing.is_active = false;
        assert!(!builder.build(&editing).has_background_hit());
    }
}
