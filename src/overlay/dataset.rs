//! Annotation datasets as handed over by the backend binding.
//!
//! Style properties arrive already tagged as constant or per-feature
//! accessor, and interaction keys as a closed enum, so nothing downstream
//! inspects value shapes at runtime.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::BackendError;
use crate::model::{EditMode, FeatureId};

/// A style property: one value for every feature, or one per feature.
pub enum StyleValue<T> {
    Constant(T),
    Accessor(Rc<dyn Fn(FeatureId) -> T>),
}

impl<T: Clone> StyleValue<T> {
    pub fn accessor(f: impl Fn(FeatureId) -> T + 'static) -> Self {
        StyleValue::Accessor(Rc::new(f))
    }

    /// Value for one feature.
    pub fn resolve(&self, id: FeatureId) -> T {
        match self {
            StyleValue::Constant(value) => value.clone(),
            StyleValue::Accessor(f) => f(id),
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, StyleValue::Accessor(_))
    }
}

impl<T: Clone> Clone for StyleValue<T> {
    fn clone(&self) -> Self {
        match self {
            StyleValue::Constant(value) => StyleValue::Constant(value.clone()),
            StyleValue::Accessor(f) => StyleValue::Accessor(Rc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StyleValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            StyleValue::Accessor(_) => f.write_str("Accessor(..)"),
        }
    }
}

/// Selection signal a click on a dataset writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKey {
    /// The selected segment
    SegmentId,
    /// The segment under structural edit
    SegmentIdEditing,
    /// The selected spine
    SpineId,
}

impl SelectionKey {
    /// Edit mode a selection through this key resets to, if any.
    pub fn edit_mode(self) -> Option<EditMode> {
        match self {
            SelectionKey::SegmentIdEditing => Some(EditMode::MoveSpine),
            SelectionKey::SegmentId | SelectionKey::SpineId => None,
        }
    }

    /// Name used by the backend binding.
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionKey::SegmentId => "segmentID",
            SelectionKey::SegmentIdEditing => "segmentIDEditing",
            SelectionKey::SpineId => "spineID",
        }
    }
}

/// A selection key name the viewer does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown selection key '{0}'")]
pub struct UnknownSelectionKey(pub String);

impl FromStr for SelectionKey {
    type Err = UnknownSelectionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "segmentID" => Ok(SelectionKey::SegmentId),
            "segmentIDEditing" => Ok(SelectionKey::SegmentIdEditing),
            "spineID" => Ok(SelectionKey::SpineId),
            other => Err(UnknownSelectionKey(other.to_string())),
        }
    }
}

/// Phase of a drag gesture as reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Start,
    Dragging,
    End,
}

/// `click`/`hover` callable: `(feature, x, y, mid_z)` → did it mutate.
pub type PointerFn = Rc<dyn Fn(FeatureId, f64, f64, i64) -> Result<bool, BackendError>>;

/// `drag` callable: `(feature, x, y, mid_z, state)` → did it mutate.
pub type DragFn = Rc<dyn Fn(FeatureId, f64, f64, i64, DragState) -> Result<bool, BackendError>>;

/// `hoverOut` callable.
pub type HoverOutFn = Rc<dyn Fn() -> Result<bool, BackendError>>;

/// Named properties of a dataset. Every field is optional.
#[derive(Clone, Default)]
pub struct DatasetProperties {
    /// Layer id, unique within one view
    pub id: String,
    /// Key written on a single click
    pub select: Option<SelectionKey>,
    /// Key written on a double click
    pub edit: Option<SelectionKey>,
    pub click: Option<PointerFn>,
    pub drag: Option<DragFn>,
    pub hover: Option<PointerFn>,
    pub hover_out: Option<HoverOutFn>,
    /// RGB or RGBA components
    pub fill: Option<StyleValue<Vec<u8>>>,
    /// RGB or RGBA components
    pub stroke: Option<StyleValue<Vec<u8>>>,
    pub radius: Option<StyleValue<f32>>,
    pub stroke_width: Option<StyleValue<f32>>,
    /// Sideways line offset in image units
    pub offset: Option<StyleValue<f32>>,
    /// Outline width relative to the stroke
    pub outline: Option<StyleValue<f32>>,
    /// Alpha written into fill and stroke colors
    pub opacity: Option<u8>,
    /// Widths and radii are in image units rather than screen pixels
    pub fixed: bool,
    /// Points render as their feature id
    pub label: bool,
}

impl DatasetProperties {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// True when clicking, hovering or dragging this dataset does anything.
    pub fn is_pickable(&self) -> bool {
        self.select.is_some()
            || self.edit.is_some()
            || self.click.is_some()
            || self.drag.is_some()
            || self.hover.is_some()
            || self.hover_out.is_some()
    }
}

impl fmt::Debug for DatasetProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetProperties")
            .field("id", &self.id)
            .field("select", &self.select)
            .field("edit", &self.edit)
            .field("click", &self.click.is_some())
            .field("drag", &self.drag.is_some())
            .field("hover", &self.hover.is_some())
            .field("fill", &self.fill)
            .field("stroke", &self.stroke)
            .field("opacity", &self.opacity)
            .field("fixed", &self.fixed)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// One geometry family as raw native-endian byte buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeatures {
    /// `f32` pairs
    pub positions: Vec<u8>,
    /// `u32` feature index per vertex
    pub feature_index: Vec<u8>,
    /// `u32` start vertex per path or polygon; empty for points
    pub start_indices: Vec<u8>,
    /// Correlation id per feature index
    pub ids: Vec<u64>,
}

/// A dataset: properties plus up to three geometry families.
#[derive(Debug, Clone, Default)]
pub struct AnnotationDataset {
    pub properties: DatasetProperties,
    pub points: Option<RawFeatures>,
    pub lines: Option<RawFeatures>,
    pub polygons: Option<RawFeatures>,
}

impl AnnotationDataset {
    pub fn new(properties: DatasetProperties) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_keys_parse() {
        assert_eq!("segmentID".parse(), Ok(SelectionKey::SegmentId));
        assert_eq!("segmentIDEditing".parse(), Ok(SelectionKey::SegmentIdEditing));
        assert_eq!("spineID".parse(), Ok(SelectionKey::SpineId));
        assert!("tag".parse::<SelectionKey>().is_err());
        assert_eq!(SelectionKey::SpineId.as_str(), "spineID");
    }

    #[test]
    fn test_only_editing_key_resets_mode() {
        assert_eq!(
            SelectionKey::SegmentIdEditing.edit_mode(),
            Some(EditMode::MoveSpine)
        );
        assert_eq!(SelectionKey::SpineId.edit_mode(), None);
    }

    #[test]
    fn test_style_value_resolution() {
        let constant = StyleValue::Constant(2.0_f32);
        let accessor = StyleValue::accessor(|id| id as f32 * 10.0);
        assert_eq!(constant.resolve(7), 2.0);
        assert_eq!(accessor.resolve(7), 70.0);
        assert!(accessor.is_accessor());
        assert!(!constant.is_accessor());
    }

    #[test]
    fn test_dataset_without_interactions_is_not_pickable() {
        let mut props = DatasetProperties::new("labels");
        assert!(!props.is_pickable());
        props.hover_out = Some(Rc::new(|| Ok(false)));
        assert!(props.is_pickable());
    }
}
