//! Per-view annotation overlays: decoding backend datasets into render
//! layers, styling them, and routing pointer interaction back to the
//! backend.

mod builder;
mod dataset;
mod decode;
mod interaction;
mod pick;
mod style;

pub use builder::{layer_key, LayerSet, OverlayBuilder, OverlayInputs, OverlayLayer};
pub use dataset::{
    AnnotationDataset, DatasetProperties, DragFn, DragState, HoverOutFn, PointerFn, RawFeatures,
    SelectionKey, StyleValue, UnknownSelectionKey,
};
pub use decode::{decode_features, encode_features};
pub use interaction::{InteractionController, PointerInput, PressOutcome};
pub use pick::{pick, Pick};
pub use style::{apply_opacity, resolve_feature, FeatureStyle, LayerStyle, LineDecoration, PointKind, WidthUnits};
