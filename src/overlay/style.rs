//! Per-feature style resolution and layer-wide style rules.

use wmm_ui::Color;

use super::dataset::{DatasetProperties, StyleValue};
use crate::model::FeatureId;

const TEXT_SIZE_MIN_PIXELS: f32 = 10.0;
const TEXT_SIZE_MAX_PIXELS: f32 = 13.0;

/// Unit a width or radius is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthUnits {
    /// Screen pixels, independent of zoom
    Pixels,
    /// Image pixels, scaled with zoom
    Image,
}

/// How points of a layer are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Circle,
    Text,
}

/// Extra line treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDecoration {
    None,
    /// Lines are shifted sideways by the feature offset
    Offset,
    /// Lines get an outline relative to their width
    Outline,
}

/// Style metadata shared by every feature of a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerStyle {
    pub point_kind: PointKind,
    pub line_width_units: WidthUnits,
    pub line_width_min_pixels: f32,
    pub line_width_scale: f32,
    pub radius_units: WidthUnits,
    pub radius_min_pixels: f32,
    pub radius_max_pixels: f32,
    pub radius_scale: f32,
    pub text_size_pixels: (f32, f32),
    pub decoration: LineDecoration,
}

impl LayerStyle {
    pub fn for_properties(props: &DatasetProperties) -> Self {
        let decoration = if props.offset.is_some() {
            LineDecoration::Offset
        } else if props.outline.is_some() {
            LineDecoration::Outline
        } else {
            LineDecoration::None
        };
        let world_lines = decoration != LineDecoration::None;

        Self {
            point_kind: if props.label {
                PointKind::Text
            } else {
                PointKind::Circle
            },
            line_width_units: if props.fixed || world_lines {
                WidthUnits::Image
            } else {
                WidthUnits::Pixels
            },
            line_width_min_pixels: if props.fixed || world_lines { 0.0 } else { 1.0 },
            line_width_scale: if props.fixed || world_lines { 1.0 } else { 2.0 },
            radius_units: if props.fixed {
                WidthUnits::Image
            } else {
                WidthUnits::Pixels
            },
            radius_min_pixels: 3.0,
            radius_max_pixels: if props.fixed { 2.0 } else { 7.0 },
            radius_scale: 2.0,
            text_size_pixels: (TEXT_SIZE_MIN_PIXELS, TEXT_SIZE_MAX_PIXELS),
            decoration,
        }
    }
}

/// Resolved style of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStyle {
    pub fill: Color,
    pub stroke: Color,
    pub radius: f32,
    pub width: f32,
    pub offset: Option<f32>,
    pub outline: Option<f32>,
    /// Text drawn in place of a point
    pub text: Option<String>,
}

/// Write `opacity` into component 3 of an RGB or RGBA array.
///
/// Arrays of any other length are left untouched.
pub fn apply_opacity(components: &mut Vec<u8>, opacity: u8) {
    match components.len() {
        3 => components.push(opacity),
        4 => components[3] = opacity,
        _ => {}
    }
}

fn resolve_color(value: Option<&StyleValue<Vec<u8>>>, id: FeatureId, opacity: Option<u8>) -> Color {
    let Some(value) = value else {
        return Color::TRANSPARENT;
    };
    let mut components = value.resolve(id);
    // Zero opacity counts as undeclared
    if let Some(opacity) = opacity.filter(|&o| o != 0) {
        apply_opacity(&mut components, opacity);
    }
    Color::from_components(&components).unwrap_or(Color::TRANSPARENT)
}

/// Resolve every style property of `props` for feature `id`.
pub fn resolve_feature(props: &DatasetProperties, id: FeatureId) -> FeatureStyle {
    let width = props.stroke_width.as_ref().map_or(1.0, |w| w.resolve(id));
    let fill = resolve_color(props.fill.as_ref(), id, props.opacity);

    // Offsets are stored relative to the stroke width they are drawn with.
    let offset = props.offset.as_ref().map(|o| {
        let divisor = if width == 0.0 { 1.0 } else { width };
        o.resolve(id) / divisor
    });

    FeatureStyle {
        fill,
        stroke: resolve_color(props.stroke.as_ref(), id, props.opacity),
        radius: props.radius.as_ref().map_or(1.0, |r| r.resolve(id)),
        width,
        offset,
        outline: props.outline.as_ref().map(|o| o.resolve(id)),
        text: props.label.then(|| id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity_written_to_index_three() {
        let mut rgb = vec![10, 20, 30];
        apply_opacity(&mut rgb, 127);
        assert_eq!(rgb, vec![10, 20, 30, 127]);

        let mut rgba = vec![10, 20, 30, 255];
        apply_opacity(&mut rgba, 50);
        assert_eq!(rgba, vec![10, 20, 30, 50]);

        let mut odd = vec![1, 2];
        apply_opacity(&mut odd, 50);
        assert_eq!(odd, vec![1, 2]);
    }

    #[test]
    fn test_opacity_only_applied_when_declared() {
        let mut props = DatasetProperties::new("spines");
        props.fill = Some(StyleValue::Constant(vec![255, 0, 0]));
        assert_eq!(resolve_feature(&props, 1).fill, Color::rgb(255, 0, 0));

        props.opacity = Some(100);
        assert_eq!(resolve_feature(&props, 1).fill, Color::rgba(255, 0, 0, 100));
    }

    #[test]
    fn test_zero_opacity_leaves_color_alone() {
        let mut props = DatasetProperties::new("spines");
        props.fill = Some(StyleValue::Constant(vec![255, 0, 0, 200]));
        props.opacity = Some(0);
        assert_eq!(resolve_feature(&props, 1).fill, Color::rgba(255, 0, 0, 200));
    }

    #[test]
    fn test_offset_divided_by_stroke_width_in_both_forms() {
        let mut props = DatasetProperties::new("radius");
        props.offset = Some(StyleValue::Constant(6.0));
        props.stroke_width = Some(StyleValue::Constant(2.0));
        assert_eq!(resolve_feature(&props, 4).offset, Some(3.0));

        props.stroke_width = Some(StyleValue::accessor(|id| id as f32));
        assert_eq!(resolve_feature(&props, 4).offset, Some(1.5));

        props.offset = Some(StyleValue::accessor(|id| id as f32 * 4.0));
        assert_eq!(resolve_feature(&props, 4).offset, Some(4.0));
    }

    #[test]
    fn test_missing_properties_fall_back() {
        let props = DatasetProperties::new("bare");
        let style = resolve_feature(&props, 1);
        assert_eq!(style.fill, Color::TRANSPARENT);
        assert_eq!(style.stroke, Color::TRANSPARENT);
        assert_eq!(style.radius, 1.0);
        assert_eq!(style.width, 1.0);
        assert_eq!(style.text, None);
    }

    #[test]
    fn test_label_layers_draw_ids_as_text() {
        let mut props = DatasetProperties::new("labels");
        props.label = true;
        assert_eq!(resolve_feature(&props, 42).text.as_deref(), Some("42"));
        assert_eq!(LayerStyle::for_properties(&props).point_kind, PointKind::Text);
    }

    #[test]
    fn test_layer_units() {
        let mut props = DatasetProperties::new("segments");
        let style = LayerStyle::for_properties(&props);
        assert_eq!(style.line_width_units, WidthUnits::Pixels);
        assert_eq!(style.line_width_scale, 2.0);
        assert_eq!(style.radius_max_pixels, 7.0);

        props.fixed = true;
        let style = LayerStyle::for_properties(&props);
        assert_eq!(style.line_width_units, WidthUnits::Image);
        assert_eq!(style.radius_units, WidthUnits::Image);
        assert_eq!(style.radius_max_pixels, 2.0);

        props.fixed = false;
        props.outline = Some(StyleValue::Constant(1.0));
        let style = LayerStyle::for_properties(&props);
        assert_eq!(style.decoration, LineDecoration::Outline);
        assert_eq!(style.line_width_min_pixels, 0.0);
    }
}
