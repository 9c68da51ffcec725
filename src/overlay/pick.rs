//! CPU picking of overlay features under a pointer.

use wmm_ui::PrimitiveKind;

use super::builder::LayerSet;
use super::style::WidthUnits;
use crate::model::{FeatureId, Target};

/// A feature found under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    /// Index of the layer within its set
    pub layer: usize,
    pub feature: FeatureId,
}

fn distance_sq(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn segment_distance_sq(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let len_sq = distance_sq(a, b);
    if len_sq == 0.0 {
        return distance_sq(p, a);
    }
    let t = (((p[0] - a[0]) * (b[0] - a[0]) + (p[1] - a[1]) * (b[1] - a[1])) / len_sq).clamp(0.0, 1.0);
    distance_sq(p, [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])])
}

fn polygon_contains(vertices: &[[f32; 2]], p: [f64; 2]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    // Ray casting
    let (x, y) = (p[0], p[1]);
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (f64::from(vertices[i][0]), f64::from(vertices[i][1]));
        let (xj, yj) = (f64::from(vertices[j][0]), f64::from(vertices[j][1]));
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn widen(v: [f32; 2]) -> [f64; 2] {
    [f64::from(v[0]), f64::from(v[1])]
}

/// Topmost pickable feature at `world`.
///
/// `scale` is screen pixels per image pixel; `tolerance_px` is the minimum
/// hit distance in screen pixels.
pub fn pick(layers: &LayerSet, world: Target, scale: f64, tolerance_px: f64) -> Option<Pick> {
    let p = [world.x, world.y];
    let tolerance = tolerance_px / scale;

    for (layer_index, layer) in layers.layers().iter().enumerate().rev() {
        if !layer.pickable {
            continue;
        }
        for (batch_index, batch) in layer.batches.iter().enumerate().rev() {
            for primitive in (0..batch.primitive_count()).rev() {
                let Some(feature) = batch.primitive_feature(primitive) else {
                    continue;
                };
                let vertices = batch.primitive(primitive);
                let hit = match batch.kind {
                    PrimitiveKind::Points => {
                        let radius_px = layer.feature_style(batch_index, feature).map_or(0.0, |s| {
                            let r = f64::from(s.radius * layer.style.radius_scale);
                            match layer.style.radius_units {
                                WidthUnits::Pixels => r,
                                WidthUnits::Image => r * scale,
                            }
                            .clamp(0.0, f64::from(layer.style.radius_max_pixels))
                        });
                        let reach = tolerance.max(radius_px / scale);
                        vertices
                            .first()
                            .is_some_and(|&v| distance_sq(widen(v), p) <= reach * reach)
                    }
                    PrimitiveKind::Lines => vertices
                        .windows(2)
                        .any(|w| segment_distance_sq(p, widen(w[0]), widen(w[1])) <= tolerance * tolerance),
                    PrimitiveKind::Polygons => polygon_contains(vertices, p),
                };
                if hit {
                    if let Some(id) = batch.feature_id(feature) {
                        return Some(Pick {
                            layer: layer_index,
                            feature: id,
                        });
                    }
                }
            }
        }
    }
    None
}
