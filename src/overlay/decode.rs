//! Typed-array decoding of raw feature buffers into primitive batches.

use wmm_ui::{PrimitiveBatch, PrimitiveKind};

use super::dataset::RawFeatures;
use crate::error::DecodeError;

fn cast<T: bytemuck::AnyBitPattern + bytemuck::NoUninit>(
    buffer: &'static str,
    bytes: &[u8],
) -> Result<Vec<T>, DecodeError> {
    let element = std::mem::size_of::<T>();
    if bytes.len() % element != 0 {
        return Err(DecodeError::Misaligned {
            buffer,
            len: bytes.len(),
            element,
        });
    }
    // Copying sidesteps the alignment of the source buffer.
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Decode one geometry family, validating every index it carries.
pub fn decode_features(kind: PrimitiveKind, raw: &RawFeatures) -> Result<PrimitiveBatch, DecodeError> {
    let positions: Vec<[f32; 2]> = cast("positions", &raw.positions)?;
    let feature_index: Vec<u32> = cast("feature index", &raw.feature_index)?;
    let start_indices: Vec<u32> = match kind {
        PrimitiveKind::Points => Vec::new(),
        PrimitiveKind::Lines | PrimitiveKind::Polygons => {
            cast("start indices", &raw.start_indices)?
        }
    };

    if positions.len() != feature_index.len() {
        return Err(DecodeError::VertexCountMismatch {
            positions: positions.len(),
            indices: feature_index.len(),
        });
    }

    if let Some(&index) = feature_index.iter().find(|&&i| i as usize >= raw.ids.len()) {
        return Err(DecodeError::FeatureOutOfRange {
            index,
            count: raw.ids.len(),
        });
    }

    let mut previous = None;
    for &start in &start_indices {
        let ordered = previous.is_none_or(|p| start > p);
        if !ordered || start as usize >= positions.len() {
            return Err(DecodeError::InvalidStartIndex {
                index: start,
                vertices: positions.len(),
            });
        }
        previous = Some(start);
    }

    Ok(PrimitiveBatch {
        kind,
        positions,
        feature_index,
        start_indices,
        ids: raw.ids.clone(),
    })
}

/// Pack a geometry family into the byte layout [`decode_features`] reads.
pub fn encode_features(
    positions: &[[f32; 2]],
    feature_index: &[u32],
    start_indices: &[u32],
    ids: &[u64],
) -> RawFeatures {
    RawFeatures {
        positions: bytemuck::cast_slice(positions).to_vec(),
        feature_index: bytemuck::cast_slice(feature_index).to_vec(),
        start_indices: bytemuck::cast_slice(start_indices).to_vec(),
        ids: ids.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lines() {
        let raw = encode_features(
            &[[0.0, 0.0], [1.0, 1.0], [5.0, 5.0], [6.0, 5.0]],
            &[0, 0, 1, 1],
            &[0, 2],
            &[10, 20],
        );
        let batch = decode_features(PrimitiveKind::Lines, &raw).unwrap();
        assert_eq!(batch.primitive_count(), 2);
        assert_eq!(batch.primitive(1), &[[5.0, 5.0], [6.0, 5.0]]);
        assert_eq!(batch.primitive_feature(1).and_then(|f| batch.feature_id(f)), Some(20));
    }

    #[test]
    fn test_decode_points_ignores_start_indices() {
        let mut raw = encode_features(&[[3.0, 4.0]], &[0], &[], &[99]);
        raw.start_indices = vec![1, 2, 3];
        let batch = decode_features(PrimitiveKind::Points, &raw).unwrap();
        assert_eq!(batch.primitive_count(), 1);
        assert_eq!(batch.feature_id(0), Some(99));
    }

    #[test]
    fn test_truncated_positions_are_rejected() {
        let mut raw = encode_features(&[[3.0, 4.0]], &[0], &[], &[1]);
        raw.positions.pop();
        assert!(matches!(
            decode_features(PrimitiveKind::Points, &raw),
            Err(DecodeError::Misaligned { buffer: "positions", .. })
        ));
    }

    #[test]
    fn test_feature_index_out_of_range() {
        let raw = encode_features(&[[0.0, 0.0]], &[3], &[], &[1]);
        assert_eq!(
            decode_features(PrimitiveKind::Points, &raw),
            Err(DecodeError::FeatureOutOfRange { index: 3, count: 1 })
        );
    }

    #[test]
    fn test_unordered_start_indices() {
        let raw = encode_features(&[[0.0, 0.0], [1.0, 0.0]], &[0, 0], &[1, 0], &[1]);
        assert!(matches!(
            decode_features(PrimitiveKind::Lines, &raw),
            Err(DecodeError::InvalidStartIndex { .. })
        ));
    }

    #[test]
    fn test_mismatched_vertex_counts() {
        let raw = encode_features(&[[0.0, 0.0], [1.0, 0.0]], &[0], &[], &[1]);
        assert_eq!(
            decode_features(PrimitiveKind::Points, &raw),
            Err(DecodeError::VertexCountMismatch { positions: 2, indices: 1 })
        );
    }
}
