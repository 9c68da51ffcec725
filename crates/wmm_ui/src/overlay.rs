//! Overlay primitive batches.
//!
//! A batch is the decoded, render-ready form of one geometry family of an
//! annotation dataset: packed positions, a per-vertex feature index and the
//! correlation id of every feature. Batches know nothing about annotations.

/// Geometry family of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Points,
    Lines,
    Polygons,
}

/// One geometry family, laid out the way the renderer consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveBatch {
    /// Geometry family
    pub kind: PrimitiveKind,
    /// Packed (x, y) positions in image space
    pub positions: Vec<[f32; 2]>,
    /// Feature index of every vertex
    pub feature_index: Vec<u32>,
    /// Start vertex of every path/polygon; empty for points
    pub start_indices: Vec<u32>,
    /// Correlation id of every feature, indexed by feature index
    pub ids: Vec<u64>,
}

impl PrimitiveBatch {
    /// Create an empty batch of the given family.
    pub fn empty(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            positions: Vec::new(),
            feature_index: Vec::new(),
            start_indices: Vec::new(),
            ids: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of primitives: points, paths or polygons.
    pub fn primitive_count(&self) -> usize {
        match self.kind {
            PrimitiveKind::Points => self.positions.len(),
            PrimitiveKind::Lines | PrimitiveKind::Polygons => self.start_indices.len(),
        }
    }

    /// Vertices of primitive `index`.
    pub fn primitive(&self, index: usize) -> &[[f32; 2]] {
        match self.kind {
            PrimitiveKind::Points => self
                .positions
                .get(index..index + 1)
                .unwrap_or_default(),
            PrimitiveKind::Lines | PrimitiveKind::Polygons => {
                let Some(&start) = self.start_indices.get(index) else {
                    return &[];
                };
                let end = self
                    .start_indices
                    .get(index + 1)
                    .map_or(self.positions.len(), |&e| e as usize);
                self.positions.get(start as usize..end).unwrap_or_default()
            }
        }
    }

    /// Feature index owning primitive `index`.
    pub fn primitive_feature(&self, index: usize) -> Option<u32> {
        let vertex = match self.kind {
            PrimitiveKind::Points => index,
            PrimitiveKind::Lines | PrimitiveKind::Polygons => *self.start_indices.get(index)? as usize,
        };
        self.feature_index.get(vertex).copied()
    }

    /// Correlation id of a feature.
    pub fn feature_id(&self, feature: u32) -> Option<u64> {
        self.ids.get(feature as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_paths() -> PrimitiveBatch {
        PrimitiveBatch {
            kind: PrimitiveKind::Lines,
            positions: vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [5.0, 5.0], [6.0, 6.0]],
            feature_index: vec![0, 0, 0, 1, 1],
            start_indices: vec![0, 3],
            ids: vec![40, 41],
        }
    }

    #[test]
    fn test_paths_are_split_by_start_indices() {
        let batch = two_paths();
        assert_eq!(batch.primitive_count(), 2);
        assert_eq!(batch.primitive(0).len(), 3);
        assert_eq!(batch.primitive(1), &[[5.0, 5.0], [6.0, 6.0]]);
        assert!(batch.primitive(2).is_empty());
    }

    #[test]
    fn test_primitive_feature_resolves_correlation_id() {
        let batch = two_paths();
        let feature = batch.primitive_feature(1).unwrap();
        assert_eq!(batch.feature_id(feature), Some(41));
    }

    #[test]
    fn test_points_are_one_vertex_each() {
        let batch = PrimitiveBatch {
            kind: PrimitiveKind::Points,
            positions: vec![[1.0, 2.0], [3.0, 4.0]],
            feature_index: vec![0, 1],
            start_indices: Vec::new(),
            ids: vec![7, 8],
        };
        assert_eq!(batch.primitive_count(), 2);
        assert_eq!(batch.primitive(1), &[[3.0, 4.0]]);
        assert_eq!(batch.feature_id(batch.primitive_feature(0).unwrap()), Some(7));
    }
}
