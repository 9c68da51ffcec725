/// Half-open range of z slices `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZRange {
    pub low: i64,
    pub high: i64,
}

impl ZRange {
    pub fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    /// A window of exactly one slice.
    pub fn single(z: i64) -> Self {
        Self::new(z, z + 1)
    }

    /// Number of slices covered. Zero or negative means no slices.
    pub fn len(&self) -> i64 {
        self.high - self.low
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }

    /// Midpoint truncated toward zero; the z used for edits in this window.
    pub fn mid(&self) -> i64 {
        (self.low + self.high) / 2
    }

    pub fn contains(&self, z: i64) -> bool {
        z >= self.low && z < self.high
    }

    /// Move both ends independently.
    pub fn shifted(&self, delta_low: i64, delta_high: i64) -> Self {
        Self::new(self.low + delta_low, self.high + delta_high)
    }
}

impl Default for ZRange {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_truncates() {
        assert_eq!(ZRange::new(35, 36).mid(), 35);
        assert_eq!(ZRange::new(10, 15).mid(), 12);
        assert_eq!(ZRange::new(-3, 0).mid(), -1);
    }

    #[test]
    fn test_contains_is_half_open() {
        let z = ZRange::new(4, 6);
        assert!(z.contains(4));
        assert!(z.contains(5));
        assert!(!z.contains(6));
        assert_eq!(z.len(), 2);
        assert!(ZRange::new(3, 3).is_empty());
    }
}
