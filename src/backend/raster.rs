//! Raster slice loading and caching.
//!
//! Slices are max-projections of one channel over a z-range. Loaded slices
//! are kept in an LRU cache bounded by a byte budget; a hidden channel or an
//! empty z-range resolves to one shared empty tile without touching the
//! backend.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use super::ImageHandle;
use crate::error::{BackendError, RasterError};
use crate::model::{ViewId, ZRange};

/// Cooperative cancellation flag shared between a fetch and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// One channel's pixels for a z-range, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSlice {
    pub width: u32,
    pub height: u32,
    pub data: Rc<[u16]>,
}

impl RasterSlice {
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Self {
        Self {
            width,
            height,
            data: Rc::from(data),
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Cache key of one slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SliceKey {
    pub view: ViewId,
    pub time_point: u32,
    pub channel: u32,
    pub z: ZRange,
}

#[derive(Default)]
struct CacheEntries {
    slices: HashMap<SliceKey, RasterSlice>,
    /// Least recently used first
    order: VecDeque<SliceKey>,
    bytes: usize,
}

impl CacheEntries {
    fn touch(&mut self, key: &SliceKey) -> Option<RasterSlice> {
        let slice = self.slices.get(key)?.clone();
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
        Some(slice)
    }

    fn remove(&mut self, key: &SliceKey) {
        if let Some(old) = self.slices.remove(key) {
            self.bytes -= old.byte_len();
            self.order.retain(|k| k != key);
        }
    }
}

/// LRU cache of raster slices with a byte budget.
pub struct RasterCache {
    capacity: usize,
    entries: RefCell<CacheEntries>,
    empty: RasterSlice,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl RasterCache {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity: capacity_bytes,
            entries: RefCell::new(CacheEntries::default()),
            empty: RasterSlice::empty(),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently held.
    pub fn bytes(&self) -> usize {
        self.entries.borrow().bytes
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &SliceKey) -> bool {
        self.entries.borrow().slices.contains_key(key)
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    /// The shared tile returned for hidden channels and empty ranges.
    pub fn empty_tile(&self) -> RasterSlice {
        self.empty.clone()
    }

    /// Slice for `key`, from cache or from `image`.
    ///
    /// Rejects with [`RasterError::Cancelled`] when `cancel` fires before
    /// the slice arrives; a cancelled slice is never cached.
    pub async fn load(
        &self,
        key: SliceKey,
        channel_visible: bool,
        image: &ImageHandle,
        cancel: &CancelToken,
    ) -> Result<RasterSlice, RasterError> {
        if !channel_visible || key.z.is_empty() {
            return Ok(self.empty_tile());
        }
        if cancel.is_cancelled() {
            return Err(RasterError::Cancelled);
        }
        if let Some(hit) = self.entries.borrow_mut().touch(&key) {
            self.hits.set(self.hits.get() + 1);
            log::trace!("🗃️ raster hit {:?}", key);
            return Ok(hit);
        }
        self.misses.set(self.misses.get() + 1);

        let result = image.fetch_slice(key.channel, key.z, cancel).await;
        if cancel.is_cancelled() {
            log::debug!("🚫 raster fetch for {} cancelled", key.view);
            return Err(RasterError::Cancelled);
        }
        let slice = match result {
            Ok(slice) => slice,
            Err(BackendError::Cancelled) => return Err(RasterError::Cancelled),
            Err(err) => return Err(err.into()),
        };

        let shape = image.image_shape();
        let expected = shape.width as usize * shape.height as usize;
        if slice.data.len() != expected {
            log::warn!(
                "⚠️ slice for {} has {} pixels, expected {}",
                key.view,
                slice.data.len(),
                expected
            );
            return Err(RasterError::SizeMismatch {
                expected,
                actual: slice.data.len(),
            });
        }

        self.insert(key, slice.clone());
        Ok(slice)
    }

    fn insert(&self, key: SliceKey, slice: RasterSlice) {
        let size = slice.byte_len();
        if size > self.capacity {
            log::debug!("🗃️ slice of {} bytes exceeds cache budget", size);
            return;
        }

        let mut entries = self.entries.borrow_mut();
        entries.remove(&key);
        while entries.bytes + size > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            if let Some(evicted) = entries.slices.remove(&oldest) {
                entries.bytes -= evicted.byte_len();
                log::trace!("🗃️ evicted {:?}", oldest);
            }
        }
        entries.bytes += size;
        entries.order.push_back(key.clone());
        entries.slices.insert(key, slice);
    }

    /// Drop every slice of a view.
    pub fn evict_view(&self, view: &ViewId) {
        let mut entries = self.entries.borrow_mut();
        let keys: Vec<SliceKey> = entries
            .slices
            .keys()
            .filter(|k| &k.view == view)
            .cloned()
            .collect();
        for key in &keys {
            entries.remove(key);
        }
    }

    pub fn clear(&self) {
        *self.entries.borrow_mut() = CacheEntries::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::model::ImageShape;

    fn image() -> ImageHandle {
        ImageHandle::from_backend(MemoryBackend::new(ImageShape::new(4, 4, 5, 2), 0))
    }

    fn key(channel: u32, z: ZRange) -> SliceKey {
        SliceKey {
            view: "v1".into(),
            time_point: 0,
            channel,
            z,
        }
    }

    // 4x4 u16
    const SLICE_BYTES: usize = 32;

    #[test]
    fn test_second_load_is_a_hit() {
        let cache = RasterCache::new(1024);
        let image = image();
        let cancel = CancelToken::new();

        let first = pollster::block_on(cache.load(key(0, ZRange::new(0, 2)), true, &image, &cancel)).unwrap();
        let second = pollster::block_on(cache.load(key(0, ZRange::new(0, 2)), true, &image, &cancel)).unwrap();
        assert!(Rc::ptr_eq(&first.data, &second.data));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.bytes(), SLICE_BYTES);
    }

    #[test]
    fn test_hidden_channel_gets_shared_empty_tile() {
        let cache = RasterCache::new(1024);
        let image = image();
        let cancel = CancelToken::new();
        let a = pollster::block_on(cache.load(key(0, ZRange::new(0, 2)), false, &image, &cancel)).unwrap();
        let b = pollster::block_on(cache.load(key(1, ZRange::new(3, 3)), true, &image, &cancel)).unwrap();
        assert!(a.is_empty());
        assert!(Rc::ptr_eq(&a.data, &b.data));
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn test_cancelled_fetch_rejects_and_is_not_cached() {
        let cache = RasterCache::new(1024);
        let image = image();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = pollster::block_on(cache.load(key(0, ZRange::new(0, 1)), true, &image, &cancel));
        assert_eq!(result, Err(RasterError::Cancelled));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = RasterCache::new(2 * SLICE_BYTES);
        let image = image();
        let cancel = CancelToken::new();
        let load = |z: i64| {
            pollster::block_on(cache.load(key(0, ZRange::single(z)), true, &image, &cancel)).unwrap()
        };

        load(0);
        load(1);
        load(0);
        load(2);
        assert!(cache.contains(&key(0, ZRange::single(0))));
        assert!(!cache.contains(&key(0, ZRange::single(1))));
        assert!(cache.contains(&key(0, ZRange::single(2))));
        assert_eq!(cache.bytes(), 2 * SLICE_BYTES);
    }

    #[test]
    fn test_backend_failure_surfaces() {
        let cache = RasterCache::new(1024);
        let image = image();
        let result = pollster::block_on(cache.load(key(9, ZRange::new(0, 1)), true, &image, &CancelToken::new()));
        assert!(matches!(result, Err(RasterError::Backend(_))));
    }

    #[test]
    fn test_evict_view_only_touches_that_view() {
        let cache = RasterCache::new(1024);
        let image = image();
        let cancel = CancelToken::new();
        let mut other = key(0, ZRange::new(0, 1));
        other.view = "v2".into();
        pollster::block_on(cache.load(key(0, ZRange::new(0, 1)), true, &image, &cancel)).unwrap();
        pollster::block_on(cache.load(other.clone(), true, &image, &cancel)).unwrap();

        cache.evict_view(&"v1".into());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&other));
    }

    #[test]
    fn test_max_projection_pixels() {
        let slice = RasterSlice::new(2, 1, vec![3, 9]);
        assert_eq!(slice.pixel(1, 0), Some(9));
        assert_eq!(slice.pixel(2, 0), None);
        assert_eq!(slice.byte_len(), 4);
    }
}
