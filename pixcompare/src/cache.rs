//! Bounded cache of resampled rasters.
//!
//! Entries are keyed by source identity and target size. Eviction is by
//! insertion order: a lookup hit does not make an entry younger.

use std::collections::{HashMap, VecDeque};

use crate::consts::CACHE_CAPACITY;
use crate::raster::{RasterImage, SourceId};

/// Cache key: which source, resampled to which size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Identity of the raster the entry was resampled from.
    pub source: SourceId,
    /// Target width.
    pub width: usize,
    /// Target height.
    pub height: usize,
}

impl CacheKey {
    /// Key for `source` resampled to `width` x `height`.
    #[must_use]
    pub fn new(source: SourceId, width: usize, height: usize) -> Self {
        Self {
            source,
            width,
            height,
        }
    }
}

/// Memoizes resampled rasters, keeping at most `capacity` entries.
///
/// Not synchronized. A session owns one; wrap it in a mutex to share it.
#[derive(Debug)]
pub struct ScaledImageCache {
    entries: HashMap<CacheKey, RasterImage>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl Default for ScaledImageCache {
    fn default() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }
}

impl ScaledImageCache {
    /// Creates a cache holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Returns the cached raster for `(source, width, height)`, running
    /// `producer` and storing its result on a miss.
    pub fn get_or_create<F>(
        &mut self,
        source: &SourceId,
        width: usize,
        height: usize,
        producer: F,
    ) -> RasterImage
    where
        F: FnOnce() -> RasterImage,
    {
        match self.try_get_or_create(source, width, height, || {
            Ok::<_, std::convert::Infallible>(producer())
        }) {
            Ok(image) => image,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_create`](Self::get_or_create) for a fallible producer.
    /// Nothing is stored when the producer fails.
    ///
    /// # Errors
    /// Propagates the producer's error.
    pub fn try_get_or_create<F, E>(
        &mut self,
        source: &SourceId,
        width: usize,
        height: usize,
        producer: F,
    ) -> Result<RasterImage, E>
    where
        F: FnOnce() -> Result<RasterImage, E>,
    {
        let key = CacheKey::new(source.clone(), width, height);
        if let Some(hit) = self.entries.get(&key) {
            log::trace!("scaled cache hit: {source} at {width}x{height}");
            return Ok(hit.clone());
        }

        let image = producer()?;
        self.insert(key, image.clone());
        Ok(image)
    }

    /// Cached raster for a key, if present. Does not affect eviction order.
    #[must_use]
    pub fn get(&self, source: &SourceId, width: usize, height: usize) -> Option<&RasterImage> {
        self.entries
            .get(&CacheKey::new(source.clone(), width, height))
    }

    /// Whether a key is cached.
    #[must_use]
    pub fn contains(&self, source: &SourceId, width: usize, height: usize) -> bool {
        self.get(source, width, height).is_some()
    }

    /// Keys in insertion order, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.order.iter()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries kept before the oldest is evicted.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn insert(&mut self, key: CacheKey, image: RasterImage) {
        if self.entries.insert(key.clone(), image).is_none() {
            self.order.push_back(key);
        }
        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                log::debug!(
                    "scaled cache full ({}), evicting {} at {}x{}",
                    self.capacity,
                    oldest.source,
                    oldest.width,
                    oldest.height
                );
                self.entries.remove(&oldest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn raster(id: u64, w: usize, h: usize) -> RasterImage {
        RasterImage::filled(SourceId::opaque(id), w, h, RGBA8::default()).unwrap()
    }

    #[test]
    fn test_hit_skips_producer() {
        let mut cache = ScaledImageCache::default();
        let source = SourceId::file("a.png", 10);
        let first = cache.get_or_create(&source, 4, 4, || raster(1, 4, 4));
        let second = cache.get_or_create(&source, 4, 4, || panic!("producer ran on a hit"));
        assert!(first.shares_pixels(&second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_includes_dimensions() {
        let mut cache = ScaledImageCache::default();
        let source = SourceId::opaque(1);
        cache.get_or_create(&source, 4, 4, || raster(1, 4, 4));
        cache.get_or_create(&source, 2, 2, || raster(1, 2, 2));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&source, 4, 4));
        assert!(cache.contains(&source, 2, 2));
        assert!(!cache.contains(&SourceId::opaque(2), 4, 4));
    }

    #[test]
    fn test_insertion_order_eviction() {
        let mut cache = ScaledImageCache::with_capacity(3);
        for id in 0..3 {
            cache.get_or_create(&SourceId::opaque(id), 1, 1, || raster(id, 1, 1));
        }
        // A hit on the oldest entry does not protect it.
        cache.get_or_create(&SourceId::opaque(0), 1, 1, || panic!("should hit"));
        cache.get_or_create(&SourceId::opaque(3), 1, 1, || raster(3, 1, 1));

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&SourceId::opaque(0), 1, 1));
        let ids: Vec<_> = cache.keys().map(|k| k.source.clone()).collect();
        assert_eq!(
            ids,
            vec![SourceId::opaque(1), SourceId::opaque(2), SourceId::opaque(3)]
        );
    }

    #[test]
    fn test_failed_producer_stores_nothing() {
        let mut cache = ScaledImageCache::default();
        let result: Result<RasterImage, &str> =
            cache.try_get_or_create(&SourceId::opaque(1), 2, 2, || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cache = ScaledImageCache::default();
        cache.get_or_create(&SourceId::opaque(1), 1, 1, || raster(1, 1, 1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.keys().count(), 0);
        assert_eq!(cache.capacity(), CACHE_CAPACITY);
    }
}
