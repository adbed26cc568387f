use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tracing::{debug, trace};

use crate::core::config::CacheConfig;
use crate::core::error::StorageError;
use crate::core::types::{MediaId, MediaObject, NewMediaObject};
use crate::observability::metrics as obs;

use super::MediaStore;

// ---------------------------------------------------------------------------
// LRU read-through cache
// ---------------------------------------------------------------------------

struct CacheState {
    lru: LruCache<MediaId, MediaObject>,
    current_size: u64,
}

/// Size-bounded LRU read-through cache in front of another `MediaStore`.
///
/// Objects are immutable once created, so entries never need invalidation;
/// they only leave the cache through LRU eviction.
/// - Bounded by `max_size_bytes`
/// - Objects larger than half the budget are never cached
/// - Only found objects are cached; misses always go to the inner store
pub struct CachedMediaStore<S> {
    inner: S,
    state: Mutex<CacheState>,
    config: CacheConfig,
}

impl<S: MediaStore> CachedMediaStore<S> {
    pub fn new(inner: S, config: &CacheConfig) -> Self {
        // Use a large capacity for the LRU; actual bounding is by size
        let cap = NonZeroUsize::new(100_000).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            state: Mutex::new(CacheState {
                lru: LruCache::new(cap),
                current_size: 0,
            }),
            config: config.clone(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn lookup(&self, id: MediaId) -> Option<MediaObject> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.lru.get(&id).cloned()
    }

    fn insert(&self, object: &MediaObject) {
        if !self.config.enabled {
            return;
        }

        let entry_size = object
            .payload
            .inline_bytes()
            .map(|b| b.len() as u64)
            .unwrap_or(0);

        if entry_size > self.config.max_size_bytes / 2 {
            trace!(id = %object.id, entry_size, "object too large to cache");
            return;
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(old) = state.lru.pop(&object.id) {
            state.current_size = state.current_size.saturating_sub(cached_size(&old));
        }

        // Evict until we have room
        while state.current_size + entry_size > self.config.max_size_bytes {
            match state.lru.pop_lru() {
                Some((_, evicted)) => {
                    state.current_size = state.current_size.saturating_sub(cached_size(&evicted));
                }
                None => break,
            }
        }

        state.lru.put(object.id, object.clone());
        state.current_size += entry_size;

        obs::set_cache_size_bytes(state.current_size as f64);
        obs::set_cache_entries(state.lru.len() as f64);

        debug!(id = %object.id, size = entry_size, "cached object");
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.lru.clear();
        state.current_size = 0;
        obs::set_cache_size_bytes(0.0);
        obs::set_cache_entries(0.0);
    }

    pub fn entry_count(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).lru.len()
    }

    pub fn current_size_bytes(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current_size
    }
}

fn cached_size(object: &MediaObject) -> u64 {
    object
        .payload
        .inline_bytes()
        .map(|b| b.len() as u64)
        .unwrap_or(0)
}

impl<S: MediaStore> MediaStore for CachedMediaStore<S> {
    async fn get_by_id(&self, id: MediaId) -> Result<Option<MediaObject>, StorageError> {
        if let Some(hit) = self.lookup(id) {
            obs::inc_cache_hit();
            trace!(%id, "cache hit");
            return Ok(Some(hit));
        }

        obs::inc_cache_miss();
        let fetched = self.inner.get_by_id(id).await?;
        if let Some(object) = &fetched {
            self.insert(object);
        }
        Ok(fetched)
    }

    async fn create(&self, object: NewMediaObject) -> Result<MediaObject, StorageError> {
        self.inner.create(object).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::*;
    use crate::core::types::{MediaPayload, UploadCategory};
    use crate::storage::memory::InMemoryMediaStore;

    /// Counts lookups that reach the wrapped store.
    struct CountingStore {
        inner: InMemoryMediaStore,
        gets: AtomicUsize,
    }

    impl MediaStore for CountingStore {
        async fn get_by_id(&self, id: MediaId) -> Result<Option<MediaObject>, StorageError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_id(id).await
        }

        async fn create(&self, object: NewMediaObject) -> Result<MediaObject, StorageError> {
            self.inner.create(object).await
        }
    }

    fn counting() -> CountingStore {
        CountingStore {
            inner: InMemoryMediaStore::new(),
            gets: AtomicUsize::new(0),
        }
    }

    fn sized(len: usize) -> NewMediaObject {
        NewMediaObject {
            payload: MediaPayload::Inline(Bytes::from(vec![0u8; len])),
            mime_type: "video/mp4".to_string(),
            size_bytes: len as u64,
            category: UploadCategory::Video,
            file_name: None,
        }
    }

    fn config(max_size_bytes: u64) -> CacheConfig {
        CacheConfig {
            enabled: true,
            max_size_bytes,
        }
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let cache = CachedMediaStore::new(counting(), &config(10_000));
        let created = cache.create(sized(100)).await.unwrap();

        cache.get_by_id(created.id).await.unwrap().unwrap();
        cache.get_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(cache.inner().gets.load(Ordering::SeqCst), 1);
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.current_size_bytes(), 100);
    }

    #[tokio::test]
    async fn test_misses_are_not_cached() {
        let cache = CachedMediaStore::new(counting(), &config(10_000));
        let id = MediaId::new();

        assert!(cache.get_by_id(id).await.unwrap().is_none());
        assert!(cache.get_by_id(id).await.unwrap().is_none());
        assert_eq!(cache.inner().gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_oversized_objects_bypass_cache() {
        let cache = CachedMediaStore::new(counting(), &config(1_000));
        let created = cache.create(sized(600)).await.unwrap();

        cache.get_by_id(created.id).await.unwrap();
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_eviction_on_size_limit() {
        let cache = CachedMediaStore::new(counting(), &config(500));
        let a = cache.create(sized(200)).await.unwrap();
        let b = cache.create(sized(200)).await.unwrap();
        let c = cache.create(sized(200)).await.unwrap();

        cache.get_by_id(a.id).await.unwrap();
        cache.get_by_id(b.id).await.unwrap();
        assert_eq!(cache.current_size_bytes(), 400);

        // Adding 200 more would exceed 500, so the LRU entry ("a") goes.
        cache.get_by_id(c.id).await.unwrap();
        assert!(cache.current_size_bytes() <= 500);
        assert_eq!(cache.entry_count(), 2);

        let before = cache.inner().gets.load(Ordering::SeqCst);
        cache.get_by_id(a.id).await.unwrap();
        assert_eq!(cache.inner().gets.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_disabled_cache() {
        let cache = CachedMediaStore::new(
            counting(),
            &CacheConfig {
                enabled: false,
                max_size_bytes: 10_000,
            },
        );
        let created = cache.create(sized(10)).await.unwrap();

        cache.get_by_id(created.id).await.unwrap();
        cache.get_by_id(created.id).await.unwrap();
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.inner().gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = CachedMediaStore::new(counting(), &config(10_000));
        let created = cache.create(sized(10)).await.unwrap();
        cache.get_by_id(created.id).await.unwrap();

        cache.clear();
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.current_size_bytes(), 0);
    }
}
