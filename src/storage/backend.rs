use tracing::info;

use crate::core::config::{CacheConfig, StorageConfig};
use crate::core::error::{ConfigError, StorageError};
use crate::core::types::{MediaId, MediaObject, NewMediaObject};

use super::cache::CachedMediaStore;
use super::fs::FsMediaStore;
use super::memory::InMemoryMediaStore;
use super::MediaStore;

/// The storage handle the server runs with, chosen from configuration.
///
/// Constructed once in `main`, shared through `AppState`, and closed during
/// shutdown.
pub enum StoreBackend {
    Memory(InMemoryMediaStore),
    Filesystem(CachedMediaStore<FsMediaStore>),
}

impl StoreBackend {
    /// Build the backend named by `storage.backend`.
    pub async fn from_config(
        storage: &StorageConfig,
        cache: &CacheConfig,
    ) -> anyhow::Result<Self> {
        let backend = match storage.backend.as_str() {
            "memory" => StoreBackend::Memory(InMemoryMediaStore::new()),
            "filesystem" => {
                let fs = FsMediaStore::open(&storage.root).await?;
                StoreBackend::Filesystem(CachedMediaStore::new(fs, cache))
            }
            other => {
                return Err(ConfigError::UnknownBackend {
                    backend: other.to_string(),
                }
                .into())
            }
        };
        info!(backend = backend.name(), "storage backend initialized");
        Ok(backend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory(_) => "memory",
            StoreBackend::Filesystem(_) => "filesystem",
        }
    }

    /// Release in-process resources held by the backend.
    ///
    /// Files written by the filesystem backend are already durable (every
    /// create renames into place before returning), so only the read cache
    /// is dropped here.
    pub async fn shutdown(&self) {
        match self {
            StoreBackend::Memory(store) => {
                let count = store.object_count().await;
                store.clear().await;
                info!(objects_dropped = count, "in-memory store closed");
            }
            StoreBackend::Filesystem(store) => {
                let cached = store.entry_count();
                store.clear();
                info!(
                    root = %store.inner().root().display(),
                    cache_entries_dropped = cached,
                    "filesystem store closed"
                );
            }
        }
    }
}

impl MediaStore for StoreBackend {
    async fn get_by_id(&self, id: MediaId) -> Result<Option<MediaObject>, StorageError> {
        match self {
            StoreBackend::Memory(store) => store.get_by_id(id).await,
            StoreBackend::Filesystem(store) => store.get_by_id(id).await,
        }
    }

    async fn create(&self, object: NewMediaObject) -> Result<MediaObject, StorageError> {
        match self {
            StoreBackend::Memory(store) => store.create(object).await,
            StoreBackend::Filesystem(store) => store.create(object).await,
        }
    }
}
