use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::core::error::StorageError;
use crate::core::types::{MediaId, MediaObject, NewMediaObject};

use super::MediaStore;

// ---------------------------------------------------------------------------
// InMemoryMediaStore
// ---------------------------------------------------------------------------

/// In-memory storage backend for development and tests.
///
/// Stores all objects in a `HashMap<MediaId, MediaObject>` behind a `RwLock`.
/// Cloning an object only bumps the `Bytes` refcount, so reads never copy
/// the payload.
pub struct InMemoryMediaStore {
    objects: Arc<RwLock<HashMap<MediaId, MediaObject>>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Drop every object. Called on shutdown.
    pub async fn clear(&self) {
        self.objects.write().await.clear();
    }
}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaStore for InMemoryMediaStore {
    async fn get_by_id(&self, id: MediaId) -> Result<Option<MediaObject>, StorageError> {
        let objects = self.objects.read().await;
        Ok(objects.get(&id).cloned())
    }

    async fn create(&self, object: NewMediaObject) -> Result<MediaObject, StorageError> {
        let id = MediaId::new();
        let stored = object.into_object(id, Utc::now());
        let mut objects = self.objects.write().await;
        objects.insert(id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{MediaPayload, UploadCategory};
    use bytes::Bytes;

    fn new_video(data: &'static [u8]) -> NewMediaObject {
        NewMediaObject {
            payload: MediaPayload::Inline(Bytes::from_static(data)),
            mime_type: "video/mp4".to_string(),
            size_bytes: data.len() as u64,
            category: UploadCategory::Video,
            file_name: Some("clip.mp4".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryMediaStore::new();
        let created = store.create(new_video(b"0123456789")).await.unwrap();

        let fetched = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.size_bytes, 10);
        assert_eq!(fetched.mime_type, "video/mp4");
        assert_eq!(fetched.file_name.as_deref(), Some("clip.mp4"));
        assert_eq!(
            fetched.payload.inline_bytes().unwrap().as_ref(),
            b"0123456789"
        );
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let store = InMemoryMediaStore::new();
        assert!(store.get_by_id(MediaId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_assigns_distinct_ids() {
        let store = InMemoryMediaStore::new();
        let a = store.create(new_video(b"a")).await.unwrap();
        let b = store.create(new_video(b"a")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.object_count().await, 2);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryMediaStore::new();
        store.create(new_video(b"a")).await.unwrap();
        store.clear().await;
        assert_eq!(store.object_count().await, 0);
    }
}
