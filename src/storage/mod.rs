pub mod backend;
pub mod cache;
pub mod fs;
pub mod memory;

use std::sync::Arc;

use crate::core::error::StorageError;
use crate::core::types::{MediaId, MediaObject, NewMediaObject};

pub use backend::StoreBackend;

// ---------------------------------------------------------------------------
// MediaStore trait
// ---------------------------------------------------------------------------

/// The persistence collaborator used by the ingestor and the responder.
///
/// Only two operations are needed. Implementations own any serialization
/// between concurrent creates; callers hold no locks.
pub trait MediaStore: Send + Sync {
    /// Fetch an object by id. `Ok(None)` means the object does not exist.
    fn get_by_id(
        &self,
        id: MediaId,
    ) -> impl std::future::Future<Output = Result<Option<MediaObject>, StorageError>> + Send;

    /// Persist a new object, assigning its id and timestamps.
    fn create(
        &self,
        object: NewMediaObject,
    ) -> impl std::future::Future<Output = Result<MediaObject, StorageError>> + Send;
}

impl<S: MediaStore> MediaStore for Arc<S> {
    async fn get_by_id(&self, id: MediaId) -> Result<Option<MediaObject>, StorageError> {
        self.as_ref().get_by_id(id).await
    }

    async fn create(&self, object: NewMediaObject) -> Result<MediaObject, StorageError> {
        self.as_ref().create(object).await
    }
}
