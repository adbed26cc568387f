use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, warn};

use crate::core::error::StorageError;
use crate::core::types::{MediaId, MediaObject, MediaPayload, MediaRecord, NewMediaObject};

use super::MediaStore;

/// Filesystem storage backend.
///
/// Layout under `root`:
///
/// ```text
/// {id}.bin    inline payload bytes (absent for reference objects)
/// {id}.json   metadata sidecar (MediaRecord)
/// ```
///
/// Both files are written to a `.part` sibling and renamed into place. The
/// sidecar is renamed last, so an object only becomes visible once its
/// payload is complete.
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "filesystem media store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, id: MediaId) -> PathBuf {
        self.root.join(format!("{}.bin", id))
    }

    fn record_path(&self, id: MediaId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut tmp: OsString = path.as_os_str().to_owned();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);

        if let Err(e) = tokio::fs::write(&tmp, data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        tokio::fs::rename(&tmp, path).await
    }
}

impl MediaStore for FsMediaStore {
    async fn get_by_id(&self, id: MediaId) -> Result<Option<MediaObject>, StorageError> {
        let record_bytes = match tokio::fs::read(self.record_path(id)).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    id,
                    reason: e.to_string(),
                })
            }
        };

        let record: MediaRecord =
            serde_json::from_slice(&record_bytes).map_err(|e| StorageError::CorruptMetadata {
                id,
                reason: e.to_string(),
            })?;

        if record.reference_url.is_some() {
            return Ok(Some(record.into_object(None)));
        }

        // A sidecar without its payload file means the store is damaged.
        let data = tokio::fs::read(self.payload_path(id))
            .await
            .map_err(|e| StorageError::ReadFailed {
                id,
                reason: format!("payload unreadable: {}", e),
            })?;

        Ok(Some(record.into_object(Some(Bytes::from(data)))))
    }

    async fn create(&self, object: NewMediaObject) -> Result<MediaObject, StorageError> {
        let id = MediaId::new();
        let stored = object.into_object(id, Utc::now());

        if let MediaPayload::Inline(data) = &stored.payload {
            Self::write_atomic(&self.payload_path(id), data)
                .await
                .map_err(|e| StorageError::WriteFailed {
                    id,
                    reason: e.to_string(),
                })?;
        }

        let record = MediaRecord::from_object(&stored);
        let json = serde_json::to_vec(&record).map_err(|e| StorageError::WriteFailed {
            id,
            reason: format!("failed to serialize metadata: {}", e),
        })?;

        if let Err(e) = Self::write_atomic(&self.record_path(id), &json).await {
            // Leave nothing behind for an object that never became visible.
            if let Err(cleanup) = tokio::fs::remove_file(self.payload_path(id)).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(%id, error = %cleanup, "failed to remove orphaned payload");
                }
            }
            return Err(StorageError::WriteFailed {
                id,
                reason: e.to_string(),
            });
        }

        debug!(%id, size_bytes = stored.size_bytes, "object written to filesystem");
        Ok(stored)
    }
}
