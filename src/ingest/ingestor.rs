use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tracing::{info, warn};

use crate::core::config::IngestConfig;
use crate::core::error::IngestError;
use crate::core::types::{MediaObject, MediaPayload, NewMediaObject, UploadCategory, DEFAULT_MIME_TYPE};
use crate::observability::metrics as obs;
use crate::storage::MediaStore;

use super::validator::UploadPolicy;

/// One upload as handed over by the transport.
#[derive(Debug, Clone)]
pub struct Upload {
    pub data: Bytes,
    /// `None` records and validates as `video/mp4`.
    pub declared_mime_type: Option<String>,
    pub declared_size_bytes: u64,
    pub category: UploadCategory,
    pub file_name: Option<String>,
}

/// Validates uploads against their category policy and persists accepted
/// ones through a `MediaStore`.
///
/// Every upload results in at most one `create` call. Validation failures
/// touch no storage, and storage failures are returned as-is without retry.
pub struct Ingestor<S> {
    store: S,
    policies: HashMap<UploadCategory, UploadPolicy>,
}

impl<S: MediaStore> Ingestor<S> {
    pub fn new(store: S, config: &IngestConfig) -> Self {
        let policies = UploadCategory::ALL
            .iter()
            .map(|c| (*c, UploadPolicy::for_category(*c, config)))
            .collect();
        Self { store, policies }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self, category: UploadCategory) -> UploadPolicy {
        self.policies
            .get(&category)
            .cloned()
            .unwrap_or_else(|| UploadPolicy::defaults(category))
    }

    /// Validate and persist one upload, returning the stored object.
    pub async fn ingest(&self, upload: Upload) -> Result<MediaObject, IngestError> {
        let start = Instant::now();
        let category = upload.category;
        let mime_type = upload
            .declared_mime_type
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let actual_size_bytes = upload.data.len() as u64;

        let policy = self.policy(category);
        if let Err(e) = policy.validate(&mime_type, upload.declared_size_bytes, actual_size_bytes) {
            info!(
                %category,
                %mime_type,
                declared_size_bytes = upload.declared_size_bytes,
                actual_size_bytes,
                error = %e,
                "upload rejected"
            );
            obs::inc_upload(category.as_str(), e.error_code());
            return Err(e);
        }

        let put_start = Instant::now();
        let created = self
            .store
            .create(NewMediaObject {
                payload: MediaPayload::Inline(upload.data),
                mime_type,
                size_bytes: actual_size_bytes,
                category,
                file_name: upload.file_name,
            })
            .await;
        obs::record_storage_put_duration(put_start.elapsed().as_secs_f64());

        match created {
            Ok(object) => {
                obs::inc_upload(category.as_str(), "accepted");
                obs::record_upload_size(category.as_str(), actual_size_bytes as f64);
                obs::record_upload_duration(category.as_str(), start.elapsed().as_secs_f64());
                info!(
                    id = %object.id,
                    %category,
                    mime_type = %object.mime_type,
                    size_bytes = object.size_bytes,
                    "upload stored"
                );
                Ok(object)
            }
            Err(e) => {
                warn!(%category, error = %e, "failed to persist upload");
                obs::inc_storage_error("create");
                obs::inc_upload(category.as_str(), "storage_error");
                Err(IngestError::Storage(e))
            }
        }
    }
}
