use bytes::Bytes;
use tracing::{debug, error};

use crate::core::error::DeliveryError;
use crate::core::types::{MediaId, MediaPayload};
use crate::observability::metrics as obs;
use crate::storage::MediaStore;

use super::range::{parse_range_header, resolve_range, ResolvedRange};

/// A resolved playback response, independent of the HTTP framework.
#[derive(Debug, Clone)]
pub struct MediaResponse {
    pub id: MediaId,
    pub mime_type: String,
    pub total_bytes: u64,
    /// Inclusive window for a 206; `None` for a full 200 response.
    pub window: Option<(u64, u64)>,
    /// Zero-copy view over the stored payload.
    pub body: Bytes,
}

impl MediaResponse {
    pub fn is_partial(&self) -> bool {
        self.window.is_some()
    }

    pub fn status_code(&self) -> u16 {
        if self.is_partial() {
            206
        } else {
            200
        }
    }

    /// `bytes start-end/total` for partial responses.
    pub fn content_range(&self) -> Option<String> {
        self.window
            .map(|(start, end)| format!("bytes {}-{}/{}", start, end, self.total_bytes))
    }

    pub fn etag(&self) -> String {
        format!("\"{}\"", self.id)
    }
}

/// Resolve an object id and optional `Range` header into a response.
///
/// Reads are pure: the stored buffer is only ever sliced, so any number of
/// concurrent calls for the same object are independent and idempotent.
pub async fn serve<S: MediaStore>(
    store: &S,
    object_id: &str,
    range_header: Option<&str>,
) -> Result<MediaResponse, DeliveryError> {
    let id: MediaId = object_id
        .parse()
        .map_err(|_| DeliveryError::ObjectNotFound {
            id: object_id.to_string(),
        })?;

    let storage_start = std::time::Instant::now();
    let fetched = store.get_by_id(id).await;
    obs::record_storage_get_duration(storage_start.elapsed().as_secs_f64());

    let object = match fetched {
        Ok(Some(object)) => object,
        Ok(None) => {
            return Err(DeliveryError::ObjectNotFound {
                id: object_id.to_string(),
            })
        }
        Err(e) => {
            obs::inc_storage_error("get");
            return Err(e.into());
        }
    };

    let data = match &object.payload {
        MediaPayload::Inline(data) => data,
        MediaPayload::Reference(_) => return Err(DeliveryError::PayloadMissing { id }),
    };

    let total_bytes = object.size_bytes;
    if data.len() as u64 != total_bytes {
        error!(
            %id,
            declared_bytes = total_bytes,
            actual_bytes = data.len(),
            "stored payload length disagrees with size_bytes"
        );
        obs::inc_delivery_integrity_fault();
        return Err(DeliveryError::IntegrityFault {
            id,
            declared_bytes: total_bytes,
            actual_bytes: data.len() as u64,
        });
    }

    let range = range_header.and_then(parse_range_header);
    let (window, body) = match resolve_range(range, total_bytes) {
        ResolvedRange::Full => (None, data.clone()),
        ResolvedRange::Partial { start, end } => {
            let body = data.slice(start as usize..=end as usize);
            (Some((start, end)), body)
        }
        ResolvedRange::Unsatisfiable => {
            debug!(%id, ?range_header, total_bytes, "range not satisfiable");
            return Err(DeliveryError::RangeNotSatisfiable { total_bytes });
        }
    };

    Ok(MediaResponse {
        id,
        mime_type: object.mime_type,
        total_bytes,
        window,
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::types::{NewMediaObject, UploadCategory};
    use crate::storage::memory::InMemoryMediaStore;

    async fn store_with(data: Vec<u8>) -> (InMemoryMediaStore, MediaId) {
        let store = InMemoryMediaStore::new();
        let size_bytes = data.len() as u64;
        let created = store
            .create(NewMediaObject {
                payload: MediaPayload::Inline(Bytes::from(data)),
                mime_type: "video/mp4".to_string(),
                size_bytes,
                category: UploadCategory::Video,
                file_name: None,
            })
            .await
            .unwrap();
        (store, created.id)
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_full_response() {
        let (store, id) = store_with(pattern(1000)).await;
        let response = serve(&store, &id.to_string(), None).await.unwrap();

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.total_bytes, 1000);
        assert_eq!(response.body.len(), 1000);
        assert!(response.content_range().is_none());
        assert_eq!(response.etag(), format!("\"{}\"", id));
    }

    #[tokio::test]
    async fn test_partial_response_slices_inclusive_window() {
        let data = pattern(1000);
        let (store, id) = store_with(data.clone()).await;
        let response = serve(&store, &id.to_string(), Some("bytes=0-499"))
            .await
            .unwrap();

        assert_eq!(response.status_code(), 206);
        assert_eq!(response.content_range().as_deref(), Some("bytes 0-499/1000"));
        assert_eq!(response.body.as_ref(), &data[..500]);
    }

    #[tokio::test]
    async fn test_open_ended_and_clamped_ranges() {
        let data = pattern(1000);
        let (store, id) = store_with(data.clone()).await;
        let sid = id.to_string();

        let open = serve(&store, &sid, Some("bytes=500-")).await.unwrap();
        assert_eq!(open.content_range().as_deref(), Some("bytes 500-999/1000"));
        assert_eq!(open.body.as_ref(), &data[500..]);

        let clamped = serve(&store, &sid, Some("bytes=990-4000")).await.unwrap();
        assert_eq!(clamped.content_range().as_deref(), Some("bytes 990-999/1000"));
        assert_eq!(clamped.body.len(), 10);
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let (store, id) = store_with(pattern(1000)).await;
        let err = serve(&store, &id.to_string(), Some("bytes=1500-2000"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::RangeNotSatisfiable { total_bytes: 1000 }
        ));
    }

    #[tokio::test]
    async fn test_unparsable_ranges_fall_back_to_full() {
        let (store, id) = store_with(pattern(100)).await;
        for header in ["bytes=0-10,20-30", "bytes=-50", "lines=1-2", "bytes=x-"] {
            let response = serve(&store, &id.to_string(), Some(header)).await.unwrap();
            assert_eq!(response.status_code(), 200, "{header}");
            assert_eq!(response.body.len(), 100);
        }
    }

    #[tokio::test]
    async fn test_empty_object() {
        let (store, id) = store_with(Vec::new()).await;
        let sid = id.to_string();

        let full = serve(&store, &sid, None).await.unwrap();
        assert_eq!(full.status_code(), 200);
        assert!(full.body.is_empty());

        assert!(matches!(
            serve(&store, &sid, Some("bytes=0-")).await,
            Err(DeliveryError::RangeNotSatisfiable { total_bytes: 0 })
        ));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let store = InMemoryMediaStore::new();
        assert!(matches!(
            serve(&store, &MediaId::new().to_string(), None).await,
            Err(DeliveryError::ObjectNotFound { .. })
        ));
        assert!(matches!(
            serve(&store, "not-a-uuid", None).await,
            Err(DeliveryError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reference_payload_is_not_found() {
        let store = InMemoryMediaStore::new();
        let created = store
            .create(NewMediaObject {
                payload: MediaPayload::Reference("https://cdn.example/v.mp4".to_string()),
                mime_type: "video/mp4".to_string(),
                size_bytes: 10,
                category: UploadCategory::Video,
                file_name: None,
            })
            .await
            .unwrap();

        let err = serve(&store, &created.id.to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::PayloadMissing { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_integrity_fault() {
        let store = InMemoryMediaStore::new();
        let created = store
            .create(NewMediaObject {
                payload: MediaPayload::Inline(Bytes::from(vec![0u8; 40])),
                mime_type: "video/mp4".to_string(),
                size_bytes: 100,
                category: UploadCategory::Video,
                file_name: None,
            })
            .await
            .unwrap();

        let err = serve(&store, &created.id.to_string(), Some("bytes=0-10"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::IntegrityFault {
                declared_bytes: 100,
                actual_bytes: 40,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_truncated_file_payload_is_integrity_fault() {
        use crate::storage::fs::FsMediaStore;

        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::open(dir.path()).await.unwrap();
        let created = store
            .create(NewMediaObject {
                payload: MediaPayload::Inline(Bytes::from(pattern(100))),
                mime_type: "video/mp4".to_string(),
                size_bytes: 100,
                category: UploadCategory::Video,
                file_name: None,
            })
            .await
            .unwrap();
        std::fs::write(dir.path().join(format!("{}.bin", created.id)), [0u8; 40]).unwrap();

        let err = serve(&store, &created.id.to_string(), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert!(matches!(err, DeliveryError::IntegrityFault { .. }));
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let (store, id) = store_with(pattern(4096)).await;
        let sid = id.to_string();

        let a = serve(&store, &sid, Some("bytes=100-199")).await.unwrap();
        let b = serve(&store, &sid, Some("bytes=100-199")).await.unwrap();
        assert_eq!(a.body, b.body);
        assert_eq!(a.content_range(), b.content_range());
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_windows() {
        let data = pattern(64 * 1024);
        let (store, id) = store_with(data.clone()).await;
        let store = Arc::new(store);

        let mut tasks = Vec::new();
        for chunk in 0..16u64 {
            let store = store.clone();
            let sid = id.to_string();
            tasks.push(tokio::spawn(async move {
                let start = chunk * 4096;
                let end = start + 4095;
                let header = format!("bytes={}-{}", start, end);
                let response = serve(&store, &sid, Some(&header)).await.unwrap();
                (start, response.body)
            }));
        }

        for task in tasks {
            let (start, body) = task.await.unwrap();
            let start = start as usize;
            assert_eq!(body.as_ref(), &data[start..start + 4096]);
        }
    }
}
