use axum::body::Body;
use axum::http::{header, HeaderMap};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Serialize;
use tracing::info;

use crate::core::error::IngestError;
use crate::core::types::{MediaObject, UploadCategory, DEFAULT_MIME_TYPE};
use crate::observability::metrics as obs;
use crate::storage::MediaStore;

use super::ingestor::{Ingestor, Upload};

/// Declared upload size. Takes precedence over `Content-Length`.
pub const UPLOAD_SIZE_HEADER: &str = "x-upload-size";

/// Optional original file name, recorded as metadata only.
pub const FILE_NAME_HEADER: &str = "x-file-name";

const MAX_FILE_NAME_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Upload API types
// ---------------------------------------------------------------------------

/// Successful upload response.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub category: UploadCategory,
    pub file_name: Option<String>,
    /// Playback URL for the stored object.
    pub url: String,
}

impl UploadResponse {
    pub fn from_object(object: &MediaObject) -> Self {
        Self {
            id: object.id.to_string(),
            mime_type: object.mime_type.clone(),
            size_bytes: object.size_bytes,
            category: object.category,
            file_name: object.file_name.clone(),
            url: format!("/video/{}", object.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Header extraction
// ---------------------------------------------------------------------------

/// MIME type from `Content-Type`, or `None` when absent or blank.
pub fn declared_mime_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Declared size from `X-Upload-Size`, falling back to `Content-Length`.
pub fn declared_size(headers: &HeaderMap) -> Result<u64, IngestError> {
    let (name, value) = match headers.get(UPLOAD_SIZE_HEADER) {
        Some(v) => (UPLOAD_SIZE_HEADER, v),
        None => match headers.get(header::CONTENT_LENGTH) {
            Some(v) => ("content-length", v),
            None => {
                return Err(IngestError::InvalidSizeHeader {
                    reason: "missing X-Upload-Size or Content-Length".to_string(),
                })
            }
        },
    };

    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| IngestError::InvalidSizeHeader {
            reason: format!("{} is not a byte count", name),
        })
}

/// File name from `X-File-Name`, reduced to its last path component.
pub fn file_name(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(FILE_NAME_HEADER)?.to_str().ok()?;
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.chars().take(MAX_FILE_NAME_LEN).collect())
}

// ---------------------------------------------------------------------------
// Body reading
// ---------------------------------------------------------------------------

/// Buffer the request body, reading at most `declared_size_bytes`.
///
/// A body longer than declared is rejected as soon as the overrun is seen.
/// A shorter body is returned as-is and caught by the size-equality check.
pub async fn read_body(body: Body, declared_size_bytes: u64) -> Result<Bytes, IngestError> {
    let limit = usize::try_from(declared_size_bytes).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(IngestError::BodyExceedsDeclared {
            declared_bytes: declared_size_bytes,
        }),
        Err(e) => Err(IngestError::BodyRead {
            reason: e.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Upload handler
// ---------------------------------------------------------------------------

/// HTTP upload front for the ingestor.
///
/// Processing flow:
/// 1. Resolve the declared MIME type (default `video/mp4`)
/// 2. Reject a disallowed type → 415, before reading the body
/// 3. Parse the declared size → 400 when missing or malformed
/// 4. Reject a declared size over the category ceiling → 413
/// 5. Buffer the body, bounded by the declared size
/// 6. Hand the bytes to the ingestor (full policy + one store create)
pub struct HttpUploadHandler<S> {
    ingestor: Ingestor<S>,
}

impl<S: MediaStore> HttpUploadHandler<S> {
    pub fn new(ingestor: Ingestor<S>) -> Self {
        Self { ingestor }
    }

    pub fn ingestor(&self) -> &Ingestor<S> {
        &self.ingestor
    }

    pub async fn handle(
        &self,
        category: UploadCategory,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<UploadResponse, IngestError> {
        let declared_mime_type = declared_mime_type(headers);
        let policy = self.ingestor.policy(category);

        let precheck = || -> Result<u64, IngestError> {
            policy.check_type(declared_mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE))?;
            let declared = declared_size(headers)?;
            policy.check_declared_size(declared)?;
            Ok(declared)
        };

        let declared_size_bytes = match precheck() {
            Ok(n) => n,
            Err(e) => return Err(rejected(category, e)),
        };

        let data = match read_body(body, declared_size_bytes).await {
            Ok(data) => data,
            Err(e) => return Err(rejected(category, e)),
        };

        let object = self
            .ingestor
            .ingest(Upload {
                data,
                declared_mime_type,
                declared_size_bytes,
                category,
                file_name: file_name(headers),
            })
            .await?;

        Ok(UploadResponse::from_object(&object))
    }
}

fn rejected(category: UploadCategory, err: IngestError) -> IngestError {
    info!(%category, error = %err, "upload rejected before ingest");
    obs::inc_upload(category.as_str(), err.error_code());
    err
}
