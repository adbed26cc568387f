use thiserror::Error;

use super::types::{MediaId, UploadCategory};

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown upload category: {category}")]
    UnknownCategory { category: String },

    #[error("unknown storage backend: {backend}")]
    UnknownBackend { backend: String },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

/// Errors originating from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write object {id}: {reason}")]
    WriteFailed { id: MediaId, reason: String },

    #[error("failed to read object {id}: {reason}")]
    ReadFailed { id: MediaId, reason: String },

    #[error("corrupt metadata for object {id}: {reason}")]
    CorruptMetadata { id: MediaId, reason: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Errors originating from the upload validator and ingestor.
///
/// The three validation variants are deterministic caller mistakes and are
/// never retried. `Storage` is passed through unchanged.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid type {mime_type} for {category} upload")]
    InvalidType {
        mime_type: String,
        category: UploadCategory,
    },

    #[error("upload too large: {size_bytes} bytes exceeds limit {max_bytes} bytes")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("size mismatch: declared {declared_bytes} bytes, received {actual_bytes} bytes")]
    SizeMismatch {
        declared_bytes: u64,
        actual_bytes: u64,
    },

    #[error("upload body exceeds declared size of {declared_bytes} bytes")]
    BodyExceedsDeclared { declared_bytes: u64 },

    #[error("invalid upload size header: {reason}")]
    InvalidSizeHeader { reason: String },

    #[error("failed to read upload body: {reason}")]
    BodyRead { reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IngestError {
    /// Map an IngestError to its HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::InvalidType { .. } => 415,
            IngestError::TooLarge { .. } => 413,
            IngestError::SizeMismatch { .. } | IngestError::BodyExceedsDeclared { .. } => 422,
            IngestError::InvalidSizeHeader { .. } | IngestError::BodyRead { .. } => 400,
            IngestError::Storage(_) => 500,
        }
    }

    /// Return the error code string for JSON responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            IngestError::InvalidType { .. } => "invalid_type",
            IngestError::TooLarge { .. } => "too_large",
            IngestError::SizeMismatch { .. } | IngestError::BodyExceedsDeclared { .. } => {
                "size_mismatch"
            }
            IngestError::InvalidSizeHeader { .. } => "invalid_size_header",
            IngestError::BodyRead { .. } => "invalid_body",
            IngestError::Storage(_) => "storage_error",
        }
    }

    /// Whether this is one of the policy rejections (as opposed to a
    /// transport or storage failure).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IngestError::InvalidType { .. }
                | IngestError::TooLarge { .. }
                | IngestError::SizeMismatch { .. }
                | IngestError::BodyExceedsDeclared { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// Errors originating from the range-streaming responder.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("media object not found: {id}")]
    ObjectNotFound { id: String },

    #[error("media object {id} has no inline payload")]
    PayloadMissing { id: MediaId },

    #[error("range not satisfiable for object of {total_bytes} bytes")]
    RangeNotSatisfiable { total_bytes: u64 },

    #[error("integrity fault for object {id}: size_bytes={declared_bytes}, payload={actual_bytes}")]
    IntegrityFault {
        id: MediaId,
        declared_bytes: u64,
        actual_bytes: u64,
    },

    #[error("storage backend error: {0}")]
    Storage(#[from] StorageError),
}

impl DeliveryError {
    /// Map a DeliveryError to its HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            DeliveryError::ObjectNotFound { .. } => 404,
            DeliveryError::PayloadMissing { .. } => 404,
            DeliveryError::RangeNotSatisfiable { .. } => 416,
            DeliveryError::IntegrityFault { .. } => 500,
            DeliveryError::Storage(_) => 500,
        }
    }

    /// Return the error code string for JSON responses.
    ///
    /// Both not-found cases share a code so clients cannot tell them apart.
    pub fn error_code(&self) -> &'static str {
        match self {
            DeliveryError::ObjectNotFound { .. } | DeliveryError::PayloadMissing { .. } => {
                "not_found"
            }
            DeliveryError::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            DeliveryError::IntegrityFault { .. } => "integrity_fault",
            DeliveryError::Storage(_) => "storage_error",
        }
    }

    /// Message safe to show to clients.
    pub fn public_message(&self) -> String {
        match self {
            DeliveryError::ObjectNotFound { .. } | DeliveryError::PayloadMissing { .. } => {
                "Video not found.".to_string()
            }
            DeliveryError::RangeNotSatisfiable { total_bytes } => {
                format!("Requested range is not satisfiable (size {total_bytes}).")
            }
            DeliveryError::IntegrityFault { .. } | DeliveryError::Storage(_) => {
                "Internal server error.".to_string()
            }
        }
    }

    /// Label used for the not-found reason metric and log field.
    pub fn not_found_reason(&self) -> Option<&'static str> {
        match self {
            DeliveryError::ObjectNotFound { .. } => Some("object_missing"),
            DeliveryError::PayloadMissing { .. } => Some("payload_missing"),
            _ => None,
        }
    }
}
