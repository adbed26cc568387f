use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::ConfigError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a stored media object (UUIDv7 for time-sortability).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(Uuid);

impl MediaId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MediaId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Upload category
// ---------------------------------------------------------------------------

/// Upload category. Each category carries its own validation policy
/// (see `ingest::validator::UploadPolicy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadCategory {
    Video,
    Image,
}

impl UploadCategory {
    pub const ALL: [UploadCategory; 2] = [UploadCategory::Video, UploadCategory::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::Video => "video",
            UploadCategory::Image => "image",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parsing is only done while loading configuration, so an unknown name is
/// a configuration error rather than a per-upload one.
impl FromStr for UploadCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(UploadCategory::Video),
            "image" => Ok(UploadCategory::Image),
            other => Err(ConfigError::UnknownCategory {
                category: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Media payload and object
// ---------------------------------------------------------------------------

/// MIME type recorded when the uploader did not declare one.
pub const DEFAULT_MIME_TYPE: &str = "video/mp4";

/// Where the bytes of a media object live.
///
/// `Inline` with an empty buffer is a valid (zero-length) object and is
/// distinct from `Reference`, which carries no bytes at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Inline(Bytes),
    Reference(String),
}

impl MediaPayload {
    pub fn inline_bytes(&self) -> Option<&Bytes> {
        match self {
            MediaPayload::Inline(data) => Some(data),
            MediaPayload::Reference(_) => None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, MediaPayload::Inline(_))
    }
}

/// A persisted media object.
///
/// Read-only once created. `size_bytes` must equal the inline buffer length;
/// delivery checks this before serving and fails closed on mismatch.
#[derive(Debug, Clone)]
pub struct MediaObject {
    pub id: MediaId,
    pub payload: MediaPayload,
    pub mime_type: String,
    pub size_bytes: u64,
    pub category: UploadCategory,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated object handed to the store. The store assigns the id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewMediaObject {
    pub payload: MediaPayload,
    pub mime_type: String,
    pub size_bytes: u64,
    pub category: UploadCategory,
    pub file_name: Option<String>,
}

impl NewMediaObject {
    /// Assign identity and timestamps. Used by store implementations.
    pub fn into_object(self, id: MediaId, now: DateTime<Utc>) -> MediaObject {
        MediaObject {
            id,
            payload: self.payload,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            category: self.category,
            file_name: self.file_name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Serializable view of a `MediaObject` without its bytes. Used for the
/// filesystem store's metadata sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: MediaId,
    pub mime_type: String,
    pub size_bytes: u64,
    pub category: UploadCategory,
    pub file_name: Option<String>,
    /// Set when the object has no inline bytes.
    pub reference_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    pub fn from_object(object: &MediaObject) -> Self {
        let reference_url = match &object.payload {
            MediaPayload::Inline(_) => None,
            MediaPayload::Reference(url) => Some(url.clone()),
        };
        Self {
            id: object.id,
            mime_type: object.mime_type.clone(),
            size_bytes: object.size_bytes,
            category: object.category,
            file_name: object.file_name.clone(),
            reference_url,
            created_at: object.created_at,
            updated_at: object.updated_at,
        }
    }

    /// Rebuild the object, attaching `inline` bytes unless the record is a
    /// reference.
    pub fn into_object(self, inline: Option<Bytes>) -> MediaObject {
        let payload = match (self.reference_url, inline) {
            (Some(url), _) => MediaPayload::Reference(url),
            (None, Some(data)) => MediaPayload::Inline(data),
            (None, None) => MediaPayload::Inline(Bytes::new()),
        };
        MediaObject {
            id: self.id,
            payload,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            category: self.category,
            file_name: self.file_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_id_roundtrips_through_display() {
        let id = MediaId::new();
        let parsed: MediaId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_media_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<MediaId>().is_err());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("video".parse::<UploadCategory>().unwrap(), UploadCategory::Video);
        assert_eq!(" Image ".parse::<UploadCategory>().unwrap(), UploadCategory::Image);
        assert!(matches!(
            "audio".parse::<UploadCategory>(),
            Err(ConfigError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_empty_inline_is_not_reference() {
        let empty = MediaPayload::Inline(Bytes::new());
        assert!(empty.is_inline());
        assert_eq!(empty.inline_bytes().map(|b| b.len()), Some(0));

        let reference = MediaPayload::Reference("https://cdn.example/v.mp4".to_string());
        assert!(!reference.is_inline());
        assert!(reference.inline_bytes().is_none());
    }

    #[test]
    fn test_record_preserves_reference() {
        let object = NewMediaObject {
            payload: MediaPayload::Reference("https://cdn.example/v.mp4".to_string()),
            mime_type: "video/mp4".to_string(),
            size_bytes: 0,
            category: UploadCategory::Video,
            file_name: None,
        }
        .into_object(MediaId::new(), Utc::now());

        let record = MediaRecord::from_object(&object);
        let rebuilt = record.into_object(Some(Bytes::from_static(b"ignored")));
        assert_eq!(rebuilt.payload, object.payload);
    }
}
