use crate::core::config::IngestConfig;
use crate::core::error::IngestError;
use crate::core::types::UploadCategory;

// ---------------------------------------------------------------------------
// Validation constants
// ---------------------------------------------------------------------------

/// Default ceiling for video uploads (100 MiB).
pub const VIDEO_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Default ceiling for image uploads (10 MiB).
pub const IMAGE_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Image MIME types accepted for the `image` category.
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

// ---------------------------------------------------------------------------
// Upload policy
// ---------------------------------------------------------------------------

/// How a category decides whether a declared MIME type is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeRule {
    /// The type must start with the given prefix (e.g. `video/`).
    Prefix(&'static str),
    /// The type must be one of the listed values.
    OneOf(&'static [&'static str]),
}

impl MimeRule {
    /// Check a declared MIME type. Parameters (`; codecs=...`) and case are
    /// ignored.
    pub fn allows(&self, mime_type: &str) -> bool {
        let essence = mime_essence(mime_type);
        match self {
            MimeRule::Prefix(prefix) => {
                essence.len() > prefix.len() && essence.starts_with(prefix)
            }
            MimeRule::OneOf(allowed) => allowed.iter().any(|a| *a == essence),
        }
    }
}

/// Lowercased `type/subtype` portion of a MIME string.
pub fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Validation policy attached to an upload category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub category: UploadCategory,
    pub mime_rule: MimeRule,
    pub max_size_bytes: u64,
}

impl UploadPolicy {
    /// Built-in policy for a category.
    pub fn defaults(category: UploadCategory) -> Self {
        match category {
            UploadCategory::Video => Self {
                category,
                mime_rule: MimeRule::Prefix("video/"),
                max_size_bytes: VIDEO_MAX_BYTES,
            },
            UploadCategory::Image => Self {
                category,
                mime_rule: MimeRule::OneOf(IMAGE_MIME_TYPES),
                max_size_bytes: IMAGE_MAX_BYTES,
            },
        }
    }

    /// Policy for a category with the configured size ceiling.
    pub fn for_category(category: UploadCategory, config: &IngestConfig) -> Self {
        let mut policy = Self::defaults(category);
        policy.max_size_bytes = match category {
            UploadCategory::Video => config.video_max_bytes,
            UploadCategory::Image => config.image_max_bytes,
        };
        policy
    }

    /// Type allow-check.
    pub fn check_type(&self, mime_type: &str) -> Result<(), IngestError> {
        if self.mime_rule.allows(mime_type) {
            Ok(())
        } else {
            Err(IngestError::InvalidType {
                mime_type: mime_type.to_string(),
                category: self.category,
            })
        }
    }

    /// Declared-size ceiling check.
    pub fn check_declared_size(&self, declared_size_bytes: u64) -> Result<(), IngestError> {
        if declared_size_bytes > self.max_size_bytes {
            Err(IngestError::TooLarge {
                size_bytes: declared_size_bytes,
                max_bytes: self.max_size_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Full policy, evaluated in order (first failure wins):
    /// 1. MIME type allowed for the category → `InvalidType`
    /// 2. Declared size within the ceiling → `TooLarge`
    /// 3. Declared size equals the received byte count → `SizeMismatch`
    pub fn validate(
        &self,
        mime_type: &str,
        declared_size_bytes: u64,
        actual_size_bytes: u64,
    ) -> Result<(), IngestError> {
        self.check_type(mime_type)?;
        self.check_declared_size(declared_size_bytes)?;
        if declared_size_bytes != actual_size_bytes {
            return Err(IngestError::SizeMismatch {
                declared_bytes: declared_size_bytes,
                actual_bytes: actual_size_bytes,
            });
        }
        Ok(())
    }
}
