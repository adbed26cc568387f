use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ConfigError;
use super::types::UploadCategory;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub delivery: DeliveryConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Categories that get an upload route. Names are validated at load time.
    pub categories: Vec<String>,
    pub video_max_bytes: u64,
    pub image_max_bytes: u64,
}

impl IngestConfig {
    /// Parse the configured category names.
    pub fn enabled_categories(&self) -> Result<Vec<UploadCategory>, ConfigError> {
        let mut out = Vec::with_capacity(self.categories.len());
        for name in &self.categories {
            let category: UploadCategory = name.parse()?;
            if !out.contains(&category) {
                out.push(category);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `memory` or `filesystem`.
    pub backend: String,
    /// Root directory for the filesystem backend.
    #[serde(default = "default_storage_root")]
    pub root: String,
}

fn default_storage_root() -> String {
    "data/media".to_string()
}

/// Read-through cache in front of the filesystem backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Maximum cache size in bytes.
    pub max_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub cache_control: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl AppConfig {
    /// Load configuration with layered overrides:
    /// 1. config/default.toml
    /// 2. config/{env}.toml (based on CLIPSTREAM_ENV)
    /// 3. Environment variables (CLIPSTREAM_* prefix)
    pub fn load() -> anyhow::Result<Self> {
        let default_path = Path::new("config/default.toml");
        let default_content = std::fs::read_to_string(default_path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", default_path.display(), e))?;

        let mut config: AppConfig = toml::from_str(&default_content)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", default_path.display(), e))?;

        // Layer 2: environment-specific overrides
        let env_name =
            std::env::var("CLIPSTREAM_ENV").unwrap_or_else(|_| "development".to_string());
        let env_path = format!("config/{}.toml", env_name);
        if let Ok(env_content) = std::fs::read_to_string(&env_path) {
            let env_config: AppConfig = toml::from_str(&env_content)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", env_path, e))?;
            config = env_config;
        }

        // Layer 3: environment variable overrides (selected keys)
        Self::apply_env_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let categories = self.ingest.enabled_categories()?;
        if categories.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "ingest.categories must enable at least one category".to_string(),
            });
        }
        match self.storage.backend.as_str() {
            "memory" | "filesystem" => {}
            other => {
                return Err(ConfigError::UnknownBackend {
                    backend: other.to_string(),
                })
            }
        }
        if self.ingest.video_max_bytes == 0 || self.ingest.image_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                reason: "upload size ceilings must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env_overrides(config: &mut AppConfig) {
        if let Ok(v) = std::env::var("CLIPSTREAM_SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_SERVER_PORT") {
            if let Ok(port) = v.parse() {
                config.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_STORAGE_BACKEND") {
            config.storage.backend = v;
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_STORAGE_ROOT") {
            config.storage.root = v;
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_INGEST_CATEGORIES") {
            config.ingest.categories = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_INGEST_VIDEO_MAX_BYTES") {
            if let Ok(n) = v.parse() {
                config.ingest.video_max_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_INGEST_IMAGE_MAX_BYTES") {
            if let Ok(n) = v.parse() {
                config.ingest.image_max_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("CLIPSTREAM_OBSERVABILITY_LOG_LEVEL") {
            config.observability.log_level = v;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            ingest: IngestConfig {
                categories: vec!["video".to_string(), "image".to_string()],
                video_max_bytes: 100 * 1024 * 1024,
                image_max_bytes: 10 * 1024 * 1024,
            },
            storage: StorageConfig {
                backend: "memory".to_string(),
                root: default_storage_root(),
            },
            cache: CacheConfig {
                enabled: true,
                max_size_bytes: 268_435_456, // 256 MB
            },
            delivery: DeliveryConfig {
                cache_control: "public, max-age=31536000".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                log_format: "json".to_string(),
                metrics_enabled: true,
            },
        }
    }
}
