//! Configuration types shared by the server binary and test harnesses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_PRESIGN_EXPIRY_SECS};

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Configuration suitable for tests: in-memory storage, ephemeral bind,
    /// tiny chunks so multipart paths are exercised.
    pub fn for_testing() -> Self {
        AppConfig {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
                chunk_size: 1,
                presign_expiry_secs: 60,
                metrics_enabled: false,
            },
            storage: StorageConfig::Memory {
                base_url: "http://127.0.0.1:0".to_string(),
            },
        }
    }
}

/// HTTP server and push planning settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Part size used when planning multipart uploads. Zero means one part
    /// per layer regardless of size.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Lifetime of presigned upload URLs, in seconds.
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
    /// Whether to expose `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl ServerConfig {
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            chunk_size: default_chunk_size(),
            presign_expiry_secs: default_presign_expiry_secs(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_presign_expiry_secs() -> u64 {
    DEFAULT_PRESIGN_EXPIRY_SECS
}

fn default_metrics_enabled() -> bool {
    true
}

/// Storage backend selection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    S3 {
        bucket: String,
        /// Endpoint override for S3-compatible stores, e.g. `minio:9000`.
        /// A bare `host:port` is treated as `http://host:port`.
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default = "default_region")]
        region: String,
        /// Key prefix prepended to every object key.
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        access_key_id: Option<String>,
        #[serde(default)]
        secret_access_key: Option<String>,
        #[serde(default = "default_force_path_style")]
        force_path_style: bool,
    },
    /// In-process store used by tests; presigned URLs point at `base_url`.
    Memory { base_url: String },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::S3 {
            bucket: "stevedore".to_string(),
            endpoint: None,
            region: default_region(),
            prefix: String::new(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: default_force_path_style(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_force_path_style() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.server.presign_expiry(), Duration::from_secs(900));
        assert!(config.server.metrics_enabled);
        assert!(matches!(config.storage, StorageConfig::S3 { .. }));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [storage]
            backend = "s3"
            bucket = "artifacts"
            endpoint = "minio:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.chunk_size, DEFAULT_CHUNK_SIZE);
        match config.storage {
            StorageConfig::S3 {
                bucket,
                endpoint,
                region,
                force_path_style,
                ..
            } => {
                assert_eq!(bucket, "artifacts");
                assert_eq!(endpoint.as_deref(), Some("minio:9000"));
                assert_eq!(region, "us-east-1");
                assert!(force_path_style);
            }
            other => panic!("unexpected storage config: {other:?}"),
        }
    }

    #[test]
    fn test_memory_backend_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [storage]
            backend = "memory"
            base_url = "http://127.0.0.1:4000"
            "#,
        )
        .unwrap();
        assert!(matches!(config.storage, StorageConfig::Memory { .. }));
    }

    #[test]
    fn test_for_testing_uses_memory_storage() {
        let config = AppConfig::for_testing();
        assert!(matches!(config.storage, StorageConfig::Memory { .. }));
        assert_eq!(config.server.chunk_size, 1);
    }
}
