//! Object storage abstraction and backends for stevedore.
//!
//! This crate provides:
//! - The [`StorageAdapter`] trait: stat, direct put, presigned single and
//!   multipart part uploads, and multipart completion
//! - Backends: S3-compatible (presigned URLs against the real store) and an
//!   in-process memory store for tests

pub mod adapter;
pub mod backends;
pub mod error;

pub use adapter::{MultipartInfo, ObjectMeta, PartEtag, StorageAdapter};
pub use backends::{memory::MemoryBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};

use std::sync::Arc;
use stevedore_core::config::StorageConfig;

/// Create a storage adapter from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn StorageAdapter>> {
    match config {
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory { base_url } => Ok(Arc::new(MemoryBackend::new(base_url))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn from_config_memory_ok() {
        let config = StorageConfig::Memory {
            base_url: "http://127.0.0.1:4000".to_string(),
        };

        let store = from_config(&config).await.unwrap();
        store
            .put("blobs/sha256-1", Bytes::from_static(b"hi"))
            .await
            .unwrap();
        assert_eq!(store.stat("blobs/sha256-1").await.unwrap().size, 2);
    }

    #[tokio::test]
    async fn from_config_s3_ok() {
        let config = StorageConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: Some("minio:9000".to_string()),
            region: "us-east-1".to_string(),
            prefix: "stevedore".to_string(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
        };

        let store = from_config(&config).await.unwrap();
        assert_eq!(store.backend_name(), "s3");
    }

    #[tokio::test]
    async fn from_config_rejects_partial_credentials() {
        let config = StorageConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: None,
            region: "us-east-1".to_string(),
            prefix: String::new(),
            access_key_id: Some("access".to_string()),
            secret_access_key: None,
            force_path_style: false,
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(StorageError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
