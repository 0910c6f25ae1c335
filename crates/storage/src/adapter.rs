//! Storage adapter trait definition.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}

/// A part's ETag as returned by the store after a part upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartEtag {
    /// 1-based part number.
    pub part_number: u32,
    /// ETag with no surrounding quotes.
    pub etag: String,
}

/// An in-flight multipart upload session.
#[derive(Clone, Debug)]
pub struct MultipartInfo {
    pub key: String,
    pub upload_id: String,
    /// When the session was started (if available).
    pub initiated: Option<time::OffsetDateTime>,
}

/// Object store abstraction for the push path.
///
/// All keys are relative to the backend's configured prefix. Presigned URLs
/// authorize exactly one PUT against the backing store and expire after the
/// given duration.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Get an object's size without fetching content.
    async fn stat(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Presign a single-object PUT.
    async fn presign_put(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Start a multipart upload, returning its upload id.
    async fn create_multipart(&self, key: &str) -> StorageResult<String>;

    /// Presign a part PUT within an existing multipart upload.
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Complete a multipart upload from the given part ETags.
    ///
    /// Must be idempotent: completing an upload whose object already exists
    /// (because a concurrent caller finished first) succeeds.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartEtag],
    ) -> StorageResult<()>;

    /// List object keys with a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// List in-flight multipart upload sessions with a key prefix.
    async fn list_multipart(&self, prefix: &str) -> StorageResult<Vec<MultipartInfo>>;

    /// Name of this backend, for logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Verify backend connectivity at startup.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
