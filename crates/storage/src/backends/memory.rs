//! In-process storage backend.
//!
//! Used by tests and local development. Presigned URLs point at a `base_url`
//! where the test harness runs a small gateway that forwards PUT bodies back
//! into [`MemoryBackend::receive_put`].

use crate::adapter::{MultipartInfo, ObjectMeta, PartEtag, StorageAdapter};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Clone, Debug)]
struct StoredPart {
    etag: String,
    data: Bytes,
}

#[derive(Debug)]
struct Session {
    parts: BTreeMap<u32, StoredPart>,
    initiated: time::OffsetDateTime,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<String, Bytes>,
    /// In-flight multipart sessions keyed by (key, upload_id).
    sessions: HashMap<(String, String), Session>,
}

/// In-memory object store with presigned-URL semantics.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    base_url: String,
    state: Arc<Mutex<MemoryState>>,
}

fn etag_of(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then_some(v)
    })
}

impl MemoryBackend {
    pub fn new(base_url: &str) -> Self {
        MemoryBackend {
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point presigned URLs at a different base, e.g. once the gateway's
    /// ephemeral port is known.
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    /// Handle a PUT that arrived on a presigned URL. `path` is the URL path
    /// (leading slash optional), `query` the raw query string. Returns the
    /// ETag for the stored bytes.
    pub fn receive_put(&self, path: &str, query: &str, body: Bytes) -> StorageResult<String> {
        let key = path.trim_start_matches('/').to_string();
        let etag = etag_of(&body);

        let part_number = query_param(query, "partNumber");
        let upload_id = query_param(query, "uploadId");

        let mut state = self.state();
        match (part_number, upload_id) {
            (Some(part_number), Some(upload_id)) => {
                let part_number: u32 = part_number.parse().map_err(|_| {
                    StorageError::Multipart(format!("bad partNumber: {part_number}"))
                })?;
                let session = state
                    .sessions
                    .get_mut(&(key.clone(), upload_id.to_string()))
                    .ok_or_else(|| {
                        StorageError::Multipart(format!("no such upload: {upload_id}"))
                    })?;
                session.parts.insert(
                    part_number,
                    StoredPart {
                        etag: etag.clone(),
                        data: body,
                    },
                );
            }
            (None, None) => {
                state.objects.insert(key, body);
            }
            _ => {
                return Err(StorageError::Multipart(
                    "partNumber and uploadId must be given together".to_string(),
                ));
            }
        }
        Ok(etag)
    }

    /// Fetch a stored object, for test assertions.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.state().objects.get(key).cloned()
    }

    /// Number of in-flight multipart sessions, for test assertions.
    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }

    fn signed(&self, key: &str, extra: &str) -> String {
        // A fresh signature each call, so URLs are never byte-stable across
        // rounds, matching real presigned URL behavior.
        let sig = uuid::Uuid::new_v4();
        if extra.is_empty() {
            format!("{}/{}?X-Sig={}", self.base_url, key, sig)
        } else {
            format!("{}/{}?{}&X-Sig={}", self.base_url, key, extra, sig)
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryBackend {
    async fn stat(&self, key: &str) -> StorageResult<ObjectMeta> {
        let state = self.state();
        let data = state
            .objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectMeta {
            size: data.len() as u64,
            last_modified: Some(time::OffsetDateTime::now_utc()),
        })
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.state().objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn presign_put(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        Ok(self.signed(key, ""))
    }

    async fn create_multipart(&self, key: &str) -> StorageResult<String> {
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.state().sessions.insert(
            (key.to_string(), upload_id.clone()),
            Session {
                parts: BTreeMap::new(),
                initiated: time::OffsetDateTime::now_utc(),
            },
        );
        Ok(upload_id)
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        {
            let state = self.state();
            if !state
                .sessions
                .contains_key(&(key.to_string(), upload_id.to_string()))
            {
                return Err(StorageError::Multipart(format!(
                    "no such upload: {upload_id}"
                )));
            }
        }
        Ok(self.signed(key, &format!("partNumber={part_number}&uploadId={upload_id}")))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartEtag],
    ) -> StorageResult<()> {
        let mut state = self.state();
        let session_key = (key.to_string(), upload_id.to_string());

        let Some(session) = state.sessions.get(&session_key) else {
            // Concurrent completion already consumed the session.
            if state.objects.contains_key(key) {
                return Ok(());
            }
            return Err(StorageError::Multipart(format!(
                "no such upload: {upload_id}"
            )));
        };

        let mut assembled = Vec::new();
        for part in parts {
            let stored = session.parts.get(&part.part_number).ok_or_else(|| {
                StorageError::Multipart(format!("part {} was never uploaded", part.part_number))
            })?;
            if stored.etag != part.etag.trim_matches('"') {
                return Err(StorageError::Multipart(format!(
                    "etag mismatch for part {}",
                    part.part_number
                )));
            }
            assembled.extend_from_slice(&stored.data);
        }

        state.objects.insert(key.to_string(), Bytes::from(assembled));
        state.sessions.remove(&session_key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let state = self.state();
        let mut keys: Vec<String> = state
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn list_multipart(&self, prefix: &str) -> StorageResult<Vec<MultipartInfo>> {
        let state = self.state();
        let mut uploads: Vec<MultipartInfo> = state
            .sessions
            .iter()
            .filter(|((key, _), _)| key.starts_with(prefix))
            .map(|((key, upload_id), session)| MultipartInfo {
                key: key.clone(),
                upload_id: upload_id.clone(),
                initiated: Some(session.initiated),
            })
            .collect();
        uploads.sort_by(|a, b| (&a.key, &a.upload_id).cmp(&(&b.key, &b.upload_id)));
        Ok(uploads)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
