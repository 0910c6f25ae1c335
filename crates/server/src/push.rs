//! Push reconciliation.
//!
//! The server keeps no session state of its own. Each push request is
//! reconciled against what the object store already holds, plus the upload
//! evidence the client echoes back (URL + ETag pairs from completed part
//! PUTs). The response is the set of byte ranges still required; an empty
//! set means every layer is materialized and the manifest has been
//! committed.

use crate::error::{ApiError, ApiResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use stevedore_core::{blob_key, Chunks, CompletePart, Manifest, Reference, Requirement};
use stevedore_storage::{PartEtag, StorageAdapter, StorageError};

/// Upload evidence extracted from client-echoed part URLs, indexed by blob
/// key and upload id.
#[derive(Debug, Default)]
struct UploadEvidence {
    /// key -> upload_id -> part_number -> etag
    parts: HashMap<String, HashMap<String, BTreeMap<u32, String>>>,
}

impl UploadEvidence {
    fn from_uploaded(uploaded: &[CompletePart]) -> Self {
        let mut evidence = UploadEvidence::default();
        for part in uploaded {
            let Ok(parsed) = url::Url::parse(&part.url) else {
                tracing::debug!(url = %part.url, "ignoring unparseable uploaded URL");
                continue;
            };
            let Some(key) = blob_key_from_path(parsed.path()) else {
                continue;
            };

            let mut upload_id = None;
            let mut part_number = None;
            for (name, value) in parsed.query_pairs() {
                match name.as_ref() {
                    "uploadId" => upload_id = Some(value.into_owned()),
                    "partNumber" => part_number = value.parse::<u32>().ok(),
                    _ => {}
                }
            }

            // Single-PUT uploads carry no uploadId; the materialized object
            // itself is the evidence, so only part uploads are indexed.
            if let (Some(upload_id), Some(part_number)) = (upload_id, part_number) {
                evidence
                    .parts
                    .entry(key)
                    .or_default()
                    .entry(upload_id)
                    .or_default()
                    .insert(part_number, part.etag.trim_matches('"').to_string());
            }
        }
        evidence
    }

    /// The session with the most evidenced parts for this key, if any.
    fn session_for(&self, key: &str) -> Option<(&str, &BTreeMap<u32, String>)> {
        self.parts.get(key).and_then(|sessions| {
            sessions
                .iter()
                .max_by_key(|(_, parts)| parts.len())
                .map(|(id, parts)| (id.as_str(), parts))
        })
    }
}

/// Extract the blob key from a presigned URL path.
///
/// Presigned URLs are not byte-stable across requests (signatures differ),
/// but the object key inside the path is. Path-style S3 URLs prepend
/// bucket and prefix, so the key is everything from the last `blobs/`
/// segment onward.
fn blob_key_from_path(path: &str) -> Option<String> {
    path.rmatch_indices("blobs/")
        .find(|(idx, _)| *idx == 0 || path.as_bytes()[idx - 1] == b'/')
        .map(|(idx, _)| path[idx..].to_string())
}

/// Stateless push coordinator.
pub struct Coordinator {
    storage: Arc<dyn StorageAdapter>,
    chunk_size: u64,
    presign_expiry: Duration,
}

impl Coordinator {
    pub fn new(storage: Arc<dyn StorageAdapter>, chunk_size: u64, presign_expiry: Duration) -> Self {
        Self {
            storage,
            chunk_size,
            presign_expiry,
        }
    }

    /// Reconcile one push round.
    ///
    /// Returns the requirements the client must still satisfy. When the
    /// returned set is empty the manifest has been committed under the
    /// reference's manifest key.
    pub async fn push(
        &self,
        reference: &Reference,
        manifest_bytes: &[u8],
        uploaded: &[CompletePart],
    ) -> ApiResult<Vec<Requirement>> {
        let manifest = Manifest::from_slice(manifest_bytes)?;
        let evidence = UploadEvidence::from_uploaded(uploaded);

        let mut requirements = Vec::new();
        for layer in &manifest.layers {
            let layer_reqs = self.reconcile_layer(layer, &evidence).await?;
            requirements.extend(layer_reqs);
        }

        if requirements.is_empty() {
            self.storage
                .put(&reference.manifest_key(), bytes::Bytes::copy_from_slice(manifest_bytes))
                .await?;
            tracing::info!(reference = %reference, layers = manifest.layers.len(), "manifest committed");
        } else {
            tracing::debug!(
                reference = %reference,
                outstanding = requirements.len(),
                "push incomplete"
            );
        }

        Ok(requirements)
    }

    /// Reconcile a single layer, returning the ranges still required for it.
    async fn reconcile_layer(
        &self,
        layer: &stevedore_core::Layer,
        evidence: &UploadEvidence,
    ) -> ApiResult<Vec<Requirement>> {
        let key = blob_key(&layer.digest);

        match self.storage.stat(&key).await {
            Ok(meta) => {
                if meta.size != layer.size {
                    return Err(ApiError::Core(stevedore_core::Error::SizeMismatch {
                        digest: layer.digest.clone(),
                        expected: layer.size,
                        actual: meta.size,
                    }));
                }
                crate::metrics::LAYERS_DEDUPLICATED.inc();
                return Ok(Vec::new());
            }
            Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let plan = Chunks::new(layer.size, self.chunk_size);

        // A single-chunk layer goes through a plain presigned PUT that
        // materializes the object directly, no multipart session needed.
        if plan.num_chunks() == 1 {
            let url = self.storage.presign_put(&key, self.presign_expiry).await?;
            return Ok(vec![Requirement {
                url,
                offset: 0,
                size: layer.size,
            }]);
        }

        let (upload_id, evidenced) = match evidence.session_for(&key) {
            Some((id, parts)) => (id.to_string(), parts.clone()),
            None => (
                self.storage.create_multipart(&key).await?,
                BTreeMap::new(),
            ),
        };

        let missing: Vec<_> = plan
            .clone()
            .filter(|chunk| !evidenced.contains_key(&chunk.part_number))
            .collect();

        if missing.is_empty() {
            let parts: Vec<PartEtag> = plan
                .map(|chunk| PartEtag {
                    part_number: chunk.part_number,
                    // contains_key above guarantees presence
                    etag: evidenced[&chunk.part_number].clone(),
                })
                .collect();
            self.storage
                .complete_multipart(&key, &upload_id, &parts)
                .await?;

            let meta = self.storage.stat(&key).await?;
            if meta.size != layer.size {
                return Err(ApiError::Core(stevedore_core::Error::SizeMismatch {
                    digest: layer.digest.clone(),
                    expected: layer.size,
                    actual: meta.size,
                }));
            }
            return Ok(Vec::new());
        }

        let mut requirements = Vec::with_capacity(missing.len());
        for chunk in missing {
            let url = self
                .storage
                .presign_part(&key, &upload_id, chunk.part_number, self.presign_expiry)
                .await?;
            requirements.push(Requirement {
                url,
                offset: chunk.offset,
                size: chunk.size,
            });
        }
        Ok(requirements)
    }
}
