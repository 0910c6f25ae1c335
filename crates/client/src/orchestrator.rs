//! Push orchestration: drive the server until the manifest commits.

use crate::api_client::Client;
use crate::backoff::Backoff;
use crate::error::{ClientError, ClientResult};
use crate::layer::push_layer;
use crate::source::ReadAt;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use stevedore_core::{CompletePart, PushParams, Reference, Requirement};
use tokio_util::sync::CancellationToken;

/// Provides layer content by digest.
pub trait LayerSource: Send + Sync {
    fn layer(&self, digest: &str) -> io::Result<Arc<dyn ReadAt>>;
}

/// Layer source backed by in-memory buffers.
#[derive(Default)]
pub struct MemorySource {
    layers: HashMap<String, Arc<dyn ReadAt>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, digest: &str, data: impl Into<bytes::Bytes>) {
        self.layers.insert(digest.to_string(), Arc::new(data.into()));
    }
}

impl LayerSource for MemorySource {
    fn layer(&self, digest: &str) -> io::Result<Arc<dyn ReadAt>> {
        self.layers.get(digest).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no layer for {digest}"))
        })
    }
}

/// Extract the layer digest from a presigned requirement URL.
///
/// Presigned URLs differ per round (fresh signatures), but the blob key in
/// the path is stable: the digest is the path segment after the last
/// `blobs/`.
pub fn digest_from_url(url: &str) -> ClientResult<String> {
    let parsed = url::Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
    let path = parsed.path();
    path.rmatch_indices("blobs/")
        .find(|(idx, _)| *idx == 0 || path.as_bytes()[idx - 1] == b'/')
        .map(|(idx, _)| path[idx + "blobs/".len()..].to_string())
        .filter(|digest| !digest.is_empty() && !digest.contains('/'))
        .ok_or_else(|| ClientError::InvalidUrl(format!("no blob key in {url}")))
}

/// Tuning knobs for [`push_until_complete`].
#[derive(Clone, Debug)]
pub struct PushOptions {
    /// Maximum concurrent chunk uploads.
    pub parallelism: usize,
    /// Backoff cap for retrying failed chunk uploads.
    pub retry_cap: Duration,
    /// Rounds without shrinking requirements before giving up.
    pub max_stalled_rounds: usize,
}

impl Default for PushOptions {
    fn default() -> Self {
        PushOptions {
            parallelism: 8,
            retry_cap: Duration::from_secs(5),
            max_stalled_rounds: 3,
        }
    }
}

/// Upload one requirement, retrying transient failures with backoff.
async fn satisfy_requirement(
    http: &reqwest::Client,
    cancel: &CancellationToken,
    req: &Requirement,
    source: &dyn ReadAt,
    retry_cap: Duration,
) -> ClientResult<CompletePart> {
    let mut backoff = Backoff::up_to(retry_cap);
    loop {
        backoff.wait(cancel).await?;
        match push_layer(http, &req.url, req.offset, req.size, source).await {
            Ok(etag) => {
                return Ok(CompletePart {
                    url: req.url.clone(),
                    etag,
                })
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(url = %req.url, error = %e, "chunk upload failed, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Drive push rounds until the server reports no outstanding requirements.
///
/// Evidence from completed part uploads accumulates across rounds so the
/// server can finish multipart sessions it never saw complete. A round that
/// fails partway resubmits with whatever evidence it gathered; requirements
/// must shrink within `max_stalled_rounds` or the push aborts.
pub async fn push_until_complete(
    client: &Client,
    cancel: &CancellationToken,
    reference: &Reference,
    manifest: &[u8],
    layers: &dyn LayerSource,
    options: &PushOptions,
) -> ClientResult<()> {
    let mut uploaded: Vec<CompletePart> = Vec::new();
    let mut previous_outstanding = usize::MAX;
    let mut stalled_rounds = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ClientError::Canceled);
        }

        let params = PushParams {
            uploaded: uploaded.clone(),
        };
        let requirements = client.push(reference, manifest, Some(&params)).await?;
        if requirements.is_empty() {
            tracing::info!(reference = %reference, "push complete");
            return Ok(());
        }

        if requirements.len() >= previous_outstanding {
            stalled_rounds += 1;
            if stalled_rounds >= options.max_stalled_rounds {
                return Err(ClientError::NoProgress(requirements.len()));
            }
        } else {
            stalled_rounds = 0;
        }
        previous_outstanding = requirements.len();

        tracing::debug!(
            reference = %reference,
            outstanding = requirements.len(),
            "uploading required ranges"
        );

        let results: Vec<ClientResult<CompletePart>> = stream::iter(requirements.iter())
            .map(|req| async {
                let digest = digest_from_url(&req.url)?;
                let source = layers.layer(&digest)?;
                satisfy_requirement(client.http(), cancel, req, &source, options.retry_cap).await
            })
            .buffer_unordered(options.parallelism)
            .collect()
            .await;

        for result in results {
            uploaded.push(result?);
        }
    }
}
