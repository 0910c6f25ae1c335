//! Chunk upload primitive: one PUT against a presigned URL.

use crate::error::{ClientError, ClientResult};
use crate::source::{read_range, ReadAt};
use stevedore_core::ErrorResponse;

/// PUT the `[offset, offset + size)` range of `source` to a presigned URL.
///
/// Returns the ETag the store assigned to the bytes, with any surrounding
/// quotes stripped, for echoing back to the server as upload evidence.
pub async fn push_layer(
    http: &reqwest::Client,
    url: &str,
    offset: u64,
    size: u64,
    source: &dyn ReadAt,
) -> ClientResult<String> {
    let body = read_range(source, offset, size)?;

    let mut request = http
        .put(url)
        .header(reqwest::header::CONTENT_TYPE, "text/plain")
        .header(reqwest::header::CONTENT_LENGTH, size);
    if size > 0 {
        request = request.header(
            "x-amz-copy-source-range",
            format!("bytes={}-{}", offset, offset + size - 1),
        );
    }

    let response = request.body(body).send().await?;
    let status = response.status();

    if status != reqwest::StatusCode::OK {
        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(err) => (err.code, err.message),
            Err(_) => ("unknown".to_string(), text),
        };
        return Err(ClientError::Storage {
            status: status.as_u16(),
            url: url.to_string(),
            code,
            message,
        });
    }

    let etag = response
        .headers()
        .get(reqwest::header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_matches('"').to_string())
        .ok_or_else(|| ClientError::MissingEtag(url.to_string()))?;

    Ok(etag)
}
