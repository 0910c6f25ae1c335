//! In-process storage gateway.
//!
//! Presigned URLs from the memory backend point here; the gateway forwards
//! PUT bodies into the backend the way a real object store would accept
//! presigned part uploads, answering with an ETag header.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum::Router;
use stevedore_storage::MemoryBackend;

async fn handle(State(backend): State<MemoryBackend>, request: Request<Body>) -> Response {
    if request.method() != Method::PUT {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().unwrap_or("").to_string();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "code": "bad_body",
                    "message": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    match backend.receive_put(&path, &query, bytes) {
        Ok(etag) => (
            StatusCode::OK,
            [(header::ETAG, format!("\"{etag}\""))],
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "code": "gateway_error",
                "message": e.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Router accepting PUTs on any path.
pub fn gateway_router(backend: MemoryBackend) -> Router {
    Router::new().fallback(handle).with_state(backend)
}
