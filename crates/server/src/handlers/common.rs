//! Health and observability handlers.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}

/// GET /v1/health - liveness probe.
///
/// Intentionally unauthenticated for load balancers and k8s probes.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.storage.backend_name(),
    })
}

#[derive(Debug, Serialize)]
pub struct UploadSession {
    pub key: String,
    pub upload_id: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub initiated: Option<time::OffsetDateTime>,
}

#[derive(Debug, Serialize)]
pub struct ListUploadsResponse {
    pub uploads: Vec<UploadSession>,
}

/// GET /v1/uploads - list in-flight multipart sessions.
///
/// Abandoned pushes leave multipart sessions behind until the store's
/// lifecycle rules reap them; this endpoint makes them visible.
pub async fn list_uploads(State(state): State<AppState>) -> ApiResult<Json<ListUploadsResponse>> {
    let uploads = state
        .storage
        .list_multipart("blobs/")
        .await?
        .into_iter()
        .map(|info| UploadSession {
            key: info.key,
            upload_id: info.upload_id,
            initiated: info.initiated,
        })
        .collect();
    Ok(Json(ListUploadsResponse { uploads }))
}
