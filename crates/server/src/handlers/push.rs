//! Push endpoint handler.

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use stevedore_core::{PushRequest, PushResponse};

/// POST /v1/push - reconcile a push round.
pub async fn push(
    State(state): State<AppState>,
    Json(request): Json<PushRequest>,
) -> ApiResult<Json<PushResponse>> {
    metrics::PUSH_REQUESTS.inc();
    let timer = metrics::PUSH_DURATION.start_timer();

    let requirements = state
        .coordinator
        .push(&request.reference, &request.manifest, &request.uploaded)
        .await?;

    timer.observe_duration();
    if requirements.is_empty() {
        metrics::PUSHES_COMPLETED.inc();
    } else {
        metrics::REQUIREMENTS_ISSUED.inc_by(requirements.len() as u64);
    }

    Ok(Json(PushResponse { requirements }))
}
