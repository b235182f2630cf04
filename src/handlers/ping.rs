use axum::extract::State;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ping::{record_ping, PingOutcome};
use crate::state::AppState;

/// GET|POST /api/ping - idempotent-per-calendar-day heartbeat for
/// external cron triggering. One row per UTC day; a repeat call is 400.
pub async fn ping(State(state): State<AppState>) -> ApiResult<Value> {
    let outcome = record_ping(state.platform.as_ref(), chrono::Utc::now())
        .await
        .map_err(|e| {
            tracing::error!("ping store failure: {}", e);
            ApiError::internal_server_error("Failed to record ping")
        })?;

    match outcome {
        PingOutcome::Pinged => Ok(ApiResponse::success(json!({ "message": "Pinged today" }))),
        PingOutcome::AlreadyPingedToday => {
            Err(ApiError::validation_error("Already pinged today"))
        }
    }
}
