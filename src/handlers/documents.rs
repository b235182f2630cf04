use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::documents::{DocumentLifecycle, DEFAULT_URL_TTL_SECS};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    /// Signed URL lifetime override, seconds.
    pub ttl: Option<u32>,
}

/// POST /api/documents/:id/download-url - issue a time-limited signed URL
/// for the document's stored object.
pub async fn download_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<axum::Json<DownloadRequest>>,
) -> ApiResult<Value> {
    let ttl = payload
        .and_then(|axum::Json(body)| body.ttl)
        .unwrap_or(DEFAULT_URL_TTL_SECS);

    let url = DocumentLifecycle::issue_download_url(state.platform.as_ref(), id, ttl).await?;
    Ok(ApiResponse::success(json!({
        "signed_url": url,
        "expires_in": ttl,
    })))
}

/// DELETE /api/documents/:id - remove the storage object, then the row.
/// A storage failure aborts before the row is touched.
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    DocumentLifecycle::delete(state.platform.as_ref(), id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}
