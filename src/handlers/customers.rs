use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::directory::AdminDirectory;
use crate::services::invites::{InviteError, InviteFlow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring over company name and email.
    pub q: Option<String>,
}

/// GET /api/customers - directory of customer profiles, newest first.
/// Admin-gated by middleware.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Value> {
    let profiles = AdminDirectory::list(state.platform.as_ref(), query.q.as_deref()).await?;
    Ok(ApiResponse::success(json!({ "profiles": profiles })))
}

/// GET /api/customers/:id - one customer with their documents.
pub async fn detail(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    let (profile, documents) = AdminDirectory::detail(state.platform.as_ref(), id).await?;
    Ok(ApiResponse::success(json!({
        "profile": profile,
        "documents": documents,
    })))
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,
}

/// POST /api/customers/invite - create a pending auth user and mail the
/// invitation link.
pub async fn invite(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<InviteRequest>,
) -> ApiResult<Value> {
    let message = InviteFlow::invite(state.platform.as_ref(), &payload.email)
        .await
        .map_err(|e| match e {
            InviteError::EmptyEmail => ApiError::validation_error("Email is required"),
            // The admin sees the platform's own message verbatim
            InviteError::Platform(e) => ApiError::upstream_failure(e.to_string()),
        })?;

    Ok(ApiResponse::success(json!({ "message": message })))
}
