use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Principal;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, BearerToken};
use crate::state::AppState;

/// GET /api/auth/whoami - the principal behind the bearer token plus its
/// profile row, if one exists yet.
pub async fn whoami(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let profile = state
        .platform
        .fetch_profile(principal.id)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiResponse::success(json!({
        "id": principal.id,
        "email": principal.email,
        "profile": profile,
    })))
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

/// PUT /api/profile/password - change the caller's own password through
/// the platform, using the caller's token.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    axum::Json(payload): axum::Json<PasswordChangeRequest>,
) -> ApiResult<Value> {
    if payload.password != payload.confirm {
        return Err(ApiError::validation_error("Passwords do not match"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::validation_error(
            "Password must be at least 6 characters",
        ));
    }

    state
        .platform
        .update_password(&token, &payload.password)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiResponse::success(json!({ "message": "Password updated" })))
}

/// DELETE /api/auth/session - revoke the caller's platform session.
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> ApiResult<Value> {
    state
        .platform
        .sign_out(&token)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::success(json!({ "message": "Signed out" })))
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

/// POST /api/auth/password-reset - public; triggers the platform's
/// recovery mail. Responds identically for known and unknown addresses.
pub async fn password_reset(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<PasswordResetRequest>,
) -> ApiResult<Value> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(ApiError::validation_error("Email is required"));
    }

    state
        .platform
        .send_password_reset(email, &state.reset_redirect_url)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiResponse::success(
        json!({ "message": "Recovery email sent" }),
    ))
}
