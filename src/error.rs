// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError(String),

    // 401 Unauthorized (no resolvable session)
    Unauthorized(String),

    // 403 Forbidden (authenticated, wrong role)
    Forbidden(String),

    // 403 Forbidden (write refused by platform policy)
    Rejected(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (platform store/storage/auth failure)
    UpstreamFailure(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::Rejected(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::UpstreamFailure(_) => 502,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::Rejected(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::UpstreamFailure(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Rejected(_) => "REJECTED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::UpstreamFailure(_) => "UPSTREAM_FAILURE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ApiError::Rejected(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn upstream_failure(message: impl Into<String>) -> Self {
        ApiError::UpstreamFailure(message.into())
    }
}

// Convert collaborator error types to ApiError
impl From<crate::platform::PlatformError> for ApiError {
    fn from(err: crate::platform::PlatformError) -> Self {
        use crate::platform::PlatformError;

        match err {
            PlatformError::NotFound(msg) => ApiError::not_found(msg),
            PlatformError::AuthFailed(msg) => ApiError::unauthorized(msg),
            PlatformError::PolicyRejected(msg) => ApiError::rejected(msg),
            PlatformError::Http(e) => {
                // Don't expose transport internals to clients
                tracing::error!("Platform transport error: {}", e);
                ApiError::upstream_failure("Platform request failed")
            }
            PlatformError::Status { status, message } => {
                tracing::error!("Platform returned {}: {}", status, message);
                ApiError::upstream_failure("Platform request failed")
            }
            PlatformError::Decode(msg) => {
                tracing::error!("Platform response decode error: {}", msg);
                ApiError::upstream_failure("Platform returned an unreadable response")
            }
            PlatformError::Realtime(msg) => {
                tracing::error!("Realtime feed error: {}", msg);
                ApiError::upstream_failure("Realtime feed unavailable")
            }
        }
    }
}

impl From<crate::services::documents::DocumentError> for ApiError {
    fn from(err: crate::services::documents::DocumentError) -> Self {
        use crate::services::documents::DocumentError;

        match err {
            DocumentError::NotFound => ApiError::not_found("Document not found"),
            DocumentError::Platform(e) => e.into(),
        }
    }
}

impl From<crate::services::directory::DirectoryError> for ApiError {
    fn from(err: crate::services::directory::DirectoryError) -> Self {
        use crate::services::directory::DirectoryError;

        match err {
            DirectoryError::NotFound => ApiError::not_found("Customer not found"),
            DirectoryError::Platform(e) => e.into(),
        }
    }
}

impl From<crate::services::notes::NoteChannelError> for ApiError {
    fn from(err: crate::services::notes::NoteChannelError) -> Self {
        use crate::services::notes::NoteChannelError;

        match err {
            NoteChannelError::Unauthenticated => ApiError::unauthorized("No active session"),
            NoteChannelError::EmptyContent => {
                ApiError::validation_error("Note content is required")
            }
            NoteChannelError::Rejected(msg) => ApiError::rejected(msg),
            NoteChannelError::SubscribeTimeout => {
                ApiError::upstream_failure("Realtime subscription was not confirmed in time")
            }
            NoteChannelError::Platform(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::validation_error("x").status_code(), 400);
        assert_eq!(ApiError::unauthorized("x").status_code(), 401);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::rejected("x").status_code(), 403);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::upstream_failure("x").status_code(), 502);
    }

    #[test]
    fn json_body_carries_code_and_message() {
        let body = ApiError::rejected("write refused").to_json();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "REJECTED");
        assert_eq!(body["message"], "write refused");
    }
}
