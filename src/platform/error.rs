use thiserror::Error;

/// Failures surfaced by the hosted platform (auth, rows, storage,
/// realtime). Converted to `ApiError` at the handler boundary.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Platform transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Platform returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode platform response: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Write refused by policy: {0}")]
    PolicyRejected(String),

    #[error("Realtime feed error: {0}")]
    Realtime(String),
}

impl PlatformError {
    /// Map an HTTP status and body into the matching variant. PostgREST
    /// and GoTrue both put a human-readable message in the body.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => PlatformError::AuthFailed(message),
            403 => PlatformError::PolicyRejected(message),
            404 => PlatformError::NotFound(message),
            _ => PlatformError::Status { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            PlatformError::from_status(401, "bad token"),
            PlatformError::AuthFailed(_)
        ));
        assert!(matches!(
            PlatformError::from_status(403, "rls"),
            PlatformError::PolicyRejected(_)
        ));
        assert!(matches!(
            PlatformError::from_status(404, "gone"),
            PlatformError::NotFound(_)
        ));
        assert!(matches!(
            PlatformError::from_status(500, "boom"),
            PlatformError::Status { status: 500, .. }
        ));
    }
}
