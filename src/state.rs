use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::platform::Platform;

/// Application state shared across all handlers. The platform client is
/// constructed once at startup and passed in explicitly; there is no
/// process-wide client singleton.
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<dyn Platform>,
    pub jwt_secret: String,
    pub reset_redirect_url: String,
    pub subscribe_timeout: Duration,
}

impl AppState {
    pub fn new(platform: Arc<dyn Platform>, config: &AppConfig) -> Self {
        Self {
            platform,
            jwt_secret: config.platform.jwt_secret.clone(),
            reset_redirect_url: config.platform.reset_redirect_url.clone(),
            subscribe_timeout: Duration::from_secs(config.realtime.subscribe_timeout_secs),
        }
    }
}
