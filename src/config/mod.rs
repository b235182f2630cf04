use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub platform: PlatformConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

/// Connection settings for the hosted backend platform. The anon key is
/// used for calls made on behalf of the caller's own token; the service
/// role key is used for privileged server-side calls (invites, signed
/// URLs, row access behind the admin gate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub base_url: String,
    pub anon_key: String,
    pub service_role_key: String,
    /// HS256 secret the platform signs access tokens with. Lets the
    /// portal verify bearer tokens locally instead of round-tripping.
    pub jwt_secret: String,
    /// Where the password-recovery mail sends the user back to.
    pub reset_redirect_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub heartbeat_secs: u64,
    /// How long to wait for the platform to confirm a subscription before
    /// an open() attempt is abandoned.
    pub subscribe_timeout_secs: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_max_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging =
                v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Platform overrides
        if let Ok(v) = env::var("PLATFORM_URL") {
            self.platform.base_url = v;
        }
        if let Ok(v) = env::var("PLATFORM_ANON_KEY") {
            self.platform.anon_key = v;
        }
        if let Ok(v) = env::var("PLATFORM_SERVICE_ROLE_KEY") {
            self.platform.service_role_key = v;
        }
        if let Ok(v) = env::var("PLATFORM_JWT_SECRET") {
            self.platform.jwt_secret = v;
        }
        if let Ok(v) = env::var("PLATFORM_RESET_REDIRECT_URL") {
            self.platform.reset_redirect_url = v;
        }

        // Realtime overrides
        if let Ok(v) = env::var("REALTIME_HEARTBEAT_SECS") {
            self.realtime.heartbeat_secs = v.parse().unwrap_or(self.realtime.heartbeat_secs);
        }
        if let Ok(v) = env::var("REALTIME_SUBSCRIBE_TIMEOUT_SECS") {
            self.realtime.subscribe_timeout_secs =
                v.parse().unwrap_or(self.realtime.subscribe_timeout_secs);
        }
        if let Ok(v) = env::var("REALTIME_RECONNECT_BASE_MS") {
            self.realtime.reconnect_base_ms =
                v.parse().unwrap_or(self.realtime.reconnect_base_ms);
        }
        if let Ok(v) = env::var("REALTIME_RECONNECT_MAX_SECS") {
            self.realtime.reconnect_max_secs =
                v.parse().unwrap_or(self.realtime.reconnect_max_secs);
        }

        self
    }

    fn base_platform() -> PlatformConfig {
        PlatformConfig {
            base_url: "http://127.0.0.1:54321".to_string(),
            anon_key: String::new(),
            service_role_key: String::new(),
            jwt_secret: String::new(),
            reset_redirect_url: "http://localhost:3000/reset-password".to_string(),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                enable_request_logging: true,
            },
            platform: Self::base_platform(),
            realtime: RealtimeConfig {
                heartbeat_secs: 25,
                subscribe_timeout_secs: 10,
                reconnect_base_ms: 250,
                reconnect_max_secs: 30,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                enable_request_logging: true,
            },
            platform: Self::base_platform(),
            realtime: RealtimeConfig {
                heartbeat_secs: 25,
                subscribe_timeout_secs: 10,
                reconnect_base_ms: 250,
                reconnect_max_secs: 30,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                enable_request_logging: false,
            },
            platform: Self::base_platform(),
            realtime: RealtimeConfig {
                heartbeat_secs: 25,
                subscribe_timeout_secs: 5,
                reconnect_base_ms: 250,
                reconnect_max_secs: 30,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 3000);
        assert!(config.server.enable_request_logging);
        assert_eq!(config.realtime.reconnect_base_ms, 250);
    }

    #[test]
    fn production_disables_request_logging() {
        let config = AppConfig::production();
        assert!(!config.server.enable_request_logging);
        assert_eq!(config.realtime.subscribe_timeout_secs, 5);
    }
}
