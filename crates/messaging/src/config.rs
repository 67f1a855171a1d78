//! Messaging configuration

use std::env;
use std::time::Duration;

/// Messaging configuration loaded from environment variables
///
/// Every variable has a sensible default so a bare environment still
/// produces a working local configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST collaborator, e.g. `https://api.roamly.example`
    pub api_base_url: String,
    /// Push channel endpoint, e.g. `wss://api.roamly.example/socket`
    pub socket_url: String,
    /// Timeout applied to every REST request
    pub request_timeout_ms: u64,
    /// Ceiling on consecutive failed connection attempts
    pub reconnect_max_attempts: u32,
    /// Fixed delay between connection attempts (no backoff, no jitter)
    pub reconnect_delay_ms: u64,
    /// Quiet period after which a typing indicator auto-stops
    pub typing_quiet_period_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: env::var("ROAMLY_API_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            socket_url: env::var("ROAMLY_SOCKET_URL")
                .unwrap_or_else(|_| "ws://localhost:4000/socket".to_string()),
            request_timeout_ms: parse_var("ROAMLY_REQUEST_TIMEOUT_MS", 10_000)?,
            reconnect_max_attempts: parse_var("ROAMLY_RECONNECT_ATTEMPTS", 3)?,
            reconnect_delay_ms: parse_var("ROAMLY_RECONNECT_DELAY_MS", 2_000)?,
            typing_quiet_period_ms: parse_var("ROAMLY_TYPING_QUIET_MS", 3_000)?,
        })
    }

    /// Load `.env` (if present) and then the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn typing_quiet_period(&self) -> Duration {
        Duration::from_millis(self.typing_quiet_period_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000".to_string(),
            socket_url: "ws://localhost:4000/socket".to_string(),
            request_timeout_ms: 10_000,
            reconnect_max_attempts: 3,
            reconnect_delay_ms: 2_000,
            typing_quiet_period_ms: 3_000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
