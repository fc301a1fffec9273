//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Default number of lines kept for newly joining subscribers.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Default delay between poll ticks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default chunk size for the backward history scan.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 8080;

/// Tailing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// Number of recent lines retained and replayed on join.
    pub history_capacity: usize,
    /// Delay between poll ticks.
    pub poll_interval_ms: u64,
    /// Bytes read per step when scanning backward at startup.
    pub chunk_size: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl TailConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "tail.history_capacity must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tail.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "tail.chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory served for non-API paths.
    pub web_root: PathBuf,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            web_root: PathBuf::from("web"),
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tail: TailConfig,
    pub server: ServerConfig,
}
