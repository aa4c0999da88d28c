//! Configuration management for the jukebot player service
//!
//! Bootstrap settings come from a TOML file; the port can additionally be
//! overridden on the command line or environment (see main.rs). All session
//! state is in-memory, so there is no second configuration tier.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The application must
/// restart to pick up changes to the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds a session may sit with an empty queue before eviction
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Maximum number of track ids kept in play history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Search used when autoplay runs out of related candidates
    #[serde(default = "default_fallback_query")]
    pub autoplay_fallback_query: String,

    /// Event broadcast channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Media extractor program name or path
    #[serde(default = "default_resolver_program")]
    pub resolver_program: String,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_port() -> u16 {
    5740
}

fn default_idle_timeout_secs() -> u64 {
    300 // 5-minute empty-queue eviction
}

fn default_history_limit() -> usize {
    100
}

fn default_fallback_query() -> String {
    "popular music".to_string()
}

fn default_event_capacity() -> usize {
    100
}

fn default_resolver_program() -> String {
    "yt-dlp".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            idle_timeout_secs: default_idle_timeout_secs(),
            history_limit: default_history_limit(),
            autoplay_fallback_query: default_fallback_query(),
            event_capacity: default_event_capacity(),
            resolver_program: default_resolver_program(),
            logging: LoggingConfig {
                level: default_log_level(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error: built-in defaults apply so the
    /// service starts with zero setup. A file that exists but does not
    /// parse is a hard error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Idle-eviction timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
