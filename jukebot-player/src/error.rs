//! Error types for jukebot-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Resolution and playback failures are per-item: the session
//! loop reports them and keeps running.

use thiserror::Error;

/// Main error type for the jukebot-player service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Query or URL produced no usable track
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// Playback sink reported an error
    #[error("Playback error: {0}")]
    Playback(String),

    /// Command issued against a session with no active playback connection
    #[error("No active playback connection")]
    NotConnected,

    /// Volume outside the accepted 1-100 range
    #[error("Volume must be between 1 and 100 (got {0})")]
    VolumeOutOfRange(i64),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the jukebot-player Error
pub type Result<T> = std::result::Result<T, Error>;
