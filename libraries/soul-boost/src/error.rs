//! Error types for the loudness booster

use thiserror::Error;

/// Result type for booster operations
pub type Result<T> = std::result::Result<T, BoostError>;

/// Errors that can occur while setting up or driving the limiter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoostError {
    /// The audio-effects facility has no dynamics processing on this platform
    #[error("Dynamics processing is not supported on this platform")]
    UnsupportedPlatform,

    /// The facility failed to allocate or configure the limiter
    #[error("Failed to initialize limiter: {0}")]
    ResourceInitFailure(String),

    /// The limiter was already released
    #[error("Limiter handle has been released")]
    StaleHandle,

    /// Limiter parameters are out of range
    #[error("Invalid limiter configuration: {0}")]
    InvalidConfig(String),

    /// Settings could not be loaded or failed validation
    #[error("Settings error: {0}")]
    Settings(String),

    /// Buffer length is not a whole number of frames
    #[error("Buffer of {actual} samples is not a multiple of {expected} channels")]
    ChannelMismatch { expected: usize, actual: usize },
}

impl BoostError {
    /// Whether this error only means the operation had nothing to act on
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleHandle)
    }
}

impl From<config::ConfigError> for BoostError {
    fn from(err: config::ConfigError) -> Self {
        Self::Settings(err.to_string())
    }
}
