//! Error types for Cadence.

use thiserror::Error;

use crate::types::TrackId;

/// Result type alias using Cadence's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Cadence.
#[derive(Error, Debug)]
pub enum Error {
    // Catalog errors
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Catalog error: {0}")]
    Catalog(String),

    // Audio errors
    #[error("Audio driver error: {0}")]
    Driver(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Returns true if retrying the same request may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog(_) | Self::Driver(_) | Self::Io(_))
    }
}
