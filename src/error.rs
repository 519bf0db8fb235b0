//! Error types for the InboxAI client

use thiserror::Error;

/// Result type alias for InboxAI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the InboxAI client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend answered with a non-success status or unusable body
    #[error("backend error: {0}")]
    Backend(String),

    /// Text-to-speech engine error
    #[error("speech error: {0}")]
    Speech(String),

    /// Speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Preference store error
    #[error("store error: {0}")]
    Store(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
