//! Error types for the Findastro client
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Error raised by a backend request
///
/// Distinguishes transport-level failures (connection errors, timeouts)
/// from non-2xx responses. Non-2xx responses carry the HTTP status and a
/// message extracted from the backend's structured `detail` field when
/// present, otherwise a generic fallback.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network failure or timeout before a response was received
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend responded with a non-2xx status
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code of the response
        status: u16,
        /// Message extracted from the response body, or a generic fallback
        message: String,
    },

    /// Response body could not be decoded as the expected shape
    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The message to show the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) if e.is_timeout() => {
                "The service took too long to respond. Please try again.".to_string()
            }
            Self::Transport(_) => "Could not reach the service. Please try again.".to_string(),
            Self::Status { message, .. } => message.clone(),
            Self::Decode(_) => "Received an unexpected response from the service.".to_string(),
        }
    }
}

/// Main error type for Findastro client operations
///
/// This enum encompasses all possible errors that can occur during
/// login, chat sessions, wallet queries, admin operations, and
/// configuration loading.
#[derive(Error, Debug)]
pub enum FindastroError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input caught before any network call
    #[error("{0}")]
    Validation(String),

    /// Backend request errors
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Session store errors (reading or writing persisted identity)
    #[error("Session store error: {0}")]
    Store(String),

    /// The operation requires a logged-in identity but none is stored
    #[error("Not logged in. Run `findastro login` first.")]
    NotLoggedIn,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Findastro client operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
