//! Search index error types.

use thiserror::Error;

/// Errors from remote index operations.
///
/// Every variant is fatal for a synchronization run: there is no retry and no
/// partial-result persistence.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Invalid input detected before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The service could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The service answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The service answered with a body we could not understand.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A request body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Transport failure reported by the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl IndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an API error.
    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
