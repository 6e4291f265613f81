//! Error types for the Sai client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to a Sai server
#[derive(Debug, Error)]
pub enum ClientError {
    /// WebSocket handshake or stream failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The page URL cannot be turned into an endpoint
    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),

    /// The server turned the credentials down
    #[error("Login rejected (status {status})")]
    LoginRejected {
        /// HTTP status code of the login response
        status: u16,
    },

    /// A message could not be encoded
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl ClientError {
    /// Whether reconnecting later might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::WebSocket(_) | Self::Http(_))
    }
}
