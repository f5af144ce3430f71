//! Error types for the ticketing client.

use thiserror::Error;

/// Errors that can occur while talking to the ticketing system.
#[derive(Debug, Error)]
pub enum DeskError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("ticketing API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The OAuth token exchange did not yield an access token.
    #[error("token refresh failed: {0}")]
    Auth(String),

    /// Credentials or endpoints are missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Convenience result alias for ticketing calls.
pub type DeskResult<T> = Result<T, DeskError>;
