//! Error types for knowledge-base file management.

use thiserror::Error;

/// Errors raised while managing knowledge-base files.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("files API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A required setting is absent.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// A response body is not the expected JSON.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A batch exceeds the upload limit.
    #[error("Too many files. Maximum is {max}, received {count}.")]
    TooManyFiles {
        /// Files received.
        count: usize,
        /// Allowed maximum.
        max: usize,
    },
}

/// Convenience result alias for knowledge-base calls.
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;
