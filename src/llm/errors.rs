//! Error types for the text-generation client.

use thiserror::Error;

/// Errors raised while running an agent.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("model API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The model reported a failure mid-stream.
    #[error("model run failed: {0}")]
    RunFailed(String),

    /// The event stream ended without a completed response.
    #[error("stream ended before the response completed")]
    Truncated,

    /// The model kept calling tools past the configured limit.
    #[error("tool call limit of {0} rounds exceeded")]
    ToolRounds(usize),

    /// The model returned no text.
    #[error("model returned no text")]
    EmptyOutput,

    /// Missing or invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result alias for model calls.
pub type LlmResult<T> = Result<T, LlmError>;
