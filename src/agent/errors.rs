//! Error types for the orchestrator, its tools and the request protocol.

use thiserror::Error;

use crate::desk::DeskError;
use crate::llm::LlmError;
use crate::store::StoreError;

/// Malformed or inapplicable client requests.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A client tool output arrived but no call is waiting for it.
    #[error("no pending client tool call in thread {0}")]
    NoPendingToolCall(String),
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Store failure (unknown thread, item or attachment).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Text-generation failure.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Bad client request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Attachments cannot be turned into model input.
    #[error("file attachments are not supported (attachment {0})")]
    UnsupportedAttachment(String),
}

/// Convenience result alias for orchestrator calls.
pub type AgentResult<T> = Result<T, AgentError>;

/// Failures inside a tool call; reported to the model, never raised.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Ticketing system failure.
    #[error(transparent)]
    Desk(#[from] DeskError),

    /// Widget could not be stored.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tool arguments do not match the tool's schema.
    #[error("invalid arguments: {0}")]
    Arguments(#[from] serde_json::Error),
}
