//! Conversation orchestration.
//!
//! - `orchestrator`: [`SupportDeskServer`], one streamed assistant turn per user message
//! - `protocol`: the JSON request protocol of the chat endpoint
//! - `tools`: ticketing tools offered to the assistant
//! - `context`: per-turn channel tools use to publish events and widgets
//! - `events`: the streamed event model
//! - `citations`: knowledge-base citations of assistant messages

pub mod citations;
pub mod context;
pub mod errors;
pub mod events;
pub mod orchestrator;
pub mod protocol;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use citations::{Citation, extract_citations};
pub use context::AgentContext;
pub use errors::{AgentError, AgentResult, ProtocolError, ToolError};
pub use events::{ItemUpdate, ThreadStreamEvent};
pub use orchestrator::{EventStream, SupportDeskServer};
pub use protocol::{ChatRequest, ProcessResult, process};
pub use tools::{ToolSettings, Toolbox};
