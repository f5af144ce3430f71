//! Text-generation collaborator.
//!
//! - `runner`: the [`Runner`] / [`ToolHandler`] traits and streamed events
//! - `agents`: assistant, title and snippet agent definitions
//! - `openai_responses`: Responses API implementation with a tool-call loop
//! - `sse`: line-buffered SSE parsing for streamed bodies

pub mod agents;
pub mod errors;
pub mod openai_responses;
pub mod runner;
pub mod sse;

pub use agents::{AgentSpec, Agents};
pub use errors::{LlmError, LlmResult};
pub use openai_responses::OpenAiRunner;
pub use runner::{AgentEvent, AgentEventStream, NoTools, RunFuture, Runner, ToolDefinition, ToolHandler};
