//! Agent runner abstraction.
//!
//! A [`Runner`] executes an [`AgentSpec`] against a model, either streamed (one
//! conversation turn, with tool calls dispatched to a [`ToolHandler`]) or as a single
//! request returning the final text.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::llm::agents::AgentSpec;
use crate::llm::errors::LlmResult;
use crate::store::Annotation;

/// Boxed future returned by runner and tool methods.
pub type RunFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Stream of events produced by one streamed run.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = LlmResult<AgentEvent>> + Send>>;

/// Event emitted while an agent answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A fragment of assistant text.
    TextDelta {
        /// Provider id of the message being written.
        item_id: String,
        /// Text fragment.
        delta: String,
    },
    /// A message is complete.
    MessageDone {
        /// Provider id of the message.
        item_id: String,
        /// Full message text.
        text: String,
        /// Citations attached to the text.
        annotations: Vec<Annotation>,
    },
    /// The run finished; `response_id` continues the conversation next turn.
    Completed {
        /// Continuation token.
        response_id: String,
    },
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolDefinition {
    /// A function executed locally by a [`ToolHandler`].
    Function {
        /// Tool name.
        name: String,
        /// What the tool does, for the model.
        description: String,
        /// JSON schema of the arguments.
        parameters: Value,
    },
    /// Hosted search over vector stores.
    FileSearch {
        /// Vector stores to search.
        vector_store_ids: Vec<String>,
        /// Result cap per search.
        max_num_results: u32,
    },
}

impl ToolDefinition {
    /// Function tool helper.
    #[must_use]
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self::Function {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Request representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Function {
                name,
                description,
                parameters,
            } => json!({
                "type": "function",
                "name": name,
                "description": description,
                "parameters": parameters,
                "strict": false,
            }),
            Self::FileSearch {
                vector_store_ids,
                max_num_results,
            } => json!({
                "type": "file_search",
                "vector_store_ids": vector_store_ids,
                "max_num_results": max_num_results,
            }),
        }
    }
}

/// Executes the function tools of one turn.
pub trait ToolHandler: Send + Sync {
    /// Tools offered to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run tool `name`. Failures are reported inside the returned JSON.
    fn call(&self, name: &str, arguments: Value) -> RunFuture<'_, Value>;
}

/// Handler offering no tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

impl ToolHandler for NoTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    fn call(&self, name: &str, _arguments: Value) -> RunFuture<'_, Value> {
        let message = format!("Unknown tool: {name}");
        Box::pin(async move { json!({ "success": false, "message": message }) })
    }
}

/// Runs agents against a model.
pub trait Runner: Send + Sync {
    /// Stream one turn. Dropping the stream abandons the run.
    fn run_streamed(
        &self,
        agent: &AgentSpec,
        input: &str,
        tools: Arc<dyn ToolHandler>,
        previous_response_id: Option<&str>,
    ) -> AgentEventStream;

    /// Run without streaming or tools and return the final text.
    fn run(&self, agent: &AgentSpec, input: &str) -> RunFuture<'_, LlmResult<String>>;
}
