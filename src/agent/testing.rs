//! Scripted collaborators for orchestrator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::desk::{DeskError, DeskFuture, DeskResult, TicketDesk, TicketFilter};
use crate::llm::{AgentEvent, AgentEventStream, AgentSpec, LlmError, LlmResult, RunFuture, Runner, ToolHandler};

/// One step of a scripted streamed run.
#[derive(Debug, Clone)]
pub enum Step {
    Event(AgentEvent),
    Tool { name: String, arguments: Value },
    Fail(String),
}

/// Runner replaying scripted turns and canned replies.
#[derive(Default)]
pub struct ScriptedRunner {
    turns: Mutex<VecDeque<Vec<Step>>>,
    replies: Mutex<HashMap<String, String>>,
    pub streamed: Mutex<Vec<(String, Option<String>)>>,
    pub runs: Mutex<Vec<(String, String)>>,
    pub tool_outputs: Arc<Mutex<Vec<Value>>>,
}

impl ScriptedRunner {
    pub fn with_turn(self, steps: Vec<Step>) -> Self {
        self.turns.lock().unwrap().push_back(steps);
        self
    }

    pub fn with_reply(self, agent_name: &str, reply: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(agent_name.to_string(), reply.to_string());
        self
    }
}

pub fn text_turn(item_id: &str, parts: &[&str], response_id: &str) -> Vec<Step> {
    let mut steps: Vec<Step> = parts
        .iter()
        .map(|delta| {
            Step::Event(AgentEvent::TextDelta {
                item_id: item_id.to_string(),
                delta: (*delta).to_string(),
            })
        })
        .collect();
    steps.push(Step::Event(AgentEvent::MessageDone {
        item_id: item_id.to_string(),
        text: parts.concat(),
        annotations: Vec::new(),
    }));
    steps.push(Step::Event(AgentEvent::Completed {
        response_id: response_id.to_string(),
    }));
    steps
}

impl Runner for ScriptedRunner {
    fn run_streamed(
        &self,
        _agent: &AgentSpec,
        input: &str,
        tools: Arc<dyn ToolHandler>,
        previous_response_id: Option<&str>,
    ) -> AgentEventStream {
        self.streamed
            .lock()
            .unwrap()
            .push((input.to_string(), previous_response_id.map(str::to_string)));
        let steps = self.turns.lock().unwrap().pop_front().unwrap_or_default();
        let outputs = Arc::clone(&self.tool_outputs);

        Box::pin(async_stream::stream! {
            for step in steps {
                match step {
                    Step::Event(event) => yield Ok(event),
                    Step::Tool { name, arguments } => {
                        let output = tools.call(&name, arguments).await;
                        outputs.lock().unwrap().push(output);
                    }
                    Step::Fail(message) => yield Err(LlmError::RunFailed(message)),
                }
            }
        })
    }

    fn run(&self, agent: &AgentSpec, input: &str) -> RunFuture<'_, LlmResult<String>> {
        self.runs
            .lock()
            .unwrap()
            .push((agent.name.clone(), input.to_string()));
        let reply = self.replies.lock().unwrap().get(&agent.name).cloned();
        Box::pin(async move { reply.ok_or(LlmError::EmptyOutput) })
    }
}

/// Ticketing system holding one ticket.
#[derive(Default)]
pub struct FakeDesk {
    pub ticket: Option<Value>,
    pub conversations: Vec<Value>,
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeDesk {
    fn record(&self, call: String) -> DeskResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(DeskError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl TicketDesk for FakeDesk {
    fn latest_ticket(&self, filter: &TicketFilter) -> DeskFuture<'_, DeskResult<Option<Value>>> {
        let result = self
            .record(format!("latest:{}", filter.search_term().unwrap_or("")))
            .map(|()| self.ticket.clone());
        Box::pin(async move { result })
    }

    fn ticket_conversations(&self, ticket_id: &str) -> DeskFuture<'_, DeskResult<Vec<Value>>> {
        let result = self
            .record(format!("conversations:{ticket_id}"))
            .map(|()| self.conversations.clone());
        Box::pin(async move { result })
    }

    fn create_draft_reply(
        &self,
        ticket_id: &str,
        content: &str,
        from_email: &str,
    ) -> DeskFuture<'_, DeskResult<Value>> {
        let result = self
            .record(format!("draft:{ticket_id}:{from_email}:{content}"))
            .map(|()| json!({"id": "draft_1"}));
        Box::pin(async move { result })
    }

    fn add_private_note(&self, ticket_id: &str, content: &str) -> DeskFuture<'_, DeskResult<Value>> {
        let result = self
            .record(format!("note:{ticket_id}:{content}"))
            .map(|()| json!({"id": "comment_1"}));
        Box::pin(async move { result })
    }
}
