//! Conversation orchestrator: runs one assistant turn per user message.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashSet;
use futures::{Stream, StreamExt, stream};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agent::citations::{Citation, extract_citations};
use crate::agent::context::AgentContext;
use crate::agent::errors::{AgentError, AgentResult};
use crate::agent::events::{ItemUpdate, ThreadStreamEvent};
use crate::agent::tools::{ToolSettings, Toolbox};
use crate::desk::TicketDesk;
use crate::llm::{AgentEvent, Agents, LlmResult, Runner, ToolHandler};
use crate::store::{
    AssistantMessageContent, AssistantMessageItem, Attachment, ItemIdKind, SortOrder, Thread,
    ThreadItem, ThreadStore, UserMessageItem, new_item_id,
};

/// Items scanned, newest first, when looking for citations.
pub const CITATION_SCAN_LIMIT: usize = 50;

/// Stream of events for one turn.
pub type EventStream = Pin<Box<dyn Stream<Item = AgentResult<ThreadStreamEvent>> + Send>>;

enum Next {
    Tool(ThreadStreamEvent),
    Agent(Option<LlmResult<AgentEvent>>),
}

/// Brokers turns between the chat client, the store and the model.
#[derive(Clone)]
pub struct SupportDeskServer {
    store: Arc<dyn ThreadStore>,
    runner: Arc<dyn Runner>,
    agents: Arc<Agents>,
    toolbox: Arc<Toolbox>,
    titles_in_flight: Arc<DashSet<String>>,
}

impl SupportDeskServer {
    /// Wire the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ThreadStore>,
        runner: Arc<dyn Runner>,
        desk: Arc<dyn TicketDesk>,
        agents: Agents,
        settings: ToolSettings,
    ) -> Self {
        let toolbox = Toolbox::new(desk, Arc::clone(&runner), agents.snippet.clone(), settings);
        Self {
            store,
            runner,
            agents: Arc::new(agents),
            toolbox: Arc::new(toolbox),
            titles_in_flight: Arc::new(DashSet::new()),
        }
    }

    /// The conversation store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn ThreadStore> {
        &self.store
    }

    /// Respond to `item`, the newest item of `thread`.
    ///
    /// Only user messages produce a response, answered from their text parts.
    /// A thread without a title gets one generated in the background.
    ///
    /// # Errors
    /// Reserved for failures raised before streaming starts; the current turn setup has none.
    pub async fn respond(&self, thread: &Thread, item: Option<&ThreadItem>) -> AgentResult<EventStream> {
        let Some(ThreadItem::UserMessage(message)) = item else {
            return Ok(Box::pin(stream::empty()));
        };

        if !message.attachments.is_empty() {
            debug!(
                thread_id = %thread.id,
                attachments = message.attachments.len(),
                "answering the text part only"
            );
        }

        self.spawn_title_update(thread, message);

        let text = message.text();
        if text.is_empty() {
            debug!(thread_id = %thread.id, "message has no text, nothing to answer");
            return Ok(Box::pin(stream::empty()));
        }

        Ok(self.stream_turn(thread, &text))
    }

    fn stream_turn(&self, thread: &Thread, input: &str) -> EventStream {
        let (context, mut tool_events) = AgentContext::new(&thread.id, Arc::clone(&self.store));
        let tools: Arc<dyn ToolHandler> = Arc::new(self.toolbox.for_turn(context));
        let mut agent_events = self.runner.run_streamed(
            &self.agents.assistant,
            input,
            tools,
            thread.previous_response_id(),
        );
        let store = Arc::clone(&self.store);
        let thread_id = thread.id.clone();

        Box::pin(async_stream::stream! {
            // Provider message id -> stored item id.
            let mut messages: HashMap<String, String> = HashMap::new();
            let mut response_id = None;

            loop {
                let next = tokio::select! {
                    biased;
                    Some(event) = tool_events.recv() => Next::Tool(event),
                    event = agent_events.next() => Next::Agent(event),
                };

                match next {
                    Next::Tool(event) => yield Ok(event),
                    Next::Agent(None) => break,
                    Next::Agent(Some(Err(err))) => {
                        warn!(thread_id = %thread_id, error = %err, "assistant run failed");
                        while let Ok(event) = tool_events.try_recv() {
                            yield Ok(event);
                        }
                        yield Err(AgentError::from(err));
                        return;
                    }
                    Next::Agent(Some(Ok(AgentEvent::Completed { response_id: id }))) => {
                        response_id = Some(id);
                    }
                    Next::Agent(Some(Ok(AgentEvent::TextDelta { item_id, delta }))) => {
                        let id = if let Some(id) = messages.get(&item_id) {
                            id.clone()
                        } else {
                            let id = new_item_id(ItemIdKind::Message);
                            messages.insert(item_id, id.clone());
                            yield Ok(ThreadStreamEvent::ItemAdded {
                                item: ThreadItem::AssistantMessage(assistant_message(&id, &thread_id, String::new(), Vec::new())),
                            });
                            id
                        };
                        yield Ok(ThreadStreamEvent::ItemUpdated {
                            item_id: id,
                            update: ItemUpdate::TextDelta { content_index: 0, delta },
                        });
                    }
                    Next::Agent(Some(Ok(AgentEvent::MessageDone { item_id, text, annotations }))) => {
                        let id = messages
                            .remove(&item_id)
                            .unwrap_or_else(|| new_item_id(ItemIdKind::Message));
                        let item = ThreadItem::AssistantMessage(assistant_message(&id, &thread_id, text, annotations));
                        if let Err(err) = store.add_thread_item(&thread_id, &item).await {
                            yield Err(AgentError::from(err));
                            return;
                        }
                        yield Ok(ThreadStreamEvent::ItemDone { item });
                    }
                }
            }

            while let Ok(event) = tool_events.try_recv() {
                yield Ok(event);
            }

            if let Some(id) = response_id {
                let token = id.clone();
                let saved = store
                    .update_thread(&thread_id, Box::new(move |thread: &mut Thread| thread.set_previous_response_id(token)))
                    .await;
                match saved {
                    Ok(_) => debug!(thread_id = %thread_id, response_id = %id, "continuation token saved"),
                    Err(err) => yield Err(AgentError::from(err)),
                }
            }
        })
    }

    fn spawn_title_update(&self, thread: &Thread, message: &UserMessageItem) {
        if thread.title.is_some() || !self.titles_in_flight.insert(thread.id.clone()) {
            return;
        }

        let server = self.clone();
        let thread = thread.clone();
        let message = message.clone();
        tokio::spawn(async move {
            if let Err(err) = server.maybe_update_thread_title(&thread, &message).await {
                warn!(thread_id = %thread.id, error = %err, "thread title generation failed");
            }
            server.titles_in_flight.remove(&thread.id);
        });
    }

    /// Generate and store a title for an untitled thread.
    ///
    /// Returns the thread's title after the update, or `None` when nothing was done.
    /// A title set meanwhile by another writer is kept.
    ///
    /// # Errors
    /// Returns an error if the message carries attachments (unknown ones give `NotFound`),
    /// the model call fails or the thread no longer exists.
    pub async fn maybe_update_thread_title(
        &self,
        thread: &Thread,
        message: &UserMessageItem,
    ) -> AgentResult<Option<String>> {
        if thread.title.is_some() {
            return Ok(None);
        }
        for attachment_id in &message.attachments {
            let attachment = self.store.load_attachment(attachment_id).await?;
            self.to_message_content(&attachment)?;
        }
        let text = message.text();
        if text.is_empty() {
            return Ok(None);
        }

        let generated = self.runner.run(&self.agents.title, &text).await?;
        let generated = generated.trim().trim_matches('"').to_string();
        let updated = self
            .store
            .update_thread(
                &thread.id,
                Box::new(move |stored: &mut Thread| {
                    if stored.title.is_none() {
                        stored.title = Some(generated);
                    }
                }),
            )
            .await?;

        info!(thread_id = %thread.id, title = ?updated.title, "thread titled");
        Ok(updated.title)
    }

    /// Citations of the most recent assistant message that has any.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread is unknown.
    pub async fn latest_citations(&self, thread_id: &str) -> AgentResult<Vec<Citation>> {
        let page = self
            .store
            .load_thread_items(thread_id, None, CITATION_SCAN_LIMIT, SortOrder::Desc)
            .await?;

        Ok(page
            .data
            .iter()
            .find_map(|item| match item {
                ThreadItem::AssistantMessage(message) => {
                    let citations = extract_citations(message);
                    (!citations.is_empty()).then_some(citations)
                }
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Convert an attachment into model input.
    ///
    /// # Errors
    /// Always fails: attachments are not supported.
    pub fn to_message_content(&self, attachment: &Attachment) -> AgentResult<Value> {
        warn!(attachment_id = %attachment.id, mime_type = %attachment.mime_type, "attachment rejected");
        Err(AgentError::UnsupportedAttachment(attachment.id.clone()))
    }
}

fn assistant_message(
    id: &str,
    thread_id: &str,
    text: String,
    annotations: Vec<crate::store::Annotation>,
) -> AssistantMessageItem {
    AssistantMessageItem {
        id: id.to_string(),
        thread_id: thread_id.to_string(),
        created_at: Utc::now(),
        content: vec![AssistantMessageContent { text, annotations }],
    }
}
