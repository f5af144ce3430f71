//! JSON request protocol of the chat endpoint.
//!
//! A request is `{"type": ..., "params": {...}}`. Turn requests answer with an event
//! stream, the others with a single JSON document.

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::agent::errors::{AgentResult, ProtocolError};
use crate::agent::events::ThreadStreamEvent;
use crate::agent::orchestrator::{EventStream, SupportDeskServer};
use crate::store::{
    Page, SortOrder, Thread, ThreadItem, ToolCallStatus, UserMessageContent, UserMessageItem,
};

/// Default page size of listing requests.
pub const DEFAULT_PAGE_SIZE: usize = 20;

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Message typed by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    /// Text parts.
    pub content: Vec<UserMessageContent>,
    /// Attachment ids.
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Requests accepted by the chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
#[allow(missing_docs)]
pub enum ChatRequest {
    /// Start a thread with a first message.
    #[serde(rename = "threads.create")]
    CreateThread { input: UserInput },

    /// Send a message in an existing thread.
    #[serde(rename = "threads.add_user_message")]
    AddUserMessage { thread_id: String, input: UserInput },

    /// Post the output of a client tool call.
    #[serde(rename = "threads.add_client_tool_output")]
    AddClientToolOutput { thread_id: String, result: Value },

    /// Fetch a thread with its items.
    #[serde(rename = "threads.get_by_id")]
    GetThread { thread_id: String },

    /// Page through threads.
    #[serde(rename = "threads.list")]
    ListThreads {
        #[serde(default = "default_page_size")]
        limit: usize,
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        order: SortOrder,
    },

    /// Page through a thread's items.
    #[serde(rename = "items.list")]
    ListItems {
        thread_id: String,
        #[serde(default = "default_page_size")]
        limit: usize,
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        order: SortOrder,
    },

    /// Rename a thread.
    #[serde(rename = "threads.update")]
    UpdateThread {
        thread_id: String,
        #[serde(default)]
        title: Option<String>,
    },

    /// Delete a thread and its items.
    #[serde(rename = "threads.delete")]
    DeleteThread { thread_id: String },

    /// Delete an attachment.
    #[serde(rename = "attachments.delete")]
    DeleteAttachment { attachment_id: String },
}

impl ChatRequest {
    /// Parse a request body.
    ///
    /// # Errors
    /// Returns `InvalidRequest` when the body is not a known request.
    pub fn parse(body: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(body).map_err(|err| ProtocolError::InvalidRequest(err.to_string()))
    }

    /// Whether the request answers with an event stream.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(
            self,
            Self::CreateThread { .. } | Self::AddUserMessage { .. } | Self::AddClientToolOutput { .. }
        )
    }
}

/// A thread together with a page of its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadWithItems {
    /// The thread.
    #[serde(flatten)]
    pub thread: Thread,
    /// Oldest items first.
    pub items: Page<ThreadItem>,
}

/// Outcome of a processed request.
pub enum ProcessResult {
    /// Events to forward as server-sent events.
    Streaming(EventStream),
    /// Document to return as is.
    Json(Value),
}

impl std::fmt::Debug for ProcessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Streaming(_) => f.write_str("Streaming(..)"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

/// Parse and run one request.
///
/// # Errors
/// Returns `InvalidRequest` for malformed bodies, `NotFound` for unknown threads,
/// items or attachments, and any orchestrator error raised before streaming starts.
pub async fn process(server: &SupportDeskServer, body: &[u8]) -> AgentResult<ProcessResult> {
    let request = ChatRequest::parse(body)?;
    debug!(streaming = request.is_streaming(), "processing chat request");
    let store = server.store();

    match request {
        ChatRequest::CreateThread { input } => {
            let thread = Thread::new();
            store.save_thread(&thread).await?;
            let item = user_item(&thread, input);
            store.add_thread_item(&thread.id, &item).await?;
            info!(thread_id = %thread.id, "thread created");

            let prefix = vec![
                ThreadStreamEvent::ThreadCreated { thread: thread.clone() },
                ThreadStreamEvent::ItemDone { item: item.clone() },
            ];
            let response = server.respond(&thread, Some(&item)).await?;
            Ok(ProcessResult::Streaming(prefixed(prefix, response)))
        }
        ChatRequest::AddUserMessage { thread_id, input } => {
            let thread = store.load_thread(&thread_id).await?;
            let item = user_item(&thread, input);
            store.add_thread_item(&thread.id, &item).await?;

            let prefix = vec![ThreadStreamEvent::ItemDone { item: item.clone() }];
            let response = server.respond(&thread, Some(&item)).await?;
            Ok(ProcessResult::Streaming(prefixed(prefix, response)))
        }
        ChatRequest::AddClientToolOutput { thread_id, result } => {
            let thread = store.load_thread(&thread_id).await?;
            let items = store.load_thread_items(&thread_id, None, 0, SortOrder::Desc).await?;
            let mut call = items
                .data
                .into_iter()
                .find_map(|item| match item {
                    ThreadItem::ClientToolCall(call) if call.status == ToolCallStatus::Pending => Some(call),
                    _ => None,
                })
                .ok_or_else(|| ProtocolError::NoPendingToolCall(thread_id.clone()))?;

            call.output = Some(result);
            call.status = ToolCallStatus::Completed;
            let item = ThreadItem::ClientToolCall(call);
            store.save_item(&thread_id, &item).await?;

            let prefix = vec![ThreadStreamEvent::ItemDone { item: item.clone() }];
            let response = server.respond(&thread, Some(&item)).await?;
            Ok(ProcessResult::Streaming(prefixed(prefix, response)))
        }
        ChatRequest::GetThread { thread_id } => {
            let thread = store.load_thread(&thread_id).await?;
            let items = store.load_thread_items(&thread_id, None, 0, SortOrder::Asc).await?;
            Ok(ProcessResult::Json(to_json(&ThreadWithItems { thread, items })))
        }
        ChatRequest::ListThreads { limit, after, order } => {
            let page = store.load_threads(limit, after.as_deref(), order).await?;
            Ok(ProcessResult::Json(to_json(&page)))
        }
        ChatRequest::ListItems {
            thread_id,
            limit,
            after,
            order,
        } => {
            let page = store
                .load_thread_items(&thread_id, after.as_deref(), limit, order)
                .await?;
            Ok(ProcessResult::Json(to_json(&page)))
        }
        ChatRequest::UpdateThread { thread_id, title } => {
            let thread = store
                .update_thread(&thread_id, Box::new(move |thread: &mut Thread| thread.title = title))
                .await?;
            Ok(ProcessResult::Json(to_json(&thread)))
        }
        ChatRequest::DeleteThread { thread_id } => {
            store.delete_thread(&thread_id).await?;
            info!(%thread_id, "thread deleted");
            Ok(ProcessResult::Json(json!({})))
        }
        ChatRequest::DeleteAttachment { attachment_id } => {
            store.delete_attachment(&attachment_id).await?;
            Ok(ProcessResult::Json(json!({})))
        }
    }
}

fn user_item(thread: &Thread, input: UserInput) -> ThreadItem {
    ThreadItem::UserMessage(UserMessageItem::new(&thread.id, input.content, input.attachments))
}

fn prefixed(prefix: Vec<ThreadStreamEvent>, rest: EventStream) -> EventStream {
    Box::pin(stream::iter(prefix.into_iter().map(Ok)).chain(rest))
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::agent::errors::AgentError;
    use crate::agent::testing::{FakeDesk, ScriptedRunner, text_turn};
    use crate::agent::tools::ToolSettings;
    use crate::config::LlmConfig;
    use crate::desk::TicketDesk;
    use crate::llm::{Agents, Runner};
    use crate::store::{ClientToolCallItem, MemoryStore, StoreError};

    fn server(runner: ScriptedRunner) -> SupportDeskServer {
        SupportDeskServer::new(
            Arc::new(MemoryStore::new()),
            Arc::new(runner) as Arc<dyn Runner>,
            Arc::new(FakeDesk::default()) as Arc<dyn TicketDesk>,
            Agents::from_config(&LlmConfig::default()),
            ToolSettings {
                default_from_email: "support@example.fr".to_string(),
                ticket_web_url: String::new(),
            },
        )
    }

    async fn events(result: ProcessResult) -> Vec<ThreadStreamEvent> {
        let ProcessResult::Streaming(stream) = result else {
            panic!("expected a stream");
        };
        stream.map(Result::unwrap).collect().await
    }

    async fn json_of(server: &SupportDeskServer, body: Value) -> Value {
        match process(server, body.to_string().as_bytes()).await.unwrap() {
            ProcessResult::Json(value) => value,
            ProcessResult::Streaming(_) => panic!("expected json"),
        }
    }

    fn message(text: &str) -> Value {
        json!({"content": [{"type": "input_text", "text": text}]})
    }

    #[test]
    fn test_parse_requests() {
        let request = ChatRequest::parse(br#"{"type": "threads.list", "params": {}}"#).unwrap();
        assert_eq!(
            request,
            ChatRequest::ListThreads {
                limit: DEFAULT_PAGE_SIZE,
                after: None,
                order: SortOrder::Desc,
            }
        );
        assert!(!request.is_streaming());

        let request = ChatRequest::parse(
            br#"{"type": "threads.add_user_message", "params": {"thread_id": "thr_1", "input": {"content": []}}}"#,
        )
        .unwrap();
        assert!(request.is_streaming());

        assert!(matches!(
            ChatRequest::parse(br#"{"type": "threads.explode", "params": {}}"#),
            Err(ProtocolError::InvalidRequest(_))
        ));
        assert!(matches!(ChatRequest::parse(b"not json"), Err(ProtocolError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_create_thread_streams_prefix_then_reply() {
        let runner = ScriptedRunner::default()
            .with_turn(text_turn("p", &["Bonjour"], "resp_1"))
            .with_reply("Thread Title Generator", "Accueil");
        let server = server(runner);
        let body = json!({"type": "threads.create", "params": {"input": message("salut")}});

        let events = events(process(&server, body.to_string().as_bytes()).await.unwrap()).await;

        let ThreadStreamEvent::ThreadCreated { thread } = &events[0] else {
            panic!("expected thread.created, got {:?}", events[0]);
        };
        assert!(matches!(&events[1], ThreadStreamEvent::ItemDone { item: ThreadItem::UserMessage(m) } if m.text() == "salut"));
        assert!(matches!(events[2], ThreadStreamEvent::ItemAdded { .. }));
        assert!(matches!(events.last(), Some(ThreadStreamEvent::ItemDone { item: ThreadItem::AssistantMessage(_) })));

        let fetched = json_of(&server, json!({"type": "threads.get_by_id", "params": {"thread_id": thread.id}})).await;
        assert_eq!(fetched["id"], json!(thread.id));
        assert_eq!(fetched["items"]["data"].as_array().unwrap().len(), 2);
        assert_eq!(fetched["items"]["data"][0]["type"], "user_message");
    }

    #[tokio::test]
    async fn test_create_with_attachment_answers_text() {
        let runner = ScriptedRunner::default().with_turn(text_turn("p", &["Vu"], "resp_1"));
        let server = server(runner);
        let body = json!({
            "type": "threads.create",
            "params": {"input": {
                "content": [{"type": "input_text", "text": "regarde"}],
                "attachments": ["att_1"]
            }}
        });

        let events = events(process(&server, body.to_string().as_bytes()).await.unwrap()).await;
        let ThreadStreamEvent::ThreadCreated { thread } = &events[0] else {
            panic!("expected thread.created, got {:?}", events[0]);
        };
        assert!(matches!(
            events.last(),
            Some(ThreadStreamEvent::ItemDone { item: ThreadItem::AssistantMessage(_) })
        ));

        let threads = server.store().load_threads(0, None, SortOrder::Desc).await.unwrap();
        assert_eq!(threads.data.len(), 1);
        let items = server
            .store()
            .load_thread_items(&thread.id, None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(items.data.len(), 2);
        assert!(matches!(items.data[1], ThreadItem::AssistantMessage(_)));
    }

    #[tokio::test]
    async fn test_add_user_message_to_unknown_thread() {
        let server = server(ScriptedRunner::default());
        let body = json!({"type": "threads.add_user_message", "params": {"thread_id": "nope", "input": message("?")}});
        assert!(matches!(
            process(&server, body.to_string().as_bytes()).await,
            Err(AgentError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_client_tool_output_completes_pending_call() {
        let server = server(ScriptedRunner::default());
        let mut thread = Thread::with_id("thr_1");
        thread.title = Some("t".to_string());
        server.store().save_thread(&thread).await.unwrap();

        let body = json!({"type": "threads.add_client_tool_output", "params": {"thread_id": "thr_1", "result": {"ok": true}}});
        assert!(matches!(
            process(&server, body.to_string().as_bytes()).await,
            Err(AgentError::Protocol(ProtocolError::NoPendingToolCall(_)))
        ));

        let call = ThreadItem::ClientToolCall(ClientToolCallItem {
            id: "cltc_1".to_string(),
            thread_id: "thr_1".to_string(),
            created_at: Utc::now(),
            call_id: "call_1".to_string(),
            name: "open_ticket".to_string(),
            arguments: json!({}),
            output: None,
            status: ToolCallStatus::Pending,
        });
        server.store().add_thread_item("thr_1", &call).await.unwrap();

        let events = events(process(&server, body.to_string().as_bytes()).await.unwrap()).await;
        assert_eq!(events.len(), 1);

        let stored = server.store().load_item("thr_1", "cltc_1").await.unwrap();
        let ThreadItem::ClientToolCall(stored) = stored else {
            panic!("expected a client tool call");
        };
        assert_eq!(stored.status, ToolCallStatus::Completed);
        assert_eq!(stored.output, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_listing_update_and_delete() {
        let server = server(ScriptedRunner::default());
        for id in ["thr_a", "thr_b", "thr_c"] {
            server.store().save_thread(&Thread::with_id(id)).await.unwrap();
        }

        let page = json_of(&server, json!({"type": "threads.list", "params": {"limit": 2}})).await;
        assert_eq!(page["data"].as_array().unwrap().len(), 2);
        assert_eq!(page["has_more"], true);

        let renamed = json_of(
            &server,
            json!({"type": "threads.update", "params": {"thread_id": "thr_a", "title": "Pneus"}}),
        )
        .await;
        assert_eq!(renamed["title"], "Pneus");

        let items = json_of(&server, json!({"type": "items.list", "params": {"thread_id": "thr_a"}})).await;
        assert_eq!(items["data"], json!([]));
        assert_eq!(items["has_more"], false);

        let deleted = json_of(&server, json!({"type": "threads.delete", "params": {"thread_id": "thr_a"}})).await;
        assert_eq!(deleted, json!({}));
        assert!(server.store().load_thread("thr_a").await.is_err());

        let body = json!({"type": "attachments.delete", "params": {"attachment_id": "att_x"}});
        assert!(matches!(
            process(&server, body.to_string().as_bytes()).await,
            Err(AgentError::Store(StoreError::NotFound { .. }))
        ));
    }
}
