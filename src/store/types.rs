//! Entity model of the conversation store: threads, thread items and attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::ids::{ItemIdKind, new_item_id, new_thread_id};
use crate::widgets::Widget;

/// Metadata key holding the text-generation continuation token.
pub const PREVIOUS_RESPONSE_ID_KEY: &str = "previous_response_id";

/// One conversation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Unique thread identifier.
    pub id: String,
    /// Creation timestamp, used to order thread listings.
    pub created_at: DateTime<Utc>,
    /// Human-readable title, unset until generated or edited.
    #[serde(default)]
    pub title: Option<String>,
    /// Free-form state carried between turns.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Thread {
    /// Build a fresh, untitled thread with a generated id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(new_thread_id())
    }

    /// Build an untitled thread with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            title: None,
            metadata: Map::new(),
        }
    }

    /// Continuation token recorded by the previous turn, if any.
    #[must_use]
    pub fn previous_response_id(&self) -> Option<&str> {
        self.metadata
            .get(PREVIOUS_RESPONSE_ID_KEY)
            .and_then(Value::as_str)
    }

    /// Record the continuation token of the latest turn.
    pub fn set_previous_response_id(&mut self, response_id: impl Into<String>) {
        self.metadata.insert(
            PREVIOUS_RESPONSE_ID_KEY.to_string(),
            Value::String(response_id.into()),
        );
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// A user-supplied file reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique attachment identifier.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// MIME type reported at upload.
    pub mime_type: String,
    /// Optional location the client uploads the bytes to.
    #[serde(default)]
    pub upload_url: Option<String>,
}

/// One piece of user message content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserMessageContent {
    /// Plain text typed by the agent.
    InputText {
        /// The text.
        text: String,
    },
}

impl UserMessageContent {
    /// Text of this content part.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::InputText { text } => text,
        }
    }
}

/// A file citation attached to assistant output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Provider file id.
    #[serde(default)]
    pub file_id: Option<String>,
    /// Cited file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// Cited document title.
    #[serde(default)]
    pub title: Option<String>,
    /// Character index of the citation marker in the text.
    #[serde(default)]
    pub index: Option<usize>,
}

/// One block of assistant output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessageContent {
    /// Output text.
    pub text: String,
    /// Citations attached to the text.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Message typed by the human support agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessageItem {
    /// Item id, unique within the thread.
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Content parts.
    pub content: Vec<UserMessageContent>,
    /// Referenced attachment ids.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl UserMessageItem {
    /// Build a new user message in a thread.
    #[must_use]
    pub fn new(
        thread_id: impl Into<String>,
        content: Vec<UserMessageContent>,
        attachments: Vec<String>,
    ) -> Self {
        Self {
            id: new_item_id(ItemIdKind::Message),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            content,
            attachments,
        }
    }

    /// Concatenated non-empty text parts, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(UserMessageContent::text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

/// Message produced by the language model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantMessageItem {
    /// Item id, unique within the thread.
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Output blocks.
    pub content: Vec<AssistantMessageContent>,
}

impl AssistantMessageItem {
    /// Full text across all content blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Status of a client-side tool call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Awaiting output from the client.
    #[default]
    Pending,
    /// Output recorded.
    Completed,
}

/// Tool invocation delegated to the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientToolCallItem {
    /// Item id, unique within the thread.
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Provider call id.
    pub call_id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
    /// Output posted back by the client.
    #[serde(default)]
    pub output: Option<Value>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ToolCallStatus,
}

/// Rendered widget shown in the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetItem {
    /// Item id, unique within the thread.
    pub id: String,
    /// Owning thread.
    pub thread_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Widget tree.
    pub widget: Widget,
    /// Plain-text rendering offered for copy.
    #[serde(default)]
    pub copy_text: Option<String>,
}

impl WidgetItem {
    /// Build a widget item in a thread.
    #[must_use]
    pub fn new(thread_id: impl Into<String>, widget: Widget, copy_text: Option<String>) -> Self {
        Self {
            id: new_item_id(ItemIdKind::Widget),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
            widget,
            copy_text,
        }
    }
}

/// One message or event belonging to a thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadItem {
    /// Human input.
    UserMessage(UserMessageItem),
    /// Model output.
    AssistantMessage(AssistantMessageItem),
    /// Client tool call record.
    ClientToolCall(ClientToolCallItem),
    /// Rendered widget.
    Widget(WidgetItem),
}

impl ThreadItem {
    /// Item identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::UserMessage(item) => &item.id,
            Self::AssistantMessage(item) => &item.id,
            Self::ClientToolCall(item) => &item.id,
            Self::Widget(item) => &item.id,
        }
    }

    /// Owning thread identifier.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        match self {
            Self::UserMessage(item) => &item.thread_id,
            Self::AssistantMessage(item) => &item.thread_id,
            Self::ClientToolCall(item) => &item.thread_id,
            Self::Widget(item) => &item.thread_id,
        }
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::UserMessage(item) => item.created_at,
            Self::AssistantMessage(item) => item.created_at,
            Self::ClientToolCall(item) => item.created_at,
            Self::Widget(item) => item.created_at,
        }
    }
}
