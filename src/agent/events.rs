//! Events streamed to the chat client during a turn.

use serde::{Deserialize, Serialize};

use crate::store::{Thread, ThreadItem};

/// Incremental change to an item being written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ItemUpdate {
    /// Text appended to an assistant message.
    #[serde(rename = "assistant_message.content_part.text_delta")]
    TextDelta {
        /// Content block index.
        content_index: usize,
        /// Appended text.
        delta: String,
    },
}

/// One server-sent event of a streamed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadStreamEvent {
    /// A thread was created for this turn.
    #[serde(rename = "thread.created")]
    ThreadCreated {
        /// The new thread.
        thread: Thread,
    },
    /// Thread metadata changed.
    #[serde(rename = "thread.updated")]
    ThreadUpdated {
        /// The updated thread.
        thread: Thread,
    },
    /// An item started.
    #[serde(rename = "thread.item.added")]
    ItemAdded {
        /// The item as first seen.
        item: ThreadItem,
    },
    /// An item in progress changed.
    #[serde(rename = "thread.item.updated")]
    ItemUpdated {
        /// Target item.
        item_id: String,
        /// The change.
        update: ItemUpdate,
    },
    /// An item is final and stored.
    #[serde(rename = "thread.item.done")]
    ItemDone {
        /// The final item.
        item: ThreadItem,
    },
    /// Transient status text shown while a tool works.
    #[serde(rename = "progress_update")]
    ProgressUpdate {
        /// Status text.
        text: String,
    },
    /// The turn failed.
    #[serde(rename = "error")]
    Error {
        /// Human-readable reason.
        message: String,
        /// Whether resending the turn may help.
        allow_retry: bool,
    },
}

impl ThreadStreamEvent {
    /// Progress update helper.
    #[must_use]
    pub fn progress(text: impl Into<String>) -> Self {
        Self::ProgressUpdate { text: text.into() }
    }
}
