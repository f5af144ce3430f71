//! Conversation store: threads, their ordered items, and attachments.
//!
//! - `errors`: the `NotFound` error taxonomy
//! - `ids`: identifier generation
//! - `types`: thread, item and attachment model
//! - `pagination`: cursor pages shared by item and thread listings
//! - `memory_store`: the `ThreadStore` trait and its in-memory implementation

pub mod errors;
pub mod ids;
pub mod memory_store;
pub mod pagination;
pub mod types;

pub use errors::{EntityKind, StoreError, StoreResult};
pub use ids::{ItemIdKind, new_item_id, new_thread_id};
pub use memory_store::{MemoryStore, StoreFuture, ThreadStore, ThreadUpdate};
pub use pagination::{Page, SortOrder};
pub use types::{
    Annotation, AssistantMessageContent, AssistantMessageItem, Attachment, ClientToolCallItem,
    PREVIOUS_RESPONSE_ID_KEY, Thread, ThreadItem, ToolCallStatus, UserMessageContent,
    UserMessageItem, WidgetItem,
};
