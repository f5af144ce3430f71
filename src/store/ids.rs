//! Identifier generation for threads and thread items.
//!
//! Identifiers are plain strings on the wire; they carry a short prefix
//! naming the entity so that ids stay readable in logs and client payloads.

use uuid::Uuid;

/// Prefix used for thread identifiers.
pub const THREAD_PREFIX: &str = "thr";

/// Kind of thread item an identifier is minted for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ItemIdKind {
    /// User or assistant message.
    Message,
    /// Client tool call record.
    ToolCall,
    /// Rendered widget.
    Widget,
}

impl ItemIdKind {
    /// Stable prefix for the kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Message => "msg",
            Self::ToolCall => "cti",
            Self::Widget => "wdg",
        }
    }
}

#[inline]
fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Mint a new thread identifier.
#[must_use]
pub fn new_thread_id() -> String {
    format!("{THREAD_PREFIX}_{}", random_suffix())
}

/// Mint a new item identifier for the given kind.
#[must_use]
pub fn new_item_id(kind: ItemIdKind) -> String {
    format!("{}_{}", kind.prefix(), random_suffix())
}
