//! Error types for the conversation store.

use std::fmt;

use thiserror::Error;

/// Kind of stored entity a lookup targeted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityKind {
    /// Thread metadata record.
    Thread,
    /// Item inside a thread.
    Item,
    /// Uploaded attachment.
    Attachment,
}

impl EntityKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Thread => "thread",
            Self::Item => "item",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation store error type.
///
/// The store has a single failure mode: the addressed entity (or the
/// pagination cursor) does not exist.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StoreError {
    /// Thread, item, attachment or cursor is unknown.
    #[error("{kind} {id} not found{}", in_thread(.thread_id.as_deref()))]
    NotFound {
        /// What was looked up.
        kind: EntityKind,
        /// The missing identifier.
        id: String,
        /// Owning thread, for item lookups.
        thread_id: Option<String>,
    },
}

fn in_thread(thread_id: Option<&str>) -> String {
    thread_id.map_or_else(String::new, |id| format!(" in thread {id}"))
}

impl StoreError {
    /// Missing thread.
    #[must_use]
    pub fn thread(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Thread,
            id: id.into(),
            thread_id: None,
        }
    }

    /// Missing item (or item cursor) inside a thread.
    #[must_use]
    pub fn item(thread_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Item,
            id: id.into(),
            thread_id: Some(thread_id.into()),
        }
    }

    /// Missing attachment.
    #[must_use]
    pub fn attachment(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Attachment,
            id: id.into(),
            thread_id: None,
        }
    }

    /// Kind of the missing entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::NotFound { kind, .. } => *kind,
        }
    }
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
