//! In-memory conversation store.
//!
//! Every operation runs under one process-wide mutex and only touches
//! in-memory containers. Values are cloned on the way in and on the way out,
//! so callers never hold a live reference into the store.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::debug;

use crate::store::errors::{StoreError, StoreResult};
use crate::store::pagination::{Page, SortOrder, paginate};
use crate::store::types::{Attachment, Thread, ThreadItem};

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Mutation applied to a thread record by [`ThreadStore::update_thread`].
pub type ThreadUpdate = Box<dyn FnOnce(&mut Thread) + Send>;

/// Conversation store trait.
pub trait ThreadStore: Send + Sync {
    /// Load a thread snapshot.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread is unknown.
    fn load_thread(&self, thread_id: &str) -> StoreFuture<'_, StoreResult<Thread>>;

    /// Insert or overwrite a thread, creating its empty item sequence if new.
    ///
    /// # Errors
    /// Never fails for the in-memory store.
    fn save_thread(&self, thread: &Thread) -> StoreFuture<'_, StoreResult<()>>;

    /// Apply `apply` to the stored thread atomically and return the result.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread is unknown.
    fn update_thread(
        &self,
        thread_id: &str,
        apply: ThreadUpdate,
    ) -> StoreFuture<'_, StoreResult<Thread>>;

    /// Load a page of a thread's items.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread or the `after` cursor is unknown.
    fn load_thread_items(
        &self,
        thread_id: &str,
        after: Option<&str>,
        limit: usize,
        order: SortOrder,
    ) -> StoreFuture<'_, StoreResult<Page<ThreadItem>>>;

    /// Append an item to the end of a thread.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread is unknown.
    fn add_thread_item(
        &self,
        thread_id: &str,
        item: &ThreadItem,
    ) -> StoreFuture<'_, StoreResult<()>>;

    /// Replace an existing item in place.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread or the item is unknown.
    fn save_item(&self, thread_id: &str, item: &ThreadItem) -> StoreFuture<'_, StoreResult<()>>;

    /// Load one item.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread or the item is unknown.
    fn load_item(&self, thread_id: &str, item_id: &str)
    -> StoreFuture<'_, StoreResult<ThreadItem>>;

    /// Remove the first item with the given id.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread or the item is unknown.
    fn delete_thread_item(&self, thread_id: &str, item_id: &str)
    -> StoreFuture<'_, StoreResult<()>>;

    /// Remove a thread and all of its items.
    ///
    /// # Errors
    /// Returns `NotFound` unless both the record and its item sequence existed.
    fn delete_thread(&self, thread_id: &str) -> StoreFuture<'_, StoreResult<()>>;

    /// Load a page of threads ordered by creation time.
    ///
    /// # Errors
    /// Returns `NotFound` if the `after` cursor is unknown.
    fn load_threads(
        &self,
        limit: usize,
        after: Option<&str>,
        order: SortOrder,
    ) -> StoreFuture<'_, StoreResult<Page<Thread>>>;

    /// Insert or overwrite an attachment.
    ///
    /// # Errors
    /// Never fails for the in-memory store.
    fn save_attachment(&self, attachment: &Attachment) -> StoreFuture<'_, StoreResult<()>>;

    /// Load an attachment.
    ///
    /// # Errors
    /// Returns `NotFound` if the attachment is unknown.
    fn load_attachment(&self, attachment_id: &str) -> StoreFuture<'_, StoreResult<Attachment>>;

    /// Remove an attachment.
    ///
    /// # Errors
    /// Returns `NotFound` if the attachment is unknown.
    fn delete_attachment(&self, attachment_id: &str) -> StoreFuture<'_, StoreResult<()>>;
}

#[derive(Default)]
struct StoreState {
    threads: HashMap<String, Thread>,
    items: HashMap<String, Vec<ThreadItem>>,
    attachments: HashMap<String, Attachment>,
}

/// Volatile store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThreadStore for MemoryStore {
    fn load_thread(&self, thread_id: &str) -> StoreFuture<'_, StoreResult<Thread>> {
        let thread_id = thread_id.to_string();
        Box::pin(async move {
            let state = self.state.lock().await;
            state
                .threads
                .get(&thread_id)
                .cloned()
                .ok_or_else(|| StoreError::thread(thread_id))
        })
    }

    fn save_thread(&self, thread: &Thread) -> StoreFuture<'_, StoreResult<()>> {
        let thread = thread.clone();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.items.entry(thread.id.clone()).or_default();
            debug!(thread_id = %thread.id, "Saved thread");
            state.threads.insert(thread.id.clone(), thread);
            Ok(())
        })
    }

    fn update_thread(
        &self,
        thread_id: &str,
        apply: ThreadUpdate,
    ) -> StoreFuture<'_, StoreResult<Thread>> {
        let thread_id = thread_id.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let thread = state
                .threads
                .get_mut(&thread_id)
                .ok_or_else(|| StoreError::thread(thread_id.clone()))?;
            apply(thread);
            // The record key stays authoritative even if `apply` touched the id.
            thread.id.clone_from(&thread_id);
            Ok(thread.clone())
        })
    }

    fn load_thread_items(
        &self,
        thread_id: &str,
        after: Option<&str>,
        limit: usize,
        order: SortOrder,
    ) -> StoreFuture<'_, StoreResult<Page<ThreadItem>>> {
        let thread_id = thread_id.to_string();
        let after = after.map(str::to_string);
        Box::pin(async move {
            let state = self.state.lock().await;
            let items = state
                .items
                .get(&thread_id)
                .ok_or_else(|| StoreError::thread(thread_id.clone()))?;

            let mut ordered: Vec<&ThreadItem> = items.iter().collect();
            if order == SortOrder::Desc {
                ordered.reverse();
            }

            paginate(&ordered, after.as_deref(), limit, ThreadItem::id, |cursor| {
                StoreError::item(thread_id.clone(), cursor)
            })
        })
    }

    fn add_thread_item(
        &self,
        thread_id: &str,
        item: &ThreadItem,
    ) -> StoreFuture<'_, StoreResult<()>> {
        let thread_id = thread_id.to_string();
        let item = item.clone();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if !state.threads.contains_key(&thread_id) {
                return Err(StoreError::thread(thread_id));
            }
            debug!(thread_id = %thread_id, item_id = %item.id(), "Appended thread item");
            state.items.entry(thread_id).or_default().push(item);
            Ok(())
        })
    }

    fn save_item(&self, thread_id: &str, item: &ThreadItem) -> StoreFuture<'_, StoreResult<()>> {
        let thread_id = thread_id.to_string();
        let item = item.clone();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let items = state
                .items
                .get_mut(&thread_id)
                .ok_or_else(|| StoreError::thread(thread_id.clone()))?;
            let slot = items
                .iter_mut()
                .find(|existing| existing.id() == item.id())
                .ok_or_else(|| StoreError::item(thread_id.clone(), item.id()))?;
            *slot = item;
            Ok(())
        })
    }

    fn load_item(
        &self,
        thread_id: &str,
        item_id: &str,
    ) -> StoreFuture<'_, StoreResult<ThreadItem>> {
        let thread_id = thread_id.to_string();
        let item_id = item_id.to_string();
        Box::pin(async move {
            let state = self.state.lock().await;
            let items = state
                .items
                .get(&thread_id)
                .ok_or_else(|| StoreError::thread(thread_id.clone()))?;
            items
                .iter()
                .find(|item| item.id() == item_id)
                .cloned()
                .ok_or_else(|| StoreError::item(thread_id, item_id))
        })
    }

    fn delete_thread_item(
        &self,
        thread_id: &str,
        item_id: &str,
    ) -> StoreFuture<'_, StoreResult<()>> {
        let thread_id = thread_id.to_string();
        let item_id = item_id.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let items = state
                .items
                .get_mut(&thread_id)
                .ok_or_else(|| StoreError::thread(thread_id.clone()))?;
            let position = items
                .iter()
                .position(|item| item.id() == item_id)
                .ok_or_else(|| StoreError::item(thread_id.clone(), item_id))?;
            items.remove(position);
            Ok(())
        })
    }

    fn delete_thread(&self, thread_id: &str) -> StoreFuture<'_, StoreResult<()>> {
        let thread_id = thread_id.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let thread_removed = state.threads.remove(&thread_id);
            let items_removed = state.items.remove(&thread_id);
            // A record without its item sequence (or the reverse) counts as absent.
            if thread_removed.is_none() || items_removed.is_none() {
                return Err(StoreError::thread(thread_id));
            }
            debug!(thread_id = %thread_id, "Deleted thread");
            Ok(())
        })
    }

    fn load_threads(
        &self,
        limit: usize,
        after: Option<&str>,
        order: SortOrder,
    ) -> StoreFuture<'_, StoreResult<Page<Thread>>> {
        let after = after.map(str::to_string);
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut ordered: Vec<&Thread> = state.threads.values().collect();
            ordered.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            if order == SortOrder::Desc {
                ordered.reverse();
            }

            paginate(
                &ordered,
                after.as_deref(),
                limit,
                |thread: &Thread| thread.id.as_str(),
                |cursor| StoreError::thread(cursor),
            )
        })
    }

    fn save_attachment(&self, attachment: &Attachment) -> StoreFuture<'_, StoreResult<()>> {
        let attachment = attachment.clone();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state
                .attachments
                .insert(attachment.id.clone(), attachment);
            Ok(())
        })
    }

    fn load_attachment(&self, attachment_id: &str) -> StoreFuture<'_, StoreResult<Attachment>> {
        let attachment_id = attachment_id.to_string();
        Box::pin(async move {
            let state = self.state.lock().await;
            state
                .attachments
                .get(&attachment_id)
                .cloned()
                .ok_or_else(|| StoreError::attachment(attachment_id))
        })
    }

    fn delete_attachment(&self, attachment_id: &str) -> StoreFuture<'_, StoreResult<()>> {
        let attachment_id = attachment_id.to_string();
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state
                .attachments
                .remove(&attachment_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::attachment(attachment_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::*;
    use crate::store::errors::EntityKind;
    use crate::store::types::{
        AssistantMessageContent, AssistantMessageItem, UserMessageContent, UserMessageItem,
    };

    fn user_item(thread_id: &str, id: &str, text: &str) -> ThreadItem {
        let mut item = UserMessageItem::new(
            thread_id,
            vec![UserMessageContent::InputText {
                text: text.to_string(),
            }],
            Vec::new(),
        );
        item.id = id.to_string();
        ThreadItem::UserMessage(item)
    }

    fn assistant_item(thread_id: &str, id: &str, text: &str) -> ThreadItem {
        ThreadItem::AssistantMessage(AssistantMessageItem {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            created_at: Utc::now(),
            content: vec![AssistantMessageContent {
                text: text.to_string(),
                annotations: Vec::new(),
            }],
        })
    }

    fn item_ids(page: &Page<ThreadItem>) -> Vec<&str> {
        page.data.iter().map(ThreadItem::id).collect()
    }

    async fn store_with_items(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        store.save_thread(&Thread::with_id("t1")).await.unwrap();
        for id in ids {
            store
                .add_thread_item("t1", &user_item("t1", id, id))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_load_unknown_thread() {
        let store = MemoryStore::new();
        let err = store.load_thread("nope").await.unwrap_err();
        assert_eq!(err.kind(), EntityKind::Thread);
    }

    #[tokio::test]
    async fn test_loaded_thread_is_a_copy() {
        let store = MemoryStore::new();
        let thread = Thread::with_id("t1");
        store.save_thread(&thread).await.unwrap();

        let mut loaded = store.load_thread("t1").await.unwrap();
        assert_eq!(loaded, thread);
        loaded.title = Some("mutated".to_string());
        loaded.set_previous_response_id("resp_x");

        let again = store.load_thread("t1").await.unwrap();
        assert_eq!(again, thread);
    }

    #[tokio::test]
    async fn test_saved_value_is_detached_from_caller() {
        let store = MemoryStore::new();
        let mut thread = Thread::with_id("t1");
        store.save_thread(&thread).await.unwrap();
        thread.title = Some("local only".to_string());

        assert_eq!(store.load_thread("t1").await.unwrap().title, None);
    }

    #[tokio::test]
    async fn test_resaving_thread_keeps_items() {
        let store = store_with_items(&["a", "b"]).await;
        let mut thread = store.load_thread("t1").await.unwrap();
        thread.title = Some("Renamed".to_string());
        store.save_thread(&thread).await.unwrap();

        let page = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&page), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_items_in_append_order() {
        let store = store_with_items(&["a", "b", "c"]).await;

        let asc = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&asc), vec!["a", "b", "c"]);
        assert!(!asc.has_more);
        assert_eq!(asc.after, None);

        let desc = store
            .load_thread_items("t1", None, 0, SortOrder::Desc)
            .await
            .unwrap();
        assert_eq!(item_ids(&desc), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_two_item_paging_scenario() {
        let store = MemoryStore::new();
        store.save_thread(&Thread::with_id("t1")).await.unwrap();
        store
            .add_thread_item("t1", &user_item("t1", "a", "hi"))
            .await
            .unwrap();
        store
            .add_thread_item("t1", &assistant_item("t1", "b", "hello"))
            .await
            .unwrap();

        let first = store
            .load_thread_items("t1", None, 1, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&first), vec!["a"]);
        assert!(first.has_more);
        assert_eq!(first.after.as_deref(), Some("a"));

        let second = store
            .load_thread_items("t1", Some("a"), 1, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&second), vec!["b"]);
        assert!(!second.has_more);
        assert_eq!(second.after, None);
    }

    #[tokio::test]
    async fn test_descending_page_walk() {
        let store = store_with_items(&["a", "b", "c", "d"]).await;
        let mut seen = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let page = store
                .load_thread_items("t1", after.as_deref(), 3, SortOrder::Desc)
                .await
                .unwrap();
            seen.extend(page.data.iter().map(|item| item.id().to_string()));
            if !page.has_more {
                break;
            }
            after = page.after;
        }
        assert_eq!(seen, vec!["d", "c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_unknown_item_cursor_fails() {
        let store = store_with_items(&["a"]).await;
        let err = store
            .load_thread_items("t1", Some("nonexistent-id"), 1, SortOrder::Asc)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::item("t1", "nonexistent-id"));
    }

    #[tokio::test]
    async fn test_empty_item_cursor_starts_from_the_top() {
        let store = store_with_items(&["a", "b"]).await;
        let page = store
            .load_thread_items("t1", Some(""), 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&page), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_loaded_items_are_copies() {
        let store = store_with_items(&["a"]).await;

        let mut loaded = store.load_item("t1", "a").await.unwrap();
        if let ThreadItem::UserMessage(message) = &mut loaded {
            message.content = vec![UserMessageContent::InputText {
                text: "mutated".to_string(),
            }];
            message.attachments.push("att_x".to_string());
        }

        let mut page = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        if let ThreadItem::UserMessage(message) = &mut page.data[0] {
            message.id = "renamed".to_string();
        }

        let ThreadItem::UserMessage(again) = store.load_item("t1", "a").await.unwrap() else {
            panic!("expected a user message");
        };
        assert_eq!(again.id, "a");
        assert_eq!(again.text(), "a");
        assert!(again.attachments.is_empty());
    }

    #[tokio::test]
    async fn test_items_of_unknown_thread() {
        let store = MemoryStore::new();
        let err = store
            .load_thread_items("ghost", None, 0, SortOrder::Desc)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::thread("ghost"));
    }

    #[tokio::test]
    async fn test_add_item_requires_thread() {
        let store = MemoryStore::new();
        let err = store
            .add_thread_item("ghost", &user_item("ghost", "a", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), EntityKind::Thread);
    }

    #[tokio::test]
    async fn test_add_item_allows_duplicate_ids() {
        let store = store_with_items(&["a", "a"]).await;
        let page = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
    }

    #[tokio::test]
    async fn test_save_item_replaces_in_place() {
        let store = store_with_items(&["a", "b", "c"]).await;
        store
            .save_item("t1", &assistant_item("t1", "b", "edited"))
            .await
            .unwrap();

        let page = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&page), vec!["a", "b", "c"]);
        assert!(matches!(page.data[1], ThreadItem::AssistantMessage(_)));
    }

    #[tokio::test]
    async fn test_save_item_does_not_insert() {
        let store = store_with_items(&["a"]).await;
        let err = store
            .save_item("t1", &user_item("t1", "zz", "new"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::item("t1", "zz"));

        let page = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&page), vec!["a"]);
    }

    #[tokio::test]
    async fn test_load_item() {
        let store = store_with_items(&["a", "b"]).await;
        let item = store.load_item("t1", "b").await.unwrap();
        assert_eq!(item.id(), "b");

        assert_eq!(
            store.load_item("t1", "x").await.unwrap_err(),
            StoreError::item("t1", "x")
        );
        assert_eq!(
            store.load_item("t9", "a").await.unwrap_err(),
            StoreError::thread("t9")
        );
    }

    #[tokio::test]
    async fn test_delete_item_removes_first_match_only() {
        let store = store_with_items(&["a", "b", "a", "c"]).await;
        store.delete_thread_item("t1", "a").await.unwrap();

        let page = store
            .load_thread_items("t1", None, 0, SortOrder::Asc)
            .await
            .unwrap();
        assert_eq!(item_ids(&page), vec!["b", "a", "c"]);

        assert_eq!(
            store.delete_thread_item("t1", "zz").await.unwrap_err(),
            StoreError::item("t1", "zz")
        );
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let store = store_with_items(&["a"]).await;
        assert_eq!(
            store.delete_thread("missing").await.unwrap_err(),
            StoreError::thread("missing")
        );

        store.delete_thread("t1").await.unwrap();
        assert!(store.load_thread("t1").await.is_err());
        assert!(
            store
                .load_thread_items("t1", None, 0, SortOrder::Asc)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_delete_thread_with_missing_item_sequence() {
        let store = store_with_items(&[]).await;
        store.state.lock().await.items.remove("t1");

        assert_eq!(
            store.delete_thread("t1").await.unwrap_err(),
            StoreError::thread("t1")
        );
        // The record was still dropped along the way.
        assert!(store.load_thread("t1").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_thread_with_orphan_item_sequence() {
        let store = MemoryStore::new();
        store
            .state
            .lock()
            .await
            .items
            .insert("t1".to_string(), Vec::new());

        assert_eq!(
            store.delete_thread("t1").await.unwrap_err(),
            StoreError::thread("t1")
        );
    }

    #[tokio::test]
    async fn test_update_thread_is_atomic_merge() {
        let store = MemoryStore::new();
        store.save_thread(&Thread::with_id("t1")).await.unwrap();

        store
            .update_thread(
                "t1",
                Box::new(|thread| thread.title = Some("Pneus".to_string())),
            )
            .await
            .unwrap();
        let updated = store
            .update_thread(
                "t1",
                Box::new(|thread| thread.set_previous_response_id("resp_1")),
            )
            .await
            .unwrap();

        assert_eq!(updated.title.as_deref(), Some("Pneus"));
        assert_eq!(updated.previous_response_id(), Some("resp_1"));
        assert!(
            store
                .update_thread("ghost", Box::new(|_| {}))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_clobber() {
        let store = Arc::new(MemoryStore::new());
        store.save_thread(&Thread::with_id("t1")).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update_thread(
                        "t1",
                        Box::new(move |thread| {
                            thread
                                .metadata
                                .insert(format!("k{n}"), serde_json::json!(n));
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load_thread("t1").await.unwrap().metadata.len(), 16);
    }

    #[tokio::test]
    async fn test_load_threads_by_creation_time() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for (id, offset) in [("old", 0), ("mid", 10), ("new", 20)] {
            let mut thread = Thread::with_id(id);
            thread.created_at = base + Duration::seconds(offset);
            store.save_thread(&thread).await.unwrap();
        }

        let desc = store.load_threads(2, None, SortOrder::Desc).await.unwrap();
        let ids: Vec<&str> = desc.data.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
        assert!(desc.has_more);
        assert_eq!(desc.after.as_deref(), Some("mid"));

        let rest = store
            .load_threads(2, Some("mid"), SortOrder::Desc)
            .await
            .unwrap();
        assert_eq!(rest.data.len(), 1);
        assert_eq!(rest.data[0].id, "old");
        assert!(!rest.has_more);

        let asc = store.load_threads(0, None, SortOrder::Asc).await.unwrap();
        let ids: Vec<&str> = asc.data.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "mid", "new"]);

        assert_eq!(
            store
                .load_threads(1, Some("ghost"), SortOrder::Asc)
                .await
                .unwrap_err(),
            StoreError::thread("ghost")
        );
    }

    #[tokio::test]
    async fn test_attachments() {
        let store = MemoryStore::new();
        let attachment = Attachment {
            id: "f1".to_string(),
            name: "carte-grise.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            upload_url: None,
        };
        store.save_attachment(&attachment).await.unwrap();
        assert_eq!(store.load_attachment("f1").await.unwrap(), attachment);

        store.delete_attachment("f1").await.unwrap();
        assert_eq!(
            store.load_attachment("f1").await.unwrap_err(),
            StoreError::attachment("f1")
        );
        assert!(store.delete_attachment("f1").await.is_err());
    }
}
