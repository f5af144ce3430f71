//! Per-turn context handed to tools.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::agent::events::ThreadStreamEvent;
use crate::store::{StoreResult, ThreadItem, ThreadStore, WidgetItem};
use crate::widgets::Widget;

/// Lets tools publish events and widgets into the turn being streamed.
#[derive(Clone)]
pub struct AgentContext {
    thread_id: String,
    store: Arc<dyn ThreadStore>,
    events: mpsc::UnboundedSender<ThreadStreamEvent>,
}

impl AgentContext {
    /// Create a context and the receiver the orchestrator drains.
    #[must_use]
    pub fn new(
        thread_id: impl Into<String>,
        store: Arc<dyn ThreadStore>,
    ) -> (Self, mpsc::UnboundedReceiver<ThreadStreamEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                thread_id: thread_id.into(),
                store,
                events,
            },
            receiver,
        )
    }

    /// Thread of the turn.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Publish an event to the client.
    pub fn stream(&self, event: ThreadStreamEvent) {
        if self.events.send(event).is_err() {
            debug!(thread_id = %self.thread_id, "turn stream closed, event dropped");
        }
    }

    /// Publish a progress update.
    pub fn progress(&self, text: &str) {
        self.stream(ThreadStreamEvent::progress(text));
    }

    /// Store a widget as a thread item and publish it.
    ///
    /// # Errors
    /// Returns `NotFound` if the thread no longer exists.
    pub async fn stream_widget(
        &self,
        widget: Widget,
        copy_text: Option<String>,
    ) -> StoreResult<WidgetItem> {
        let item = WidgetItem::new(&self.thread_id, widget, copy_text);
        let thread_item = ThreadItem::Widget(item.clone());
        self.store.add_thread_item(&self.thread_id, &thread_item).await?;
        self.stream(ThreadStreamEvent::ItemDone { item: thread_item });
        Ok(item)
    }
}
