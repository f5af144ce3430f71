//! Application state shared across all request handlers.

use std::sync::Arc;

use anyhow::Context;

use crate::agent::{SupportDeskServer, ToolSettings};
use crate::config::AppConfig;
use crate::desk::{DeskClient, TicketDesk};
use crate::knowledge::{KnowledgeBase, VectorStoreClient};
use crate::llm::{Agents, OpenAiRunner, Runner};
use crate::store::{MemoryStore, ThreadStore};

/// Shared application state.
pub struct AppState {
    /// Conversation orchestrator.
    pub server: SupportDeskServer,
    /// Knowledge-base file storage.
    pub knowledge: Arc<dyn KnowledgeBase>,
}

impl AppState {
    /// Build the production collaborators from `config`.
    ///
    /// # Errors
    /// Returns an error if an HTTP client cannot be created.
    pub fn new(config: &AppConfig) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn ThreadStore> = Arc::new(MemoryStore::new());
        let runner: Arc<dyn Runner> =
            Arc::new(OpenAiRunner::new(&config.llm).context("failed to create the OpenAI client")?);
        let desk: Arc<dyn TicketDesk> =
            Arc::new(DeskClient::new(&config.desk).context("failed to create the Zoho Desk client")?);

        let settings = ToolSettings {
            default_from_email: config.desk.default_from_email.clone(),
            ticket_web_url: config.desk.ticket_web_url.clone(),
        };
        let server = SupportDeskServer::new(store, runner, desk, Agents::from_config(&config.llm), settings);

        let knowledge: Arc<dyn KnowledgeBase> = Arc::new(
            VectorStoreClient::new(&config.llm).context("failed to create the knowledge-base client")?,
        );

        Ok(Self::with_parts(server, knowledge))
    }

    /// Wrap already wired collaborators.
    #[must_use]
    pub fn with_parts(server: SupportDeskServer, knowledge: Arc<dyn KnowledgeBase>) -> Arc<Self> {
        Arc::new(Self { server, knowledge })
    }
}
