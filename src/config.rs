//! Runtime configuration for the support-desk agent.
//!
//! Values come from the environment (`SUPPORT_DESK_*`, `OPENAI_*`, `ZOHO_*`)
//! and fall back to the defaults below.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    /// A value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A URL setting does not parse.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Text-generation settings.
    pub llm: LlmConfig,
    /// Ticketing system settings.
    pub desk: DeskConfig,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(port) = env_var("SUPPORT_DESK_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SUPPORT_DESK_PORT={port}")))?;
        }

        config.llm.api_key = env_var("OPENAI_API_KEY");
        if let Some(base_url) = env_var("OPENAI_BASE_URL") {
            config.llm.base_url = base_url;
        }
        if let Some(model) = env_var("SUPPORT_DESK_ASSISTANT_MODEL") {
            config.llm.assistant_model = model;
        }
        if let Some(model) = env_var("SUPPORT_DESK_TITLE_MODEL") {
            config.llm.title_model = model;
        }
        if let Some(model) = env_var("SUPPORT_DESK_SNIPPET_MODEL") {
            config.llm.snippet_model = model;
        }
        config.llm.vector_store_id = env_var("KNOWLEDGE_VECTOR_STORE_ID");

        config.desk.client_id = env_var("ZOHO_CLIENT_ID");
        config.desk.client_secret = env_var("ZOHO_CLIENT_SECRET");
        config.desk.refresh_token = env_var("ZOHO_REFRESH_TOKEN");
        config.desk.org_id = env_var("ZOHO_ORG_ID");
        if let Some(url) = env_var("ZOHO_ACCOUNTS_URL") {
            config.desk.accounts_url = url;
        }
        if let Some(url) = env_var("ZOHO_DESK_API_URL") {
            config.desk.api_url = url;
        }
        config.desk.search_url = env_var("ZOHO_TICKET_SEARCH_URL");
        config.desk.search_api_key = env_var("ZOHO_TICKET_SEARCH_API_KEY");
        if let Some(email) = env_var("ZOHO_DEFAULT_FROM_EMAIL") {
            config.desk.default_from_email = email;
        }
        if let Some(url) = env_var("ZOHO_TICKET_WEB_URL") {
            config.desk.ticket_web_url = url;
        }

        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are missing, out of range or invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".to_string()));
        }

        if self.llm.api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        if self.llm.max_tool_rounds == 0 {
            return Err(ConfigError::Invalid(
                "llm.max_tool_rounds must be > 0".to_string(),
            ));
        }

        if self.llm.request_timeout_secs == 0 || self.desk.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeouts must be > 0".to_string(),
            ));
        }

        Url::parse(&self.llm.base_url)?;
        Url::parse(&self.desk.accounts_url)?;
        Url::parse(&self.desk.api_url)?;
        if let Some(search_url) = &self.desk.search_url {
            Url::parse(search_url)?;
        }

        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Text-generation collaborator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key for the Responses API.
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Model answering support-desk turns.
    pub assistant_model: String,
    /// Model generating thread titles.
    pub title_model: String,
    /// Model summarizing ticket conversations.
    pub snippet_model: String,
    /// Vector store searched by the hosted file-search tool.
    pub vector_store_id: Option<String>,
    /// Maximum file-search results per query.
    pub max_file_search_results: u32,
    /// Maximum tool-call round trips per turn.
    pub max_tool_rounds: usize,
    /// HTTP timeout for one request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            assistant_model: "gpt-5.1-chat-latest".to_string(),
            title_model: "gpt-4.1-mini".to_string(),
            snippet_model: "gpt-4.1-mini".to_string(),
            vector_store_id: None,
            max_file_search_results: 5,
            max_tool_rounds: 8,
            request_timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the knowledge vector store.
    #[must_use]
    pub fn with_vector_store(mut self, id: impl Into<String>) -> Self {
        self.vector_store_id = Some(id.into());
        self
    }
}

/// Ticketing system settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeskConfig {
    /// OAuth client id.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Long-lived refresh token.
    pub refresh_token: Option<String>,
    /// Organization id sent as the `orgId` header.
    pub org_id: Option<String>,
    /// OAuth accounts server.
    pub accounts_url: String,
    /// REST API base URL.
    pub api_url: String,
    /// Ticket search function URL (API-key authenticated).
    pub search_url: Option<String>,
    /// API key for the search function.
    pub search_api_key: Option<String>,
    /// Sender address for draft replies.
    pub default_from_email: String,
    /// Prefix of the agent-facing ticket URL; the ticket id is appended.
    pub ticket_web_url: String,
    /// HTTP timeout for one request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            org_id: None,
            accounts_url: "https://accounts.zoho.eu".to_string(),
            api_url: "https://desk.zoho.eu/api/v1".to_string(),
            search_url: None,
            search_api_key: None,
            default_from_email: "driver@holson.fr".to_string(),
            ticket_web_url: "https://support.holson.fr/support/holson/ShowHomePage.do#Cases/dv/"
                .to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl DeskConfig {
    /// Set OAuth credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Point the client at another API and accounts server.
    #[must_use]
    pub fn with_urls(mut self, api_url: impl Into<String>, accounts_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self.accounts_url = accounts_url.into();
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
