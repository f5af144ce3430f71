//! Ticketing tools offered to the assistant.
//!
//! Every tool publishes a progress update before touching the ticketing system.
//! Failures are returned to the model as `{success: false, message, error}`.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::agent::context::AgentContext;
use crate::agent::errors::ToolError;
use crate::desk::ticket::{self, NO_UPDATES, TicketSummary};
use crate::desk::{TicketDesk, TicketFilter, tool_view};
use crate::llm::{AgentSpec, RunFuture, Runner, ToolDefinition, ToolHandler};
use crate::widgets::{self, ADD_TICKET_NOTE_TOOL, OPEN_ADD_NOTE_FORM_TOOL};

/// Tool fetching the latest matching ticket.
pub const GET_TICKET_TOOL: &str = "get_ticket";
/// Tool creating an email draft reply.
pub const CREATE_TICKET_DRAFT_TOOL: &str = "create_ticket_draft";

/// Ticketing settings the tools need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Sender used when the model gives none.
    pub default_from_email: String,
    /// Prefix of the agent-facing ticket URL.
    pub ticket_web_url: String,
}

/// Shared dependencies of the ticket tools.
pub struct Toolbox {
    desk: Arc<dyn TicketDesk>,
    runner: Arc<dyn Runner>,
    snippet_agent: AgentSpec,
    settings: ToolSettings,
}

impl Toolbox {
    /// Create a toolbox.
    #[must_use]
    pub fn new(
        desk: Arc<dyn TicketDesk>,
        runner: Arc<dyn Runner>,
        snippet_agent: AgentSpec,
        settings: ToolSettings,
    ) -> Self {
        Self {
            desk,
            runner,
            snippet_agent,
            settings,
        }
    }

    /// Bind the tools to one turn.
    #[must_use]
    pub fn for_turn(self: &Arc<Self>, context: AgentContext) -> TurnTools {
        TurnTools {
            toolbox: Arc::clone(self),
            context,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DraftArgs {
    ticket_id: String,
    content: String,
    #[serde(default)]
    from_email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TicketIdArgs {
    ticket_id: String,
}

#[derive(Debug, Deserialize)]
struct NoteArgs {
    ticket_id: String,
    note_content: String,
}

/// Tools bound to the context of a single turn.
pub struct TurnTools {
    toolbox: Arc<Toolbox>,
    context: AgentContext,
}

fn arguments<T: DeserializeOwned>(value: Value) -> Result<T, ToolError> {
    // Models send `{}` or nothing at all for parameterless calls.
    let value = if value.is_null() { json!({}) } else { value };
    Ok(serde_json::from_value(value)?)
}

fn failure(message: &str, error: &ToolError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "message": message,
    })
}

impl TurnTools {
    async fn get_ticket(&self, filter: TicketFilter) -> Result<Value, ToolError> {
        self.context.progress("Fetching ticket from Zoho Desk...");
        let desk = &self.toolbox.desk;

        let Some(mut ticket) = desk.latest_ticket(&filter).await? else {
            let message = filter
                .search_term()
                .map_or_else(|| "No ticket found".to_string(), |term| format!("No ticket found for: {term}"));
            return Ok(json!({ "success": false, "message": message }));
        };

        let ticket_id = ticket::string_value(ticket.get("id"), "");
        if ticket::conversations(&ticket).is_empty() && !ticket_id.is_empty() {
            match desk.ticket_conversations(&ticket_id).await {
                Ok(conversations) => {
                    if let Some(map) = ticket.as_object_mut() {
                        map.insert("conversations".to_string(), Value::Array(conversations));
                    }
                }
                Err(err) => warn!(%ticket_id, error = %err, "failed to fetch ticket conversations"),
            }
        }

        let snippet = self.snippet(&ticket).await;
        let summary = TicketSummary::from_ticket(
            &ticket,
            snippet,
            &self.toolbox.settings.ticket_web_url,
            Utc::now(),
        );
        self.context
            .stream_widget(widgets::ticket_card(&summary), Some(summary.copy_text()))
            .await?;
        info!(%ticket_id, ticket_number = %summary.ticket_number, "ticket card streamed");

        Ok(json!({ "success": true, "ticket": tool_view(&ticket) }))
    }

    async fn snippet(&self, ticket: &Value) -> String {
        if ticket::conversations(ticket).is_empty() {
            return NO_UPDATES.to_string();
        }

        let ticket_json = serde_json::to_string_pretty(ticket).unwrap_or_else(|_| ticket.to_string());
        let input =
            format!("Extract a concise summary (max 100 characters) from this ticket data:\n\n{ticket_json}");
        match self.toolbox.runner.run(&self.toolbox.snippet_agent, &input).await {
            Ok(text) => ticket::truncate_snippet(text.trim()),
            Err(err) => {
                warn!(error = %err, "snippet generation failed, using conversation text");
                ticket::fallback_snippet(ticket)
            }
        }
    }

    async fn create_ticket_draft(&self, args: DraftArgs) -> Result<Value, ToolError> {
        self.context.progress("Creating draft reply in Zoho Desk...");
        let from = args
            .from_email_address
            .filter(|address| !address.is_empty())
            .unwrap_or_else(|| self.toolbox.settings.default_from_email.clone());

        let result = self
            .toolbox
            .desk
            .create_draft_reply(&args.ticket_id, &args.content, &from)
            .await?;
        info!(ticket_id = %args.ticket_id, "draft reply created");

        Ok(json!({
            "success": true,
            "message": "Draft reply created successfully.",
            "data": result,
        }))
    }

    async fn open_add_note_form(&self, args: TicketIdArgs) -> Result<Value, ToolError> {
        self.context
            .stream_widget(widgets::add_note_form(&args.ticket_id), None)
            .await?;
        Ok(json!("Formulaire d'ajout de note ouvert."))
    }

    async fn add_ticket_note(&self, args: NoteArgs) -> Result<Value, ToolError> {
        self.context.progress("Adding note to Zoho Desk...");
        let result = self
            .toolbox
            .desk
            .add_private_note(&args.ticket_id, &args.note_content)
            .await?;
        info!(ticket_id = %args.ticket_id, "private note added");

        Ok(json!({
            "success": true,
            "message": format!("Note ajoutée avec succès : \"{}\"", args.note_content),
            "data": result,
        }))
    }
}

impl ToolHandler for TurnTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    fn call(&self, name: &str, arguments_json: Value) -> RunFuture<'_, Value> {
        let name = name.to_string();
        Box::pin(async move {
            let (message, outcome) = match name.as_str() {
                GET_TICKET_TOOL => (
                    "Failed to fetch ticket from Zoho Desk",
                    match arguments(arguments_json) {
                        Ok(filter) => self.get_ticket(filter).await,
                        Err(err) => Err(err),
                    },
                ),
                CREATE_TICKET_DRAFT_TOOL => (
                    "Failed to create draft reply.",
                    match arguments(arguments_json) {
                        Ok(args) => self.create_ticket_draft(args).await,
                        Err(err) => Err(err),
                    },
                ),
                OPEN_ADD_NOTE_FORM_TOOL => (
                    "Failed to open the note form.",
                    match arguments(arguments_json) {
                        Ok(args) => self.open_add_note_form(args).await,
                        Err(err) => Err(err),
                    },
                ),
                ADD_TICKET_NOTE_TOOL => (
                    "Failed to add note.",
                    match arguments(arguments_json) {
                        Ok(args) => self.add_ticket_note(args).await,
                        Err(err) => Err(err),
                    },
                ),
                other => {
                    warn!(tool = %other, "model called an unknown tool");
                    return json!({ "success": false, "message": format!("Unknown tool: {other}") });
                }
            };

            outcome.unwrap_or_else(|err| {
                warn!(tool = %name, error = %err, "tool call failed");
                failure(message, &err)
            })
        })
    }
}

/// Function tools offered to the assistant.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            GET_TICKET_TOOL,
            "Get the latest ticket from Zoho Desk, optionally filtered by account name, email, or ticket number. Without filters, returns the most recently modified ticket. Displays a ticket card to the agent.",
            json!({
                "type": "object",
                "properties": {
                    "contact_name": {"type": "string", "description": "Account (company/client) name."},
                    "email": {"type": "string", "description": "Contact email address."},
                    "ticket_number": {"type": "string", "description": "Ticket number, e.g. \"101\"."}
                }
            }),
        ),
        ToolDefinition::function(
            CREATE_TICKET_DRAFT_TOOL,
            "Create a draft email reply on a Zoho Desk ticket. Only when explicitly asked.",
            json!({
                "type": "object",
                "properties": {
                    "ticket_id": {"type": "string", "description": "Ticket id (not the ticket number)."},
                    "content": {"type": "string", "description": "Body of the draft reply."},
                    "from_email_address": {"type": "string", "description": "Configured support address to send from."}
                },
                "required": ["ticket_id", "content"]
            }),
        ),
        ToolDefinition::function(
            OPEN_ADD_NOTE_FORM_TOOL,
            "Display a form letting the agent type a private note for a ticket.",
            json!({
                "type": "object",
                "properties": {
                    "ticket_id": {"type": "string", "description": "Ticket id."}
                },
                "required": ["ticket_id"]
            }),
        ),
        ToolDefinition::function(
            ADD_TICKET_NOTE_TOOL,
            "Add a private note (internal comment) to a Zoho Desk ticket.",
            json!({
                "type": "object",
                "properties": {
                    "ticket_id": {"type": "string", "description": "Ticket id."},
                    "note_content": {"type": "string", "description": "Text of the note."}
                },
                "required": ["ticket_id", "note_content"]
            }),
        ),
    ]
}
