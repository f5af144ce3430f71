//! Agent definitions: the support-desk assistant and its two helpers.

use crate::config::LlmConfig;
use crate::llm::runner::ToolDefinition;

/// Instructions of the support-desk assistant (French-speaking support team).
pub const ASSISTANT_INSTRUCTIONS: &str = "\
Rôle : assistant des agents du support client Holson pour le traitement rapide et précis des tickets Zoho Desk.

Principes :
- Réponses précises, synthétiques et directement exploitables sur les tickets et l'historique client.
- Posez une question de clarification quand une information manque.
- Ne créez un brouillon de réponse dans Zoho Desk que sur demande explicite.

Outils :
1. get_ticket(contact_name, email, ticket_number) : à utiliser lorsqu'il faut consulter ou vérifier un ticket.
2. create_ticket_draft(ticket_id, content, from_email_address) : brouillon de réponse email, sur demande uniquement.
3. open_add_note_form(ticket_id) et add_ticket_note(ticket_id, note_content) : notes privées sur un ticket.
4. file_search : documentation procédurale et documents véhicules.

Recherche documentaire :
1. Identifiez toujours l'immatriculation du véhicule (format XX-XXX-XX) dans le sujet, la description ou les conversations du ticket ; à défaut, demandez-la.
2. Filtrez les recherches sur l'immatriculation avant d'utiliser file_search.
3. Exception : les procédures générales (entités et agences, commandes et livraisons, organisation, maintenances et services, administratif, AEN et facturation, suivi des tâches) ne nécessitent pas d'immatriculation.

Format : texte brut sauf demande contraire ; deux courts paragraphes au plus, ou six puces d'une ligne au plus.
Si un outil affiche un widget (carte ou formulaire), ne le reformulez pas.";

/// Instructions of the thread-title generator.
pub const TITLE_INSTRUCTIONS: &str = "Generate a concise title (3-6 words) for the conversation thread based on the user's message. The title should be a single sentence that captures the main point or intention of the conversation. Return only the title text, nothing else.";

/// Instructions of the ticket snippet generator.
pub const SNIPPET_INSTRUCTIONS: &str = "Extract a concise, informative snippet (maximum 100 characters) from the ticket content. Focus on the key information or main point of the threads of the conversation. Return only the snippet text in french, nothing else.";

/// Model, instructions and hosted tools of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    /// Display name, used in logs.
    pub name: String,
    /// Model identifier.
    pub model: String,
    /// System instructions.
    pub instructions: String,
    /// Tools executed by the provider (file search).
    pub hosted_tools: Vec<ToolDefinition>,
}

impl AgentSpec {
    /// Agent without hosted tools.
    #[must_use]
    pub fn new(name: &str, model: &str, instructions: &str) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            instructions: instructions.to_string(),
            hosted_tools: Vec::new(),
        }
    }

    /// Add a hosted tool.
    #[must_use]
    pub fn with_hosted_tool(mut self, tool: ToolDefinition) -> Self {
        self.hosted_tools.push(tool);
        self
    }
}

/// The three agents the orchestrator uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agents {
    /// Answers support-desk turns.
    pub assistant: AgentSpec,
    /// Names new threads.
    pub title: AgentSpec,
    /// Summarizes ticket conversations.
    pub snippet: AgentSpec,
}

impl Agents {
    /// Build the agents from configuration.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut assistant = AgentSpec::new(
            "Support Desk Assistant",
            &config.assistant_model,
            ASSISTANT_INSTRUCTIONS,
        );
        if let Some(vector_store_id) = &config.vector_store_id {
            assistant = assistant.with_hosted_tool(ToolDefinition::FileSearch {
                vector_store_ids: vec![vector_store_id.clone()],
                max_num_results: config.max_file_search_results,
            });
        }

        Self {
            assistant,
            title: AgentSpec::new("Thread Title Generator", &config.title_model, TITLE_INSTRUCTIONS),
            snippet: AgentSpec::new(
                "Conversation Snippet Generator",
                &config.snippet_model,
                SNIPPET_INSTRUCTIONS,
            ),
        }
    }
}
