//! Ticket field extraction and formatting for the ticket card.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum characters kept in a conversation snippet.
pub const SNIPPET_MAX_CHARS: usize = 100;

/// Snippet shown when a ticket has no conversations.
pub const NO_UPDATES: &str = "No updates";

/// Snippet shown when a conversation has no text.
pub const NO_CONTENT: &str = "No content";

static SCRIPT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").ok());
static STYLE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").ok());
static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());
static SPACE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Parse an ISO-8601 timestamp; naive timestamps are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as `YYYY-MM-DD HH:MM UTC`.
///
/// Absent values give `N/A`; unparsable values are returned unchanged.
#[must_use]
pub fn format_datetime(raw: Option<&str>) -> String {
    match raw.filter(|value| !value.is_empty()) {
        None => "N/A".to_string(),
        Some(value) => parse_timestamp(value)
            .map_or_else(|| value.to_string(), |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string()),
    }
}

/// Whether a due date has passed, and by how much.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overdue {
    /// The due date is in the past.
    pub overdue: bool,
    /// Human-readable lateness, empty when not overdue.
    pub by: String,
}

/// Compare a due date against `now`.
#[must_use]
pub fn calculate_overdue(due: Option<&str>, now: DateTime<Utc>) -> Overdue {
    let Some(due) = due.filter(|value| !value.is_empty()).and_then(parse_timestamp) else {
        return Overdue::default();
    };
    if due > now {
        return Overdue::default();
    }

    let delta = now - due;
    let days = delta.num_days();
    let hours = (delta.num_seconds() % 86_400) / 3_600;

    let by = if days > 0 {
        format!("{days} day{}", if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("{hours} hour{}", if hours == 1 { "" } else { "s" })
    } else {
        "Less than 1 hour".to_string()
    };
    Overdue { overdue: true, by }
}

/// Remove tags, scripts and styles, decode common entities and collapse whitespace.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let mut text = html.to_string();
    for re in [&*SCRIPT_RE, &*STYLE_RE, &*TAG_RE].into_iter().flatten() {
        text = re.replace_all(&text, "").into_owned();
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    match SPACE_RE.as_ref() {
        Some(re) => re.replace_all(&text, " ").trim().to_string(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Cut `text` to [`SNIPPET_MAX_CHARS`] characters, appending `...` when shortened.
#[must_use]
pub fn truncate_snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(SNIPPET_MAX_CHARS).collect();
    format!("{}...", head.trim())
}

/// Render a scalar or `{name|label|value}` object as a display string.
#[must_use]
pub fn string_value(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => ["name", "label", "value"]
            .iter()
            .find_map(|key| map.get(*key))
            .map_or_else(|| default.to_string(), |inner| string_value(Some(inner), default)),
        Some(Value::Bool(false)) => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// First field among `keys` holding a non-empty value.
fn first_present<'a>(ticket: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| ticket.get(*key)).find(|value| match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    })
}

fn timestamp_of(conversation: &Value) -> Option<&str> {
    first_present(conversation, &["modifiedTime", "createdTime"]).and_then(Value::as_str)
}

/// The ticket's conversations, empty when absent.
#[must_use]
pub fn conversations(ticket: &Value) -> &[Value] {
    ticket
        .get("conversations")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// The most recently modified (or created) conversation.
#[must_use]
pub fn latest_conversation(ticket: &Value) -> Option<&Value> {
    conversations(ticket)
        .iter()
        .max_by(|a, b| timestamp_of(a).unwrap_or("").cmp(timestamp_of(b).unwrap_or("")))
}

/// Last update time shown on the card.
#[must_use]
pub fn last_update_time(ticket: &Value) -> String {
    match latest_conversation(ticket) {
        Some(conversation) => format_datetime(timestamp_of(conversation)),
        None => format_datetime(ticket.get("modifiedTime").and_then(Value::as_str)),
    }
}

/// Snippet built from the raw text of the latest conversation.
#[must_use]
pub fn fallback_snippet(ticket: &Value) -> String {
    let Some(conversation) = latest_conversation(ticket) else {
        return NO_UPDATES.to_string();
    };
    let plain = match conversation.get("content") {
        Some(Value::String(html)) => strip_html(html),
        None | Some(Value::Null) => String::new(),
        Some(other) => strip_html(&other.to_string()),
    };
    if plain.is_empty() {
        NO_CONTENT.to_string()
    } else {
        truncate_snippet(&plain)
    }
}

/// Display-ready ticket fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    /// Internal ticket id.
    pub ticket_id: String,
    /// Human-facing ticket number.
    pub ticket_number: String,
    /// Subject line.
    pub subject: String,
    /// Status label.
    pub status: String,
    /// Status category.
    pub status_type: String,
    /// Channel the ticket arrived on.
    pub channel: String,
    /// Product name.
    pub product: String,
    /// Contact full name.
    pub contact_name: String,
    /// Contact's account.
    pub account_name: String,
    /// Department name.
    pub department_name: String,
    /// Formatted due date.
    pub due_date: String,
    /// Due date has passed.
    pub overdue: bool,
    /// Lateness description.
    pub overdue_by: String,
    /// Formatted time of the latest conversation.
    pub last_update_time: String,
    /// Short summary of the latest activity.
    pub last_update_snippet: String,
    /// Formatted modification time.
    pub modified_time: String,
    /// Agent-facing URL of the ticket.
    pub web_url: String,
}

impl TicketSummary {
    /// Extract card fields from a raw ticket.
    #[must_use]
    pub fn from_ticket(ticket: &Value, snippet: String, web_url_base: &str, now: DateTime<Utc>) -> Self {
        let ticket_id = string_value(ticket.get("id"), "");

        let (contact_name, account_name) = match ticket.get("contact") {
            Some(Value::Object(contact)) => {
                let first = contact.get("firstName").and_then(Value::as_str).unwrap_or("");
                let last = contact.get("lastName").and_then(Value::as_str).unwrap_or("");
                let full = format!("{first} {last}").trim().to_string();
                let account = contact
                    .get("accountName")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .or_else(|| {
                        contact
                            .get("account")
                            .and_then(|account| account.get("accountName"))
                            .and_then(Value::as_str)
                    })
                    .unwrap_or("N/A");
                (
                    if full.is_empty() { "Unknown".to_string() } else { full },
                    account.to_string(),
                )
            }
            _ => ("Unknown".to_string(), "N/A".to_string()),
        };

        let department_name = match ticket.get("department") {
            Some(Value::Object(department)) => string_value(department.get("name"), "N/A"),
            _ => string_value(ticket.get("departmentName"), "N/A"),
        };

        let due = first_present(ticket, &["dueDate", "dueDateTime"]).and_then(Value::as_str);
        let overdue = calculate_overdue(due, now);

        Self {
            web_url: format!("{web_url_base}{ticket_id}"),
            ticket_id,
            ticket_number: string_value(ticket.get("ticketNumber"), "N/A"),
            subject: string_value(ticket.get("subject"), "No subject"),
            status: string_value(ticket.get("status"), "Unknown"),
            status_type: string_value(first_present(ticket, &["statusType", "statusTypeName"]), "Unknown"),
            channel: string_value(ticket.get("channel"), "Unknown"),
            product: string_value(first_present(ticket, &["product", "productName"]), "N/A"),
            contact_name,
            account_name,
            department_name,
            due_date: format_datetime(due),
            overdue: overdue.overdue,
            overdue_by: overdue.by,
            last_update_time: last_update_time(ticket),
            last_update_snippet: snippet,
            modified_time: format_datetime(ticket.get("modifiedTime").and_then(Value::as_str)),
        }
    }

    /// Plain-text stand-in for the card.
    #[must_use]
    pub fn copy_text(&self) -> String {
        format!(
            "Ticket #{}: {} - Status: {}",
            self.ticket_number, self.subject, self.status
        )
    }
}

/// Ticket fields handed back to the model after a lookup.
#[must_use]
pub fn tool_view(ticket: &Value) -> Value {
    let field = |key: &str| ticket.get(key).cloned().unwrap_or(Value::Null);
    let contact = match ticket.get("contactId") {
        Some(id) if !id.is_null() => {
            let name = |key: &str| {
                ticket
                    .get("contact")
                    .and_then(|contact| contact.get(key))
                    .cloned()
                    .unwrap_or(Value::Null)
            };
            serde_json::json!({
                "id": id,
                "email": field("email"),
                "firstName": name("firstName"),
                "lastName": name("lastName"),
            })
        }
        _ => Value::Null,
    };

    serde_json::json!({
        "id": field("id"),
        "ticketNumber": field("ticketNumber"),
        "subject": field("subject"),
        "status": field("status"),
        "priority": field("priority"),
        "channel": field("channel"),
        "createdTime": field("createdTime"),
        "modifiedTime": field("modifiedTime"),
        "conversations": Value::Array(conversations(ticket).to_vec()),
        "contact": contact,
        "description": field("description"),
    })
}
