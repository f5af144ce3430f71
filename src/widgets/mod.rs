//! Widget trees rendered by the chat client.
//!
//! Widgets serialize as `{"type": "<Kind>", ...}` with camelCase fields; `None`
//! fields are omitted.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::desk::TicketSummary;

/// Tool name behind the card's "add note" button.
pub const OPEN_ADD_NOTE_FORM_TOOL: &str = "open_add_note_form";

/// Tool name the add-note form submits to.
pub const ADD_TICKET_NOTE_TOOL: &str = "add_ticket_note";

/// Action fired by a button or form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetAction {
    /// Action type, e.g. `tool` or `ticket.open`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Action payload.
    #[serde(default)]
    pub payload: Value,
    /// `server` when the backend handles the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl WidgetAction {
    /// Action invoking a tool with the given arguments.
    #[must_use]
    pub fn tool(name: &str, args: Value) -> Self {
        Self {
            kind: "tool".to_string(),
            payload: json!({ "tool": name, "args": args }),
            handler: None,
        }
    }
}

/// A node of a widget tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Widget {
    /// Root container.
    Card {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        children: Vec<Widget>,
    },
    /// Vertical stack.
    Col {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gap: Option<u8>,
        children: Vec<Widget>,
    },
    /// Horizontal stack.
    Row {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gap: Option<u8>,
        children: Vec<Widget>,
    },
    /// Heading.
    Title {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
    },
    /// Body text.
    Text {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_lines: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    /// Small secondary text.
    Caption {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<String>,
    },
    /// Colored label.
    Badge {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    /// Separator line.
    Divider {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flush: Option<bool>,
    },
    /// Flexible space.
    Spacer,
    /// Clickable button.
    Button {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_click_action: Option<WidgetAction>,
    },
    /// Input form.
    Form {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        title: String,
        submit_label: String,
        on_submit_action: WidgetAction,
        children: Vec<Widget>,
    },
    /// Text field inside a form.
    Input {
        name: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(default)]
        multiline: bool,
        #[serde(default)]
        required: bool,
    },
}

impl Widget {
    fn col(gap: u8, children: Vec<Self>) -> Self {
        Self::Col {
            gap: Some(gap),
            children,
        }
    }

    fn row(children: Vec<Self>) -> Self {
        Self::Row {
            gap: None,
            children,
        }
    }

    fn caption(value: impl Into<String>) -> Self {
        Self::Caption {
            value: value.into(),
            size: None,
        }
    }

    fn text(value: impl Into<String>, size: Option<&str>, max_lines: Option<u8>) -> Self {
        Self::Text {
            value: value.into(),
            size: size.map(str::to_string),
            max_lines,
            color: None,
        }
    }

    fn badge(label: impl Into<String>, color: Option<&str>) -> Self {
        Self::Badge {
            label: label.into(),
            color: color.map(str::to_string),
        }
    }

    const fn divider() -> Self {
        Self::Divider { flush: None }
    }

    /// Labelled detail line: caption, spacer, value.
    fn detail(label: &str, value: Self) -> Self {
        Self::row(vec![Self::caption(label), Self::Spacer, value])
    }
}

/// Card summarizing a ticket, with "open" and "add note" actions.
#[must_use]
pub fn ticket_card(ticket: &TicketSummary) -> Widget {
    let timing = if ticket.overdue && !ticket.overdue_by.is_empty() {
        Widget::badge(format!("En retard de {}", ticket.overdue_by), Some("danger"))
    } else {
        Widget::badge("À temps", Some("success"))
    };

    let header = Widget::col(
        2,
        vec![
            Widget::row(vec![
                Widget::Title {
                    value: format!("Ticket #{}", ticket.ticket_number),
                    size: Some("sm".to_string()),
                },
                Widget::Spacer,
                timing,
            ]),
            Widget::text(&ticket.subject, None, Some(2)),
            Widget::Row {
                gap: Some(2),
                children: vec![
                    Widget::badge(&ticket.status, Some("info")),
                    Widget::badge(&ticket.status_type, None),
                    Widget::badge(&ticket.channel, None),
                    Widget::badge(&ticket.product, None),
                ],
            },
        ],
    );

    let last_update = Widget::col(
        1,
        vec![
            Widget::row(vec![Widget::caption(format!(
                "Dernière mise à jour • {}",
                ticket.last_update_time
            ))]),
            Widget::text(&ticket.last_update_snippet, Some("sm"), Some(2)),
        ],
    );

    let details = Widget::col(
        2,
        vec![
            Widget::detail(
                "Contact",
                Widget::text(
                    format!("{} • {}", ticket.contact_name, ticket.account_name),
                    Some("sm"),
                    Some(1),
                ),
            ),
            Widget::detail(
                "Dû",
                Widget::Text {
                    value: ticket.due_date.clone(),
                    size: Some("sm".to_string()),
                    max_lines: None,
                    color: Some(if ticket.overdue { "danger" } else { "secondary" }.to_string()),
                },
            ),
            Widget::detail(
                "Département",
                Widget::text(&ticket.department_name, Some("sm"), Some(1)),
            ),
            Widget::detail("Modifié", Widget::text(&ticket.modified_time, Some("sm"), None)),
        ],
    );

    let actions = Widget::row(vec![
        Widget::Button {
            label: "Ouvrir dans Zoho Desk".to_string(),
            style: Some("primary".to_string()),
            variant: None,
            on_click_action: Some(WidgetAction {
                kind: "ticket.open".to_string(),
                payload: json!({ "id": ticket.ticket_id, "url": ticket.web_url }),
                handler: Some("server".to_string()),
            }),
        },
        Widget::Button {
            label: "Ajouter une note".to_string(),
            style: None,
            variant: Some("outline".to_string()),
            on_click_action: Some(WidgetAction::tool(
                OPEN_ADD_NOTE_FORM_TOOL,
                json!({ "ticket_id": ticket.ticket_id }),
            )),
        },
    ]);

    Widget::Card {
        key: Some("zoho_ticket".to_string()),
        size: Some("sm".to_string()),
        children: vec![
            header,
            Widget::Divider { flush: Some(true) },
            last_update,
            Widget::divider(),
            details,
            Widget::divider(),
            actions,
        ],
    }
}

/// Card wrapping the form that adds a private note to `ticket_id`.
#[must_use]
pub fn add_note_form(ticket_id: &str) -> Widget {
    let form = Widget::Form {
        key: Some(format!("add_note_form_inner_{ticket_id}")),
        title: "Ajouter une note".to_string(),
        submit_label: "Ajouter".to_string(),
        on_submit_action: WidgetAction::tool(ADD_TICKET_NOTE_TOOL, json!({ "ticket_id": ticket_id })),
        children: vec![
            Widget::Input {
                name: "note_content".to_string(),
                label: "Note".to_string(),
                placeholder: Some("Entrez votre note ici...".to_string()),
                multiline: true,
                required: true,
            },
            Widget::Caption {
                value: "Appuyez sur Entrée pour envoyer la note.".to_string(),
                size: Some("sm".to_string()),
            },
        ],
    };

    Widget::Card {
        key: Some(format!("add_note_card_{ticket_id}")),
        size: None,
        children: vec![form],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(overdue: bool) -> TicketSummary {
        TicketSummary {
            ticket_id: "9001".to_string(),
            ticket_number: "101".to_string(),
            subject: "Crevaison".to_string(),
            status: "Open".to_string(),
            status_type: "Open".to_string(),
            channel: "Email".to_string(),
            product: "Pneus".to_string(),
            contact_name: "Jean Dupont".to_string(),
            account_name: "Acme".to_string(),
            department_name: "Support".to_string(),
            due_date: "2025-03-08 12:00 UTC".to_string(),
            overdue,
            overdue_by: if overdue { "2 days".to_string() } else { String::new() },
            last_update_time: "2025-03-09 12:00 UTC".to_string(),
            last_update_snippet: "Pneu crevé".to_string(),
            modified_time: "2025-03-09 12:00 UTC".to_string(),
            web_url: "https://desk/9001".to_string(),
        }
    }

    #[test]
    fn test_widget_serialization_shape() {
        let value = serde_json::to_value(Widget::text("hi", Some("sm"), Some(2))).unwrap();
        assert_eq!(value, json!({"type": "Text", "value": "hi", "size": "sm", "maxLines": 2}));
        assert_eq!(serde_json::to_value(Widget::Spacer).unwrap(), json!({"type": "Spacer"}));
    }

    #[test]
    fn test_ticket_card_overdue_badge() {
        let card = serde_json::to_value(ticket_card(&summary(true))).unwrap();
        assert_eq!(card["key"], "zoho_ticket");
        let header_row = &card["children"][0]["children"][0]["children"];
        assert_eq!(header_row[0]["value"], "Ticket #101");
        assert_eq!(header_row[2]["label"], "En retard de 2 days");
        assert_eq!(header_row[2]["color"], "danger");

        let on_time = serde_json::to_value(ticket_card(&summary(false))).unwrap();
        assert_eq!(on_time["children"][0]["children"][0]["children"][2]["label"], "À temps");
    }

    #[test]
    fn test_ticket_card_actions() {
        let card = serde_json::to_value(ticket_card(&summary(false))).unwrap();
        let buttons = &card["children"][6]["children"];
        assert_eq!(buttons[0]["onClickAction"]["type"], "ticket.open");
        assert_eq!(buttons[0]["onClickAction"]["payload"]["url"], "https://desk/9001");
        assert_eq!(buttons[1]["onClickAction"]["payload"]["tool"], OPEN_ADD_NOTE_FORM_TOOL);
        assert_eq!(buttons[1]["onClickAction"]["payload"]["args"]["ticket_id"], "9001");
    }

    #[test]
    fn test_add_note_form() {
        let card = add_note_form("9001");
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["key"], "add_note_card_9001");
        let form = &value["children"][0];
        assert_eq!(form["type"], "Form");
        assert_eq!(form["submitLabel"], "Ajouter");
        assert_eq!(form["onSubmitAction"]["payload"]["tool"], ADD_TICKET_NOTE_TOOL);
        assert_eq!(form["children"][0]["name"], "note_content");
        assert_eq!(form["children"][0]["required"], true);

        let parsed: Widget = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, card);
    }
}
