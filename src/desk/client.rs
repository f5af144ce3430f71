//! REST client for the ticketing API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::config::DeskConfig;
use crate::desk::auth::DeskAuth;
use crate::desk::errors::{DeskError, DeskResult};

/// Boxed future returned by [`TicketDesk`] methods.
pub type DeskFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Optional filters for locating the latest ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFilter {
    /// Account / company name.
    #[serde(default)]
    pub contact_name: Option<String>,
    /// Contact email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Human-facing ticket number.
    #[serde(default)]
    pub ticket_number: Option<String>,
}

impl TicketFilter {
    /// True when no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
    }

    /// The most specific filter value, used in "not found" messages.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        [&self.ticket_number, &self.email, &self.contact_name]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .find(|value| !value.is_empty())
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(name) = self.contact_name.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("accountName", name));
        }
        if let Some(email) = self.email.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("email", email));
        }
        if let Some(number) = self.ticket_number.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("ticketNumber", number));
        }
        pairs
    }
}

/// Operations the assistant's tools need from the ticketing system.
pub trait TicketDesk: Send + Sync {
    /// Most recently modified ticket matching `filter`, if any.
    fn latest_ticket(&self, filter: &TicketFilter) -> DeskFuture<'_, DeskResult<Option<Value>>>;

    /// Conversations (threads) of a ticket.
    fn ticket_conversations(&self, ticket_id: &str) -> DeskFuture<'_, DeskResult<Vec<Value>>>;

    /// Create an email draft reply on a ticket.
    fn create_draft_reply(
        &self,
        ticket_id: &str,
        content: &str,
        from_email: &str,
    ) -> DeskFuture<'_, DeskResult<Value>>;

    /// Add a private comment to a ticket.
    fn add_private_note(&self, ticket_id: &str, content: &str) -> DeskFuture<'_, DeskResult<Value>>;
}

/// HTTP implementation of [`TicketDesk`].
#[derive(Debug)]
pub struct DeskClient {
    http: reqwest::Client,
    auth: DeskAuth,
    api_url: String,
    search_url: Option<String>,
    search_api_key: Option<String>,
}

impl DeskClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or a URL is invalid.
    pub fn new(config: &DeskConfig) -> DeskResult<Self> {
        Url::parse(&config.api_url)?;
        if let Some(search_url) = &config.search_url {
            Url::parse(search_url)?;
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            auth: DeskAuth::new(config, http.clone()),
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            search_url: config.search_url.clone(),
            search_api_key: config.search_api_key.clone(),
        })
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> DeskResult<Value> {
        let headers = self.auth.headers().await?;
        let url = format!("{}/{endpoint}", self.api_url);
        debug!(%method, %url, "ticketing request");

        let mut request = self.http.request(method, &url).headers(headers).query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %url, %body, "ticketing request failed");
            return Err(DeskError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Some endpoints answer 204 with no body.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn search_function(&self, search_url: &str, filter: &TicketFilter) -> DeskResult<Value> {
        let mut url = Url::parse(search_url)?;
        {
            let mut params = url.query_pairs_mut();
            if let Some(key) = &self.search_api_key {
                params.append_pair("auth_type", "apikey");
                params.append_pair("zapikey", key);
            }
            for (name, value) in filter.pairs() {
                params.append_pair(name, value);
            }
        }

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "ticket search failed");
            return Err(DeskError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        match body.pointer("/details/output") {
            Some(Value::String(output)) if output.trim().is_empty() => Ok(Value::Null),
            Some(Value::String(output)) => Ok(serde_json::from_str(output)?),
            Some(other) => Ok(other.clone()),
            None => Err(DeskError::UnexpectedResponse(
                "search response has no details.output".to_string(),
            )),
        }
    }
}

/// Reduce a list / search response to its first ticket.
#[must_use]
pub fn first_ticket(response: Value) -> Option<Value> {
    match response {
        Value::Array(tickets) => tickets.into_iter().next(),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(tickets)) => tickets.into_iter().next(),
            Some(other) => {
                map.insert("data".to_string(), other);
                Some(Value::Object(map))
            }
            None if map.is_empty() => None,
            None => Some(Value::Object(map)),
        },
        _ => None,
    }
}

impl TicketDesk for DeskClient {
    fn latest_ticket(&self, filter: &TicketFilter) -> DeskFuture<'_, DeskResult<Option<Value>>> {
        let filter = filter.clone();
        Box::pin(async move {
            debug!(?filter, "looking up latest ticket");
            let response = if filter.is_empty() {
                self.request(
                    Method::GET,
                    "tickets",
                    &[("limit", "1"), ("sortBy", "modifiedTime"), ("sortOrder", "desc")],
                    None,
                )
                .await?
            } else if let Some(search_url) = self.search_url.as_deref() {
                self.search_function(search_url, &filter).await?
            } else {
                let mut query = vec![("limit", "1")];
                for (name, value) in filter.pairs() {
                    let name = if name == "accountName" { "contactName" } else { name };
                    query.push((name, value));
                }
                self.request(Method::GET, "tickets/search", &query, None).await?
            };
            Ok(first_ticket(response))
        })
    }

    fn ticket_conversations(&self, ticket_id: &str) -> DeskFuture<'_, DeskResult<Vec<Value>>> {
        let endpoint = format!("tickets/{ticket_id}/conversations");
        Box::pin(async move {
            let response = self.request(Method::GET, &endpoint, &[], None).await?;
            match response {
                Value::Object(mut map) => match map.remove("data") {
                    Some(Value::Array(conversations)) => Ok(conversations),
                    _ => Ok(Vec::new()),
                },
                Value::Null => Ok(Vec::new()),
                _ => Err(DeskError::UnexpectedResponse(
                    "conversations response is not an object".to_string(),
                )),
            }
        })
    }

    fn create_draft_reply(
        &self,
        ticket_id: &str,
        content: &str,
        from_email: &str,
    ) -> DeskFuture<'_, DeskResult<Value>> {
        let endpoint = format!("tickets/{ticket_id}/draftReply");
        let body = json!({
            "channel": "EMAIL",
            "content": content,
            "contentType": "plainText",
            "fromEmailAddress": from_email,
        });
        Box::pin(async move { self.request(Method::POST, &endpoint, &[], Some(body)).await })
    }

    fn add_private_note(&self, ticket_id: &str, content: &str) -> DeskFuture<'_, DeskResult<Value>> {
        let endpoint = format!("tickets/{ticket_id}/comments");
        let body = json!({
            "content": content,
            "isPublic": "false",
            "contentType": "plainText",
        });
        Box::pin(async move { self.request(Method::POST, &endpoint, &[], Some(body)).await })
    }
}
