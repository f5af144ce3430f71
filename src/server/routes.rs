//! HTTP route handlers for the support-desk agent.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::Serialize;
use serde_json::json;

use crate::agent::{AgentError, Citation, ProcessResult, ThreadStreamEvent, process};

use super::knowledge::knowledge_router;
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/support/chatkit", post(chatkit))
        .route("/support/health", get(health_check))
        .route("/support/threads/{thread_id}/citations", get(thread_citations))
        .merge(knowledge_router())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Orchestrator failure mapped to an HTTP status.
#[derive(Debug)]
pub struct AppError(AgentError);

impl From<AgentError> for AppError {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AgentError::Store(_) => StatusCode::NOT_FOUND,
            AgentError::Protocol(_) | AgentError::UnsupportedAttachment(_) => StatusCode::BAD_REQUEST,
            AgentError::Llm(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request rejected");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

fn sse_event(event: &ThreadStreamEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

/// Chat protocol endpoint: streamed turns as SSE, everything else as JSON.
async fn chatkit(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, AppError> {
    match process(&state.server, &body).await? {
        ProcessResult::Streaming(events) => {
            let stream = events.map(|event| {
                let event = event.unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "turn failed while streaming");
                    ThreadStreamEvent::Error {
                        message: err.to_string(),
                        allow_retry: true,
                    }
                });
                Ok::<_, Infallible>(sse_event(&event))
            });
            Ok(Sse::new(stream).keep_alive(KeepAlive::default()).into_response())
        }
        ProcessResult::Json(value) => Ok(Json(value).into_response()),
    }
}

/// Citations response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationsResponse {
    /// Distinct cited document ids, sorted.
    pub document_ids: Vec<String>,
    /// Citations of the latest cited assistant message.
    pub citations: Vec<Citation>,
}

impl From<Vec<Citation>> for CitationsResponse {
    fn from(citations: Vec<Citation>) -> Self {
        let document_ids: BTreeSet<String> = citations.iter().map(|c| c.document_id.clone()).collect();
        Self {
            document_ids: document_ids.into_iter().collect(),
            citations,
        }
    }
}

/// Knowledge-base citations of the thread's latest cited answer.
async fn thread_citations(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<CitationsResponse>, (StatusCode, Json<serde_json::Value>)> {
    let citations = state.server.latest_citations(&thread_id).await.map_err(|e| {
        tracing::debug!(%thread_id, error = %e, "citations unavailable");
        (StatusCode::NOT_FOUND, Json(json!({ "detail": e.to_string() })))
    })?;

    Ok(Json(CitationsResponse::from(citations)))
}
