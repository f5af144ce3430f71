//! Runner backed by the OpenAI Responses API.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::llm::agents::AgentSpec;
use crate::llm::errors::{LlmError, LlmResult};
use crate::llm::runner::{AgentEvent, AgentEventStream, RunFuture, Runner, ToolDefinition, ToolHandler};
use crate::llm::sse::{SseEvent, SseLineBuffer};
use crate::store::Annotation;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEvent {
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta { item_id: String, delta: String },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { item: OutputItem },
    #[serde(rename = "response.completed")]
    Completed { response: ResponseBody },
    #[serde(rename = "response.failed")]
    Failed { response: ResponseBody },
    #[serde(rename = "response.incomplete")]
    Incomplete { response: ResponseBody },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    id: String,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum OutputItem {
    #[serde(rename = "message")]
    Message {
        id: String,
        #[serde(default)]
        content: Vec<OutputContent>,
    },
    #[serde(rename = "function_call")]
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum OutputContent {
    #[serde(rename = "output_text")]
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<RawAnnotation>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    index: Option<usize>,
}

impl From<RawAnnotation> for Annotation {
    fn from(raw: RawAnnotation) -> Self {
        Self {
            file_id: raw.file_id,
            filename: raw.filename,
            title: raw.title,
            index: raw.index,
        }
    }
}

/// What one SSE payload means for the run.
enum Step {
    Emit(AgentEvent),
    Completed(ResponseBody),
    Skip,
}

fn decode_event(payload: &str) -> LlmResult<Step> {
    let step = match serde_json::from_str::<RawEvent>(payload)? {
        RawEvent::OutputTextDelta { item_id, delta } => Step::Emit(AgentEvent::TextDelta { item_id, delta }),
        RawEvent::OutputItemDone {
            item: OutputItem::Message { id, content },
        } => {
            let (text, annotations) = message_text(content);
            Step::Emit(AgentEvent::MessageDone {
                item_id: id,
                text,
                annotations,
            })
        }
        RawEvent::Completed { response } => Step::Completed(response),
        RawEvent::Failed { response } | RawEvent::Incomplete { response } => {
            let message = response
                .error
                .map_or_else(|| format!("response {} did not complete", response.id), |error| error.message);
            return Err(LlmError::RunFailed(message));
        }
        RawEvent::Error { message } => {
            return Err(LlmError::RunFailed(message.unwrap_or_else(|| "unknown error".to_string())));
        }
        RawEvent::OutputItemDone { .. } | RawEvent::Other => Step::Skip,
    };
    Ok(step)
}

fn message_text(content: Vec<OutputContent>) -> (String, Vec<Annotation>) {
    let mut text = String::new();
    let mut annotations = Vec::new();
    for part in content {
        if let OutputContent::OutputText {
            text: part_text,
            annotations: part_annotations,
        } = part
        {
            text.push_str(&part_text);
            annotations.extend(part_annotations.into_iter().map(Annotation::from));
        }
    }
    (text, annotations)
}

fn output_text(output: Vec<OutputItem>) -> String {
    output
        .into_iter()
        .filter_map(|item| match item {
            OutputItem::Message { content, .. } => Some(message_text(content).0),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct FunctionCall {
    call_id: String,
    name: String,
    arguments: String,
}

fn function_calls(output: &[OutputItem]) -> Vec<FunctionCall> {
    output
        .iter()
        .filter_map(|item| match item {
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => Some(FunctionCall {
                call_id: call_id.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn request_body(
    agent: &AgentSpec,
    input: Value,
    tools: &[ToolDefinition],
    previous_response_id: Option<&str>,
    stream: bool,
) -> Value {
    let mut body = json!({
        "model": agent.model,
        "instructions": agent.instructions,
        "input": input,
        "stream": stream,
    });
    if let Some(map) = body.as_object_mut() {
        if !tools.is_empty() {
            map.insert(
                "tools".to_string(),
                Value::Array(tools.iter().map(ToolDefinition::to_json).collect()),
            );
        }
        if let Some(previous) = previous_response_id {
            map.insert("previous_response_id".to_string(), json!(previous));
        }
    }
    body
}

struct Client {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    request_timeout: Duration,
    max_tool_rounds: usize,
}

impl Client {
    async fn post(&self, body: &Value, timeout: Option<Duration>) -> LlmResult<reqwest::Response> {
        let mut request = self.http.post(&self.endpoint).bearer_auth(&self.api_key).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "model request failed");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// [`Runner`] over `POST {base_url}/responses`.
#[derive(Clone)]
pub struct OpenAiRunner {
    client: Arc<Client>,
}

impl OpenAiRunner {
    /// Build a runner from configuration.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Config("OPENAI_API_KEY is not set".to_string()))?;

        // Streams may legitimately outlive any fixed total timeout.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client: Arc::new(Client {
                http,
                endpoint: format!("{}/responses", config.base_url.trim_end_matches('/')),
                api_key,
                request_timeout: Duration::from_secs(config.request_timeout_secs),
                max_tool_rounds: config.max_tool_rounds,
            }),
        })
    }
}

impl Runner for OpenAiRunner {
    fn run_streamed(
        &self,
        agent: &AgentSpec,
        input: &str,
        tools: Arc<dyn ToolHandler>,
        previous_response_id: Option<&str>,
    ) -> AgentEventStream {
        let client = Arc::clone(&self.client);
        let agent = agent.clone();
        let mut next_input = json!(input);
        let mut previous = previous_response_id.map(str::to_string);

        Box::pin(async_stream::stream! {
            let mut definitions = agent.hosted_tools.clone();
            definitions.extend(tools.definitions());
            let mut rounds = 0;

            loop {
                let body = request_body(&agent, next_input, &definitions, previous.as_deref(), true);
                let response = match client.post(&body, None).await {
                    Ok(response) => response,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };

                let mut bytes = response.bytes_stream();
                let mut parser = SseLineBuffer::new();
                let mut completed = None;

                loop {
                    let (events, finished) = match bytes.next().await {
                        Some(Ok(chunk)) => (parser.feed(&chunk), false),
                        Some(Err(err)) => {
                            yield Err(LlmError::from(err));
                            return;
                        }
                        None => (parser.flush(), true),
                    };

                    for event in events {
                        let SseEvent::Data(payload) = event else {
                            continue;
                        };
                        match decode_event(&payload) {
                            Ok(Step::Emit(event)) => yield Ok(event),
                            Ok(Step::Completed(response)) => completed = Some(response),
                            Ok(Step::Skip) => {}
                            Err(err) => {
                                yield Err(err);
                                return;
                            }
                        }
                    }

                    if finished {
                        break;
                    }
                }

                let Some(response) = completed else {
                    yield Err(LlmError::Truncated);
                    return;
                };

                let calls = function_calls(&response.output);
                if calls.is_empty() {
                    info!(agent = %agent.name, response_id = %response.id, rounds, "run completed");
                    yield Ok(AgentEvent::Completed { response_id: response.id });
                    return;
                }

                rounds += 1;
                if rounds > client.max_tool_rounds {
                    yield Err(LlmError::ToolRounds(client.max_tool_rounds));
                    return;
                }

                let mut outputs = Vec::with_capacity(calls.len());
                for call in calls {
                    debug!(tool = %call.name, call_id = %call.call_id, "dispatching tool call");
                    let output = match serde_json::from_str::<Value>(&call.arguments) {
                        Ok(arguments) => tools.call(&call.name, arguments).await,
                        Err(err) => json!({
                            "success": false,
                            "message": "Invalid tool arguments.",
                            "error": err.to_string(),
                        }),
                    };
                    outputs.push(json!({
                        "type": "function_call_output",
                        "call_id": call.call_id,
                        "output": output.to_string(),
                    }));
                }

                next_input = Value::Array(outputs);
                previous = Some(response.id);
            }
        })
    }

    fn run(&self, agent: &AgentSpec, input: &str) -> RunFuture<'_, LlmResult<String>> {
        let body = request_body(agent, json!(input), &agent.hosted_tools, None, false);
        let name = agent.name.clone();
        Box::pin(async move {
            let response = self
                .client
                .post(&body, Some(self.client.request_timeout))
                .await?;
            let response: ResponseBody = response.json().await?;
            if let Some(error) = response.error {
                return Err(LlmError::RunFailed(error.message));
            }

            let text = output_text(response.output);
            let text = text.trim();
            if text.is_empty() {
                return Err(LlmError::EmptyOutput);
            }
            debug!(agent = %name, chars = text.len(), "run finished");
            Ok(text.to_string())
        })
    }
}
