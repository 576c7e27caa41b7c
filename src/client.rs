use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{LlmProvider, LlmSettings, PlannerSettings};
use crate::planner::{
    ChatOptions, ChunkStream, PlannerClient, PlannerError, PlannerMessage, Role, STREAM_BUFFER,
};
use crate::tokens::completion_tokens_for;

/// Planner transport for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct HttpPlannerClient {
    http: Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    provider: LlmProvider,
    model: String,
    completion_tokens: u32,
    context_tokens: u32,
    temperature: f32,
}

impl HttpPlannerClient {
    pub fn new(llm: &LlmSettings, planner: &PlannerSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        debug!(
            provider = %llm.provider,
            model = %planner.model,
            base_url = %llm.base_url,
            "Planner client created"
        );

        Ok(Self {
            http,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api_key: llm.api_key.clone(),
            user_agent: llm.user_agent.clone(),
            provider: llm.provider,
            model: planner.model.clone(),
            completion_tokens: planner.max_tokens,
            context_tokens: planner.context_tokens,
            temperature: planner.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single completion with explicit sampling options. Unset options fall
    /// back to the configured temperature and completion cap.
    pub async fn chat_with_options(
        &self,
        cancel: &CancellationToken,
        messages: &[PlannerMessage],
        options: &ChatOptions,
    ) -> Result<String, PlannerError> {
        let request = self.build_request(messages, options, false);
        let response = self.send(cancel, &request).await?;

        let completion: ChatCompletionResponse = tokio::select! {
            _ = cancel.cancelled() => return Err(PlannerError::Cancelled),
            parsed = response.json() => parsed?,
        };

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or(PlannerError::NoChoices)?;
        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(PlannerError::EmptyResponse);
        }

        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            chars = content.len(),
            "Planner reply received"
        );
        Ok(content)
    }

    /// Streaming completion with explicit sampling options.
    pub async fn chat_stream_with_options(
        &self,
        cancel: &CancellationToken,
        messages: &[PlannerMessage],
        options: &ChatOptions,
    ) -> Result<ChunkStream, PlannerError> {
        let request = self.build_request(messages, options, true);
        let response = self.send(cancel, &request).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(pump_sse(response, tx, cancel.clone()));
        Ok(ReceiverStream::new(rx))
    }

    fn build_request(
        &self,
        messages: &[PlannerMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> ChatCompletionRequest {
        let max_tokens = options.max_tokens.unwrap_or_else(|| {
            completion_tokens_for(self.completion_tokens, self.context_tokens, messages)
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.iter().map(wire_message).collect(),
            max_tokens: Some(max_tokens),
            temperature: Some(options.temperature.unwrap_or(self.temperature)),
            top_p: options.top_p,
            stop: options.stop.clone(),
            stream,
        }
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        request: &ChatCompletionRequest,
    ) -> Result<Response, PlannerError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut req_builder = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", "application/json")
            .json(request);

        if matches!(self.provider, LlmProvider::OpenRouter) {
            req_builder = req_builder
                .header("HTTP-Referer", "https://github.com/reel-dev/reel")
                .header("X-Title", "reel");
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PlannerError::Cancelled),
            response = req_builder.send() => response?,
        };

        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        Err(status_error(response).await)
    }
}

#[async_trait]
impl PlannerClient for HttpPlannerClient {
    async fn chat(
        &self,
        cancel: &CancellationToken,
        messages: &[PlannerMessage],
    ) -> Result<String, PlannerError> {
        self.chat_with_options(cancel, messages, &ChatOptions::default())
            .await
    }

    async fn chat_stream(
        &self,
        cancel: &CancellationToken,
        messages: &[PlannerMessage],
    ) -> Result<ChunkStream, PlannerError> {
        self.chat_stream_with_options(cancel, messages, &ChatOptions::default())
            .await
    }
}

/// Maps a planner turn onto the wire roles. The wire has no tool role, so tool
/// results travel as user turns labelled with the producing capability.
fn wire_message(message: &PlannerMessage) -> ChatMessage {
    let (role, content) = match message.role {
        Role::System => (ChatMessageRole::System, message.content.clone()),
        Role::User => (ChatMessageRole::User, message.content.clone()),
        Role::Assistant => (ChatMessageRole::Assistant, message.content.clone()),
        Role::Tool => {
            let label = match &message.name {
                Some(name) => format!("Result from tool `{name}`"),
                None => "Tool result".to_string(),
            };
            (ChatMessageRole::User, format!("{label}:\n{}", message.content))
        }
    };
    ChatMessage { role, content }
}

async fn status_error(response: Response) -> PlannerError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();

    let body = match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let error_msg = if error_text.contains("per second") {
                "Rate limit exceeded. Please wait a moment and try again."
            } else if error_text.contains("traffic") {
                "Service is experiencing high traffic. Please try again in a few moments."
            } else {
                "Too many requests. Please wait before trying again."
            };
            format!("{error_msg} (API response: {error_text})")
        }
        StatusCode::UNAUTHORIZED => {
            "Invalid API key. Please check your API key configuration.".to_string()
        }
        StatusCode::BAD_REQUEST => format!("Invalid request: {error_text}"),
        StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
            "Service is temporarily unavailable. Please try again later.".to_string()
        }
        _ if error_text.is_empty() => "Unknown error".to_string(),
        _ => error_text,
    };

    warn!(status = status.as_u16(), "Planner request rejected");
    PlannerError::Status {
        status: status.as_u16(),
        body,
    }
}

/// Reads the SSE body and forwards text deltas until `[DONE]`, the end of the
/// body, a decode failure, or cancellation.
async fn pump_sse(
    response: Response,
    tx: mpsc::Sender<Result<String, PlannerError>>,
    cancel: CancellationToken,
) {
    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = body.next() => next,
        };

        let bytes = match next {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                forward(&tx, &cancel, Err(err.into())).await;
                return;
            }
            None => break,
        };
        buffer.extend_from_slice(&bytes);

        while let Some(newline) = buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            match parse_sse_line(&String::from_utf8_lossy(&line)) {
                SseLine::Skip => {}
                SseLine::Done => return,
                SseLine::Delta(text) => {
                    if !forward(&tx, &cancel, Ok(text)).await {
                        return;
                    }
                }
                SseLine::Invalid(reason) => {
                    forward(&tx, &cancel, Err(PlannerError::Decode(reason))).await;
                    return;
                }
            }
        }
    }

    // Body ended without a trailing newline.
    if let SseLine::Delta(text) = parse_sse_line(&String::from_utf8_lossy(&buffer)) {
        forward(&tx, &cancel, Ok(text)).await;
    }
}

/// Returns false when the consumer is gone or the call was cancelled.
async fn forward(
    tx: &mpsc::Sender<Result<String, PlannerError>>,
    cancel: &CancellationToken,
    item: Result<String, PlannerError>,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Skip,
    Done,
    Delta(String),
    Invalid(String),
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data.is_empty() {
        return SseLine::Skip;
    }
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.content)
            .find(|content| !content.is_empty())
            .map_or(SseLine::Skip, SseLine::Delta),
        Err(err) => SseLine::Invalid(format!("{err}: {data}")),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
