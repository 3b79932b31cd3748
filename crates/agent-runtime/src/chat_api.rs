//! OpenAI-Compatible Chat Provider
//!
//! Implementation of `LlmProvider` over the `/chat/completions` wire format.
//! Works against any compatible endpoint - hosted APIs as well as local
//! servers (Ollama's `/v1`, vLLM, llama.cpp server).

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo, StreamChunk, TokenUsage,
    },
};

/// Chat API provider configuration
#[derive(Clone, Debug)]
pub struct ChatApiConfig {
    /// API base URL, including the version segment
    pub base_url: String,

    /// Bearer token; local servers usually need none
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".into(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl ChatApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: defaults.timeout_secs,
        }
    }
}

/// OpenAI-compatible chat completions provider
pub struct ChatApiProvider {
    http: reqwest::Client,
    config: ChatApiConfig,
}

impl ChatApiProvider {
    pub fn from_config(config: ChatApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { http, config }
    }

    pub fn from_env() -> Self {
        Self::from_config(ChatApiConfig::from_env())
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(format!("{}{}", self.config.base_url, path));
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    fn post_body(&self, messages: &[Message], options: &GenerationOptions, stream: bool) -> ChatRequest {
        ChatRequest {
            model: options.model.clone(),
            messages: messages.iter().map(wire_message).collect(),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stop: options.stop_sequences.clone(),
            stream,
        }
    }

    async fn send_chat(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut builder = self.http.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response.text().await.unwrap_or_default();
        let preview: String = detail.chars().take(300).collect();
        tracing::warn!(%status, "Chat API error: {}", preview);

        Err(match status.as_u16() {
            429 => AgentError::RateLimited(preview),
            500..=599 => AgentError::ProviderUnavailable(format!("{}: {}", status, preview)),
            _ => AgentError::Provider(format!("{}: {}", status, preview)),
        })
    }
}

fn wire_message(message: &Message) -> WireMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        // Tool results travel as user context; we do not use native tool calls
        Role::Tool => "user",
    };
    WireMessage {
        role: role.into(),
        content: message.content.clone(),
    }
}

fn map_finish_reason(reason: Option<&str>) -> Option<FinishReason> {
    match reason {
        Some("stop") => Some(FinishReason::Stop),
        Some("length") => Some(FinishReason::Length),
        Some("tool_calls") => Some(FinishReason::ToolUse),
        Some("content_filter") => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

fn map_usage(usage: Option<WireUsage>) -> Option<TokenUsage> {
    usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    })
}

// Wire types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Parse one SSE `data:` payload into a stream chunk
fn parse_stream_line(line: &str) -> Option<Result<StreamChunk>> {
    let data = line.strip_prefix("data:")?.trim();

    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(Ok(StreamChunk {
            delta: String::new(),
            done: true,
            usage: None,
        }));
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(parsed) => {
            let delta = parsed
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default();
            let done = parsed
                .choices
                .first()
                .is_some_and(|c| c.finish_reason.is_some());
            Some(Ok(StreamChunk {
                delta,
                done,
                usage: map_usage(parsed.usage),
            }))
        }
        Err(e) => Some(Err(AgentError::Parse(format!(
            "bad stream payload: {} ({})",
            e, data
        )))),
    }
}

#[async_trait]
impl LlmProvider for ChatApiProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "ChatApi".into(),
            version: None,
            models,
            supports_streaming: true,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.request("/models").send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::warn!("Chat API health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let body = self.post_body(messages, options, false);
        let response = self.send_chat(&body).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("bad completion payload: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("completion had no choices".into()))?;

        let finish_reason = map_finish_reason(choice.finish_reason.as_deref());

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: parsed.model.unwrap_or_else(|| options.model.clone()),
            usage: map_usage(parsed.usage),
            truncated: finish_reason == Some(FinishReason::Length),
            finish_reason,
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let body = self.post_body(messages, options, true);
        let response = self.send_chat(&body).await?;

        // SSE framing: accumulate bytes, emit one chunk per complete
        // `data:` line
        let stream = response
            .bytes_stream()
            .scan(String::new(), |buffer, chunk| {
                let out: Vec<Result<StreamChunk>> = match chunk {
                    Err(e) => vec![Err(AgentError::Provider(e.to_string()))],
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));

                        let mut chunks = Vec::new();
                        while let Some(pos) = buffer.find('\n') {
                            let line: String = buffer.drain(..=pos).collect();
                            if let Some(parsed) = parse_stream_line(line.trim()) {
                                chunks.push(parsed);
                            }
                        }
                        chunks
                    }
                };
                futures::future::ready(Some(out))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .request("/models")
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::ProviderUnavailable(format!(
                "models endpoint returned {}",
                response.status()
            )));
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("bad models payload: {}", e)))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id.clone(),
                name: m.id,
                context_length: None,
                supports_vision: false,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChatApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_wire_message_roles() {
        assert_eq!(wire_message(&Message::system("s")).role, "system");
        assert_eq!(wire_message(&Message::user("u")).role, "user");
        assert_eq!(wire_message(&Message::assistant("a")).role, "assistant");
        assert_eq!(wire_message(&Message::tool("t", None)).role, "user");
    }

    #[test]
    fn test_parse_stream_line() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let chunk = parse_stream_line(line).unwrap().unwrap();
        assert_eq!(chunk.delta, "Hel");
        assert!(!chunk.done);

        let done = parse_stream_line("data: [DONE]").unwrap().unwrap();
        assert!(done.done);

        assert!(parse_stream_line(": keep-alive comment").is_none());
        assert!(parse_stream_line("").is_none());
    }

    #[test]
    fn test_parse_stream_finish_reason_marks_done() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        let chunk = parse_stream_line(line).unwrap().unwrap();
        assert!(chunk.done);
        assert!(chunk.delta.is_empty());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("stop")), Some(FinishReason::Stop));
        assert_eq!(map_finish_reason(Some("length")), Some(FinishReason::Length));
        assert_eq!(map_finish_reason(Some("weird")), None);
        assert_eq!(map_finish_reason(None), None);
    }
}
