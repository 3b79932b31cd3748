//! Ollama LLM Provider
//!
//! Native `LlmProvider` implementation for local Ollama inference, useful
//! when the richer native API (model listing, keep-alive) matters more than
//! the OpenAI-compatible shim.

use async_trait::async_trait;
use futures::StreamExt;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage, ChatMessageResponse, MessageRole},
    models::ModelOptions as OllamaOptions,
    Ollama,
};

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, ModelInfo,
        ProviderInfo, StreamChunk, TokenUsage,
    },
};

/// Ollama provider over the native API
pub struct OllamaProvider {
    client: Ollama,
}

impl OllamaProvider {
    /// Create with explicit host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            client: Ollama::new(&host.into(), port),
        }
    }

    /// Create from `OLLAMA_HOST` / `OLLAMA_PORT`, defaulting to localhost:11434
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);
        Self::new(host, port)
    }

    fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => MessageRole::System,
                    Role::User => MessageRole::User,
                    Role::Assistant => MessageRole::Assistant,
                    // Tool results travel as user context
                    Role::Tool => MessageRole::User,
                };
                ChatMessage::new(role, m.content.clone())
            })
            .collect()
    }

    fn chat_request(messages: &[Message], options: &GenerationOptions) -> ChatMessageRequest {
        let ollama_options = OllamaOptions::default()
            .temperature(options.temperature)
            .top_p(options.top_p)
            .num_predict(options.max_tokens as i32);

        ChatMessageRequest::new(options.model.clone(), Self::to_chat_messages(messages))
            .options(ollama_options)
    }

    fn usage_of(response: &ChatMessageResponse) -> Option<TokenUsage> {
        response.final_data.as_ref().map(|d| {
            let prompt = d.prompt_eval_count as u32;
            let completion = d.eval_count as u32;
            TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let models = self.list_models().await.unwrap_or_default();

        Ok(ProviderInfo {
            name: "Ollama".into(),
            version: None,
            models,
            supports_streaming: true,
            supports_tools: false,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = Self::chat_request(messages, options);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let usage = Self::usage_of(&response);

        Ok(Completion {
            content: response.message.content,
            model: options.model.clone(),
            usage,
            truncated: false,
            finish_reason: Some(FinishReason::Stop),
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let request = Self::chat_request(messages, options);

        let stream = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let mapped = stream.map(|result| {
            result
                .map(|chunk| {
                    let usage = Self::usage_of(&chunk);
                    StreamChunk {
                        delta: chunk.message.content,
                        done: chunk.done,
                        usage,
                    }
                })
                .map_err(|()| AgentError::Provider("ollama stream error".to_string()))
        });

        Ok(Box::pin(mapped))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
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
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Hello"),
            Message::tool("[Tool 'x' returned]\nok", None),
        ];

        let converted = OllamaProvider::to_chat_messages(&messages);
        assert_eq!(converted.len(), 3);
    }
}
