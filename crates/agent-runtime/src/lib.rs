//! # agent-runtime
//!
//! LLM provider implementations for the research assistant.
//!
//! ## Providers
//!
//! - **ChatApi** (default): any OpenAI-compatible `/chat/completions`
//!   endpoint - hosted APIs or local servers (Ollama's `/v1`, vLLM,
//!   llama.cpp server)
//! - **Ollama** (`ollama` feature, on by default): the native Ollama API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::provider_from_env;
//!
//! let provider = provider_from_env();
//! let agent = AgentBuilder::new().provider(provider).build()?;
//! ```

pub mod chat_api;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use chat_api::{ChatApiConfig, ChatApiProvider};

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

use std::sync::Arc;

use agent_core::LlmProvider;

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, Message, Result, Role, Session, Tool, ToolRegistry,
};

/// Select a provider from `LLM_PROVIDER` (`chat-api` default, or `ollama`
/// when that feature is enabled). Unknown values fall back to the chat API
/// with a warning.
pub fn provider_from_env() -> Arc<dyn LlmProvider> {
    let choice = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "chat-api".into());

    match choice.to_lowercase().as_str() {
        #[cfg(feature = "ollama")]
        "ollama" => Arc::new(OllamaProvider::from_env()),
        "chat-api" | "openai" => Arc::new(ChatApiProvider::from_env()),
        other => {
            tracing::warn!("Unknown LLM_PROVIDER '{}'; using the chat API provider", other);
            Arc::new(ChatApiProvider::from_env())
        }
    }
}
