//! Application State

use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{LlmProvider, SessionStore};
use research_assistant::ResearchAssistant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The assembled research assistant
    pub assistant: Arc<ResearchAssistant>,

    /// Server-side chat history
    pub sessions: Arc<dyn SessionStore>,

    /// LLM provider (for health reporting)
    pub provider: Arc<dyn LlmProvider>,

    /// Which market data source is wired in ("live" or "mock")
    pub market_source: &'static str,

    /// Data directory holding the persisted anonymous identity
    pub data_dir: PathBuf,
}
