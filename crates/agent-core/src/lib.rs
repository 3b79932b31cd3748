//! # agent-core
//!
//! Core agent logic with provider-agnostic LLM abstraction, an extensible
//! tool system, and a two-phase research loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Agent                                  │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────────────────┐  │
//! │  │   Gather   │  │   Tools    │  │   LlmProvider          │  │
//! │  │    Loop    │──│  Registry  │──│   (Strategy)           │  │
//! │  └─────┬──────┘  └────────────┘  └────────────────────────┘  │
//! │        │ observations                                         │
//! │  ┌─────▼──────────┐                                           │
//! │  │ ReportComposer │  writes the final answer                  │
//! │  └────────────────┘                                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between local and hosted model
//! backends without changing agent logic; `ReportComposer` is the seam where
//! domain crates shape the answer.

pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::LlmProvider;
pub use reasoning::{Agent, AgentBuilder, Observation, ReportComposer};
pub use session::{Session, SessionId, SessionStore};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
