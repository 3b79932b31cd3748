//! # research-assistant
//!
//! Assembly of the crypto research assistant: the intent gate that keeps it
//! on topic, the report composer that writes conclusion-first analysis from
//! gathered observations, per-user profiles and memory notes, a short-TTL
//! response cache, and the static knowledge corpus.
//!
//! The flow for one question:
//!
//! ```text
//! question -> intent gate -> response cache -> gather loop (market tools)
//!          -> report composer (rules + knowledge + memory + profile)
//!          -> conversation history
//! ```

pub mod assistant;
pub mod cache;
pub mod config;
pub mod intent;
pub mod knowledge;
pub mod memory;
pub mod profile;
pub mod report;

pub use assistant::ResearchAssistant;
pub use cache::ResponseCache;
pub use config::AssistantConfig;
pub use knowledge::KnowledgeBase;
pub use memory::{MemoryTool, NoteStore};
pub use profile::{UserProfile, UserProfileStore};
pub use report::{AnalystReportComposer, ReportLayout};
