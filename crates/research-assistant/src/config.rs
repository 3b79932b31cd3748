//! Assistant Configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::report::ReportLayout;

const DEFAULT_MAX_STEPS: usize = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 120;

/// Assistant configuration, loadable from the environment
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// Keep the same anonymous identity across restarts
    pub persist_session: bool,

    /// Maximum gather-loop steps
    pub max_steps: usize,

    /// Same-question response cache TTL (zero disables)
    pub cache_ttl: Duration,

    /// Report layout: fixed five-section report or question-led
    pub report_layout: ReportLayout,

    /// Where identity, sessions, notes, and profiles live
    pub data_dir: PathBuf,

    /// Where the knowledge markdown lives
    pub knowledge_dir: PathBuf,

    /// Model for both the gather loop and the report call
    pub model: String,

    /// Clickable example prompts surfaced by the server
    pub examples: Vec<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            persist_session: true,
            max_steps: DEFAULT_MAX_STEPS,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            report_layout: ReportLayout::default(),
            data_dir: PathBuf::from("data"),
            knowledge_dir: PathBuf::from("knowledge"),
            model: "llama3.2".into(),
            examples: default_examples(),
        }
    }
}

fn default_examples() -> Vec<String> {
    vec![
        "Analyze BTC short-term".into(),
        "How does the ETH 1h technical picture look?".into(),
        "Is SUI worth buying on this dip?".into(),
        "What is the current fear and greed index?".into(),
    ]
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map_or(default, |v| {
        matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes")
    })
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AssistantConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            persist_session: env_bool("ASSISTANT_PERSIST_SESSION", defaults.persist_session),
            max_steps: env_parse("ASSISTANT_MAX_STEPS", defaults.max_steps),
            cache_ttl: Duration::from_secs(env_parse(
                "ASSISTANT_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )),
            report_layout: std::env::var("ASSISTANT_REPORT_LAYOUT")
                .map_or(defaults.report_layout, |v| ReportLayout::parse(&v)),
            data_dir: std::env::var("ASSISTANT_DATA_DIR")
                .map_or(defaults.data_dir, PathBuf::from),
            knowledge_dir: std::env::var("ASSISTANT_KNOWLEDGE_DIR")
                .map_or(defaults.knowledge_dir, PathBuf::from),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            examples: defaults.examples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert!(config.persist_session);
        assert_eq!(config.max_steps, 5);
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert_eq!(config.report_layout, ReportLayout::Adaptive);
        assert_eq!(config.examples.len(), 4);
    }
}
