//! Memory Notes
//!
//! Per-user memory the agent can write to and recall from across sessions.
//! Notes live in an append-only JSONL file per user; recall is a simple
//! token-overlap ranking, which is plenty for preference-sized corpora.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema};
use agent_core::{AgentError, Result};

use crate::profile::UserProfileStore;

/// One stored memory note
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Note {
    pub time: DateTime<Utc>,
    pub text: String,
}

/// Append-only JSONL note store, one file per user
pub struct NoteStore {
    base_dir: PathBuf,
}

impl NoteStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.jsonl", safe))
    }

    pub fn append(&self, user_id: &str, text: &str) -> Result<()> {
        let note = Note {
            time: Utc::now(),
            text: text.trim().to_string(),
        };
        let mut line = serde_json::to_string(&note)?;
        line.push('\n');

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(user_id))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Vec<Note>> {
        let content = match std::fs::read_to_string(self.path_for(user_id)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }

    /// Best-matching notes by case-insensitive token overlap, ties broken by
    /// recency. An empty query returns the most recent notes.
    pub fn recall(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<Note>> {
        let mut notes = self.load(user_id)?;

        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if tokens.is_empty() {
            notes.sort_by(|a, b| b.time.cmp(&a.time));
            notes.truncate(limit);
            return Ok(notes);
        }

        let mut scored: Vec<(usize, Note)> = notes
            .into_iter()
            .map(|note| {
                let haystack = note.text.to_lowercase();
                let score = tokens.iter().filter(|t| haystack.contains(t.as_str())).count();
                (score, note)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.time.cmp(&a.1.time)));

        Ok(scored.into_iter().take(limit).map(|(_, n)| n).collect())
    }

    /// The most recent notes, newest first
    pub fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<Note>> {
        self.recall(user_id, "", limit)
    }
}

/// Memory tool: lets the agent store and recall user facts
pub struct MemoryTool {
    notes: Arc<NoteStore>,
    profiles: Arc<UserProfileStore>,
    user_id: String,
}

impl MemoryTool {
    pub fn new(notes: Arc<NoteStore>, profiles: Arc<UserProfileStore>, user_id: impl Into<String>) -> Self {
        Self {
            notes,
            profiles,
            user_id: user_id.into(),
        }
    }

    fn render_notes(notes: &[Note]) -> String {
        notes
            .iter()
            .map(|n| format!("- [{}] {}", n.time.format("%Y-%m-%d"), n.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Tool for MemoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "memory".into(),
            description: "Store or recall facts about the user across sessions. Use action=store when the user shares preferences or asks to be remembered; action=recall to look up earlier context; action=summary for an overview.".into(),
            parameters: vec![
                ParameterSchema {
                    name: "action".into(),
                    param_type: "string".into(),
                    description: "One of: store, recall, summary".into(),
                    required: true,
                    default: None,
                    enum_values: Some(vec![
                        serde_json::json!("store"),
                        serde_json::json!("recall"),
                        serde_json::json!("summary"),
                    ]),
                },
                ParameterSchema::optional_string(
                    "content",
                    "Text to store, or the recall query",
                    "",
                ),
            ],
            category: Some("memory".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let action = call
            .str_arg("action")
            .ok_or_else(|| AgentError::ToolValidation("Missing action".into()))?;
        let content = call.str_arg("content").unwrap_or("").trim();

        match action {
            "store" => {
                if content.is_empty() {
                    return Ok(ToolResult::failure("memory", "Nothing to store"));
                }
                self.notes.append(&self.user_id, content)?;
                let learned = self.profiles.absorb_note(&self.user_id, content)?;

                let output = if learned {
                    "Noted, and research preferences updated."
                } else {
                    "Noted."
                };
                Ok(ToolResult::success("memory", output))
            }
            "recall" => {
                let notes = self.notes.recall(&self.user_id, content, 5)?;
                if notes.is_empty() {
                    Ok(ToolResult::success("memory", "No stored notes match."))
                } else {
                    Ok(ToolResult::success("memory", Self::render_notes(&notes)))
                }
            }
            "summary" => {
                let mut out = String::new();
                if let Some(profile) = self.profiles.get(&self.user_id)? {
                    let summary = profile.summary();
                    if !summary.is_empty() {
                        out.push_str(&format!("Preferences: {}\n", summary));
                    }
                }
                let notes = self.notes.recent(&self.user_id, 10)?;
                if notes.is_empty() && out.is_empty() {
                    out.push_str("No memories stored yet.");
                } else if !notes.is_empty() {
                    out.push_str("Recent notes:\n");
                    out.push_str(&Self::render_notes(&notes));
                }
                Ok(ToolResult::success("memory", out.trim()))
            }
            other => Ok(ToolResult::failure(
                "memory",
                format!("Unknown action '{}'. Use store, recall, or summary.", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn memory_tool(dir: &std::path::Path) -> MemoryTool {
        MemoryTool::new(
            Arc::new(NoteStore::new(dir.join("notes")).unwrap()),
            Arc::new(UserProfileStore::new(dir.join("profiles")).unwrap()),
            "anon_tester12345",
        )
    }

    fn call(action: &str, content: &str) -> ToolCall {
        let mut arguments = HashMap::new();
        arguments.insert("action".into(), serde_json::json!(action));
        arguments.insert("content".into(), serde_json::json!(content));
        ToolCall {
            name: "memory".into(),
            arguments,
            id: None,
        }
    }

    #[test]
    fn test_recall_ranks_by_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path()).unwrap();

        store.append("u1", "I prefer BTC swing trades").unwrap();
        store.append("u1", "Dinner at eight").unwrap();
        store.append("u1", "BTC and ETH are my main coins").unwrap();

        let hits = store.recall("u1", "btc coins", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("main coins"));
    }

    #[test]
    fn test_recall_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(dir.path()).unwrap();
        assert!(store.recall("nobody", "btc", 5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_then_recall_via_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tool = memory_tool(dir.path());

        let stored = tool
            .execute(&call("store", "I trade SOL aggressively"))
            .await
            .unwrap();
        assert!(stored.success);
        assert!(stored.output.contains("preferences updated"));

        let recalled = tool.execute(&call("recall", "sol")).await.unwrap();
        assert!(recalled.output.contains("SOL"));

        let summary = tool.execute(&call("summary", "")).await.unwrap();
        assert!(summary.output.contains("Preferences:"));
    }

    #[tokio::test]
    async fn test_unknown_action_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tool = memory_tool(dir.path());

        let result = tool.execute(&call("forget", "")).await.unwrap();
        assert!(!result.success);
    }
}
