//! Knowledge Base
//!
//! Static methodology and historical-case markdown injected into the report
//! prompt. Files are truncated to a byte budget at a char boundary so a
//! sprawling playbook cannot crowd the prompt.

use std::path::PathBuf;

const METHODOLOGY_FILE: &str = "technical_playbook.md";
const HISTORY_FILE: &str = "market_history_cases.md";

const METHODOLOGY_MAX_CHARS: usize = 2800;
const HISTORY_MAX_CHARS: usize = 2200;

/// Loader for the static knowledge corpus
pub struct KnowledgeBase {
    dir: PathBuf,
}

impl KnowledgeBase {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Indicator-interpretation methodology, or `None` when the file is absent
    pub fn methodology(&self) -> Option<String> {
        self.load_truncated(METHODOLOGY_FILE, METHODOLOGY_MAX_CHARS)
    }

    /// Historical market-condition cases, or `None` when the file is absent
    pub fn history_cases(&self) -> Option<String> {
        self.load_truncated(HISTORY_FILE, HISTORY_MAX_CHARS)
    }

    fn load_truncated(&self, filename: &str, max_chars: usize) -> Option<String> {
        let path = self.dir.join(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Knowledge file not loaded");
                return None;
            }
        };

        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        if content.chars().count() <= max_chars {
            Some(content.to_string())
        } else {
            let mut truncated: String = content.chars().take(max_chars).collect();
            truncated.push_str("\n... (truncated)");
            Some(truncated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::new(dir.path());
        assert!(kb.methodology().is_none());
        assert!(kb.history_cases().is_none());
    }

    #[test]
    fn test_load_and_truncate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METHODOLOGY_FILE), "# Playbook\nRSI under 30 is oversold.").unwrap();
        std::fs::write(dir.path().join(HISTORY_FILE), "x".repeat(5000)).unwrap();

        let kb = KnowledgeBase::new(dir.path());
        assert!(kb.methodology().unwrap().contains("oversold"));

        let cases = kb.history_cases().unwrap();
        assert!(cases.ends_with("... (truncated)"));
        assert!(cases.chars().count() < 5000);
    }

    #[test]
    fn test_repo_knowledge_files_load() {
        let kb = KnowledgeBase::new(concat!(env!("CARGO_MANIFEST_DIR"), "/knowledge"));
        assert!(kb.methodology().is_some());
        assert!(kb.history_cases().is_some());
    }
}
