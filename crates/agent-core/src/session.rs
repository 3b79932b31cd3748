//! Session Management
//!
//! Sessions carry the conversation history shown in the history sidebar.
//! Identity is an anonymous per-device token persisted next to the session
//! data, so the same device keeps its memory across visits without accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::message::{truncate_chars, Conversation, Role};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session title (auto-generated or user-set)
    pub title: Option<String>,

    /// Anonymous user/owner ID
    pub user_id: Option<String>,

    /// Model used for this session
    #[serde(default)]
    pub model: String,

    /// Custom tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Extra key-value metadata
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

/// A complete chat session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Session metadata
    pub metadata: SessionMetadata,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Whether session is active
    pub active: bool,
}

impl Session {
    /// Create a new session
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(),
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId) -> Self {
        let mut session = Self::new();
        session.id = id;
        session
    }

    /// Create a session owned by an anonymous user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.metadata.user_id = Some(user_id.into());
        session
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Set session title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.metadata.title = Some(title.into());
        self.touch();
    }

    /// Get or generate title from the first user message
    pub fn title(&self) -> String {
        self.metadata.title.clone().unwrap_or_else(|| {
            self.conversation
                .messages()
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| truncate_chars(&m.content, 50))
                .unwrap_or_else(|| format!("Session {}", truncate_chars(self.id.as_str(), 8)))
        })
    }

    /// End the session
    pub fn end(&mut self) {
        self.active = false;
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Duration since creation
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.created_at
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session store trait for persistence
pub trait SessionStore: Send + Sync {
    /// Save a session
    fn save(&self, session: &Session) -> crate::Result<()>;

    /// Load a session by ID
    fn load(&self, id: &SessionId) -> crate::Result<Option<Session>>;

    /// Delete a session
    fn delete(&self, id: &SessionId) -> crate::Result<()>;

    /// List sessions for a user, newest first
    fn list(&self, user_id: Option<&str>, limit: usize) -> crate::Result<Vec<Session>>;
}

/// In-memory session store (for development/testing)
pub struct MemorySessionStore {
    sessions: std::sync::RwLock<std::collections::HashMap<SessionId, Session>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> crate::Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &SessionId) -> crate::Result<Option<Session>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions.get(id).cloned())
    }

    fn delete(&self, id: &SessionId) -> crate::Result<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(id);
        Ok(())
    }

    fn list(&self, user_id: Option<&str>, limit: usize) -> crate::Result<Vec<Session>> {
        let sessions = self.sessions.read().unwrap();
        let mut result: Vec<_> = sessions
            .values()
            .filter(|s| user_id.map_or(true, |uid| s.metadata.user_id.as_deref() == Some(uid)))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

/// File-backed session store: one JSON document per session.
///
/// Replaces the demo's client-side history with durable server-side storage
/// so the sidebar survives page reloads and server restarts.
pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        let safe: String = id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.json", safe))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(self.path_for(&session.id), json)?;
        Ok(())
    }

    fn load(&self, id: &SessionId) -> crate::Result<Option<Session>> {
        match std::fs::read_to_string(self.path_for(id)) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &SessionId) -> crate::Result<()> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, user_id: Option<&str>, limit: usize) -> crate::Result<Vec<Session>> {
        let mut result = Vec::new();

        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(json) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            // Skip unreadable records instead of failing the whole listing
            let Ok(session) = serde_json::from_str::<Session>(&json) else {
                tracing::warn!(path = %entry.path().display(), "Skipping unreadable session file");
                continue;
            };
            if user_id.map_or(true, |uid| session.metadata.user_id.as_deref() == Some(uid)) {
                result.push(session);
            }
        }

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

// ============================================================================
// Anonymous identity
// ============================================================================

/// Prefix for anonymous per-device identifiers
pub const ANON_PREFIX: &str = "anon_";

const ID_FILE: &str = "session_id";

/// Get the anonymous user ID for this device.
///
/// Two modes:
/// - ephemeral (`persist = false`): a fresh ID every call, for tests/demos
/// - persisted (`persist = true`): generated once and written to
///   `<dir>/session_id`; later calls read it back, so same directory means
///   same user. Missing or corrupt contents regenerate the ID.
pub fn anonymous_user_id(persist: bool, dir: &Path) -> String {
    if !persist {
        return generate_anonymous_id();
    }

    let path = dir.join(ID_FILE);

    if let Ok(content) = std::fs::read_to_string(&path) {
        let content = content.trim();
        if content.starts_with(ANON_PREFIX) && content.len() > ANON_PREFIX.len() {
            return content.to_string();
        }
    }

    // First run or corrupt file: generate and persist
    let id = generate_anonymous_id();
    if let Err(e) = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, &id)) {
        tracing::warn!(error = %e, "Could not persist anonymous ID; continuing ephemeral");
    }
    id
}

/// Clear the persisted anonymous ID ("switch user"). The next persisted call
/// generates a fresh identity.
pub fn reset_anonymous_id(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(dir.join(ID_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn generate_anonymous_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", ANON_PREFIX, &hex[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_session_creation() {
        let session = Session::new();
        assert!(session.active);
        assert_eq!(session.message_count(), 0);
    }

    #[test]
    fn test_session_title_from_first_user_message() {
        let mut session = Session::new();
        session.conversation.push(Message::user("Analyze BTC short-term"));
        session.conversation.push(Message::assistant("Report..."));
        assert_eq!(session.title(), "Analyze BTC short-term");
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        let session = Session::new();
        let id = session.id.clone();

        store.save(&session).unwrap();

        let loaded = store.load(&id).unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().id, id);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        let mut session = Session::for_user("anon_abc123def456");
        session.conversation.push(Message::user("hello"));
        store.save(&session).unwrap();

        let loaded = store.load(&session.id).unwrap().unwrap();
        assert_eq!(loaded.message_count(), 1);
        assert_eq!(loaded.metadata.user_id.as_deref(), Some("anon_abc123def456"));

        store.delete(&session.id).unwrap();
        assert!(store.load(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_file_store_list_filters_and_orders(){
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path()).unwrap();

        let mut older = Session::for_user("anon_user1");
        older.updated_at = Utc::now() - chrono::Duration::minutes(5);
        store.save(&older).unwrap();

        let newer = Session::for_user("anon_user1");
        store.save(&newer).unwrap();

        let other = Session::for_user("anon_user2");
        store.save(&other).unwrap();

        let listed = store.list(Some("anon_user1"), 10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
    }

    #[test]
    fn test_anonymous_id_persistence() {
        let dir = tempfile::tempdir().unwrap();

        let first = anonymous_user_id(true, dir.path());
        assert!(first.starts_with(ANON_PREFIX));
        assert_eq!(first.len(), ANON_PREFIX.len() + 12);

        let second = anonymous_user_id(true, dir.path());
        assert_eq!(first, second);

        reset_anonymous_id(dir.path()).unwrap();
        let third = anonymous_user_id(true, dir.path());
        assert_ne!(first, third);
    }

    #[test]
    fn test_anonymous_id_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("session_id"), "not-an-id").unwrap();

        let id = anonymous_user_id(true, dir.path());
        assert!(id.starts_with(ANON_PREFIX));

        // The corrupt file was replaced
        let persisted = std::fs::read_to_string(dir.path().join("session_id")).unwrap();
        assert_eq!(persisted.trim(), id);
    }

    #[test]
    fn test_ephemeral_ids_differ() {
        let dir = tempfile::tempdir().unwrap();
        let a = anonymous_user_id(false, dir.path());
        let b = anonymous_user_id(false, dir.path());
        assert_ne!(a, b);
    }
}
