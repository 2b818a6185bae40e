//! Conversation session persistence
//!
//! Each session is one JSON file under ~/.config/quill/sessions/,
//! written whole after every exchange. The pipeline never touches
//! these; they only exist so a conversation can pick up where it
//! left off.

use crate::client::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            turns: Vec::new(),
        }
    }

    /// Record one user/assistant exchange.
    pub fn push_exchange(&mut self, prompt: &str, reply: &str) {
        self.turns.push(Turn::user(prompt));
        self.turns.push(Turn::assistant(reply));
        self.updated_at = Utc::now();
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.updated_at = Utc::now();
    }

    fn sessions_dir() -> Option<PathBuf> {
        crate::config::Config::config_dir().map(|p| p.join("sessions"))
    }

    fn path(&self) -> Option<PathBuf> {
        Self::sessions_dir().map(|p| p.join(format!("{}.json", self.id)))
    }

    /// Persist to disk. Best-effort: a failure is reported, not fatal.
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::sessions_dir()
            .ok_or_else(|| "Could not determine sessions directory".to_string())?;
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;

        let path = self
            .path()
            .ok_or_else(|| "Could not determine session path".to_string())?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;
        fs::write(&path, content).map_err(|e| format!("Failed to write session: {}", e))
    }

    /// Load the most recently updated session, if any parse.
    pub fn load_latest() -> Option<Self> {
        let dir = Self::sessions_dir()?;
        let mut sessions: Vec<Session> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()? != "json" {
                    return None;
                }
                let content = fs::read_to_string(path).ok()?;
                serde_json::from_str(&content).ok()
            })
            .collect();

        sessions.sort_by_key(|s| s.updated_at);
        sessions.pop()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Role;

    #[test]
    fn test_push_exchange_appends_both_roles() {
        let mut session = Session::new();
        session.push_exchange("make a file", "```python\nx = 1\n```");

        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].role, Role::User);
        assert_eq!(session.turns[1].role, Role::Assistant);
    }

    #[test]
    fn test_clear_keeps_identity() {
        let mut session = Session::new();
        let id = session.id;
        session.push_exchange("a", "b");
        session.clear();

        assert!(session.turns.is_empty());
        assert_eq!(session.id, id);
    }

    #[test]
    fn test_session_json_roundtrip() {
        let mut session = Session::new();
        session.push_exchange("hi", "hello");

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, session.id);
        assert_eq!(restored.turns.len(), 2);
        assert_eq!(restored.turns[1].content, "hello");
    }
}
