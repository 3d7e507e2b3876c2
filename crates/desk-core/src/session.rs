use crate::error::DeskError;
use crate::types::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// A single conversation session. History is append-only: messages are
/// pushed as turns complete and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message and update the timestamp.
    pub fn push_message(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the most recent N messages for the context window.
    pub fn recent_messages(&self, max: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(max);
        &self.messages[start..]
    }

    /// Persist this session to disk as JSON.
    pub fn save_to(&self, dir: &Path) -> Result<(), DeskError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.id));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a session from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self, DeskError> {
        let json = std::fs::read_to_string(path)?;
        let session: Self = serde_json::from_str(&json)?;
        Ok(session)
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

    #[test]
    fn test_appends_are_monotonic() {
        let mut session = Session::new();
        session.push_message(Message::user("one"));
        session.push_message(Message::assistant("two"));
        session.push_message(Message::user("three"));

        let contents: Vec<&str> = session
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn test_recent_messages_window() {
        let mut session = Session::new();
        for i in 0..10 {
            session.push_message(Message::user(format!("msg-{}", i)));
        }
        let recent = session.recent_messages(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "msg-7");

        // A window larger than the history returns everything.
        assert_eq!(session.recent_messages(100).len(), 10);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new();
        session.push_message(Message::user("hello"));
        session.push_message(Message::tool_result("call-1", "result"));
        session.save_to(dir.path()).unwrap();

        let path = dir.path().join(format!("{}.json", session.id));
        let loaded = Session::load_from(&path).unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].tool_call_id.as_deref(), Some("call-1"));
    }
}
