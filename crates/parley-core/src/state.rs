//! UI-agnostic chat log types
//!
//! The session is append-only: entries are created by the controller when a
//! message is finalized and are never edited or removed afterwards.

use chrono::{DateTime, Local};

/// Who produced a chat entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

/// One finalized message in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    origin: Origin,
    text: String,
    created_at: DateTime<Local>,
}

impl ChatEntry {
    pub fn new(origin: Origin, text: impl Into<String>, created_at: DateTime<Local>) -> Self {
        Self {
            origin,
            text: text.into(),
            created_at,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Time label shown under the bubble, e.g. "3:07:42 PM"
    pub fn time_label(&self) -> String {
        self.created_at.format("%-I:%M:%S %p").to_string()
    }
}

/// Ordered, append-only conversation owned by the controller
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    entries: Vec<ChatEntry>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub(crate) fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_label_uses_twelve_hour_clock() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 15, 7, 42).unwrap();
        let entry = ChatEntry::new(Origin::User, "hi", at);
        assert_eq!(entry.time_label(), "3:07:42 PM");
    }

    #[test]
    fn test_session_preserves_append_order() {
        let mut session = ChatSession::new();
        let now = Local::now();
        session.push(ChatEntry::new(Origin::User, "first", now));
        session.push(ChatEntry::new(Origin::Assistant, "second", now));

        let texts: Vec<&str> = session.entries().iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(session.last().map(|e| e.origin()), Some(Origin::Assistant));
    }
}
