//! Conversation history shared by both backends.
//!
//! The stateless backend stores one role-tagged message per entry, the stateful
//! backend stores one `{user, assistant}` exchange per entry. Entries are never
//! edited or removed.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged message in chat-completions shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One stored entry of the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEntry {
    Message(ChatMessage),
    Exchange { user: String, assistant: String },
}

impl HistoryEntry {
    /// The role-tagged message, for entries recorded by the stateless backend
    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            HistoryEntry::Message(message) => Some(message),
            HistoryEntry::Exchange { .. } => None,
        }
    }
}

/// Append-only log of the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The last `n` stored entries, oldest first
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
