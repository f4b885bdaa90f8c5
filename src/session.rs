//! Per-process session state.

use crate::history::ConversationHistory;

/// The loaded page text and the conversation about it.
///
/// An empty `content` means no page has been loaded yet. Lives for one run of
/// the process and is never persisted.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub content: String,
    pub history: ConversationHistory,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the page text wholesale after a successful fetch
    pub fn load_content(&mut self, content: String) {
        self.content = content;
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}
