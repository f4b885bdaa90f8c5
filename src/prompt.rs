//! Prompt construction for both backend styles.

use std::borrow::Cow;

use crate::backend::BackendKind;
use crate::history::{ChatMessage, ConversationHistory, HistoryEntry};

/// Fixed instruction that scopes the model to the page content
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions about a website's content. \
Use only the information provided in the website content to answer questions. \
If you cannot find relevant information in the content, say so.";

/// Maximum number of page characters sent to the model
pub const MAX_CONTENT_CHARS: usize = 3000;

/// Appended to the page text when it was cut at [`MAX_CONTENT_CHARS`]
pub const TRUNCATION_MARKER: &str = "... [Content truncated]";

/// Number of trailing history entries replayed to the stateless backend.
///
/// Counts stored entries, so with two entries per exchange this covers one and
/// a half exchanges.
pub const HISTORY_WINDOW: usize = 3;

/// The request body for one turn, in the shape the backend expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPayload {
    /// Ordered messages for a stateless chat-completions call
    Messages(Vec<ChatMessage>),
    /// A single prompt string for a stateful chat session
    Text(String),
}

/// Cap page text at [`MAX_CONTENT_CHARS`] characters, marking any cut
pub fn truncate_content(content: &str) -> Cow<'_, str> {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &content[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(content),
    }
}

/// The user block carrying the page text and the question
pub fn content_block(content: &str, question: &str) -> String {
    format!(
        "Website content:\n{}\n\nUser question: {}",
        truncate_content(content),
        question
    )
}

/// Build the payload for one turn.
///
/// The stateless shape replays the last [`HISTORY_WINDOW`] stored entries after
/// the current question; the stateful shape carries no history because the
/// backend session remembers earlier turns itself.
pub fn build(
    content: &str,
    question: &str,
    history: &ConversationHistory,
    kind: BackendKind,
) -> PromptPayload {
    match kind {
        BackendKind::OpenAi => PromptPayload::Messages(build_messages(content, question, history)),
        BackendKind::Gemini => PromptPayload::Text(build_text(content, question)),
    }
}

fn build_messages(
    content: &str,
    question: &str,
    history: &ConversationHistory,
) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(content_block(content, question)),
    ];
    messages.extend(
        history
            .recent(HISTORY_WINDOW)
            .iter()
            .filter_map(HistoryEntry::as_message)
            .cloned(),
    );
    messages
}

fn build_text(content: &str, question: &str) -> String {
    format!("{}\n\n{}", SYSTEM_PROMPT, content_block(content, question))
}
