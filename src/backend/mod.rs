//! Chat backend adapters.
//!
//! Both backends answer a [`PromptPayload`] with generated text. The OpenAI
//! backend is stateless and receives the full message list on every turn; the
//! Gemini backend keeps a server-side style chat session and receives only the
//! newest prompt.

pub mod gemini;
pub mod openai;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use crate::config::{Config, ConfigError};
use crate::history::{ChatMessage, ConversationHistory, HistoryEntry};
use crate::prompt::{self, PromptPayload};
use crate::session::SessionState;

/// Returned instead of calling the model when no page is loaded
pub const NO_CONTENT_MESSAGE: &str = "Please fetch website content first by entering a website URL";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("response contained no text")]
    EmptyResponse,
    #[error("{0} backend cannot send this payload shape")]
    PayloadMismatch(BackendKind),
}

/// Which LLM service answers the questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Stateless chat completions, full context resent each turn
    #[default]
    #[value(name = "openai")]
    OpenAi,
    /// Stateful chat session that remembers earlier turns
    Gemini,
}

impl BackendKind {
    pub fn default_model(self) -> &'static str {
        match self {
            BackendKind::OpenAi => openai::DEFAULT_MODEL,
            BackendKind::Gemini => gemini::DEFAULT_MODEL,
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            BackendKind::OpenAi => openai::DEFAULT_BASE_URL,
            BackendKind::Gemini => gemini::DEFAULT_BASE_URL,
        }
    }

    /// Environment variables holding the API key, in lookup order
    pub fn api_key_vars(self) -> &'static [&'static str] {
        match self {
            BackendKind::OpenAi => &["OPENAI_API_KEY"],
            BackendKind::Gemini => &["PALM_API_KEY", "GEMINI_API_KEY"],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::OpenAi => f.write_str("openai"),
            BackendKind::Gemini => f.write_str("gemini"),
        }
    }
}

/// Sends a built prompt to an LLM and returns the generated text
#[async_trait]
pub trait ChatBackend: Send {
    fn kind(&self) -> BackendKind;

    async fn send(&mut self, payload: PromptPayload) -> Result<String, BackendError>;
}

#[async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    async fn send(&mut self, payload: PromptPayload) -> Result<String, BackendError> {
        (**self).send(payload).await
    }
}

/// Build the backend selected by the configuration
pub fn build_backend(config: &Config) -> Result<Box<dyn ChatBackend>, ConfigError> {
    let kind = config.agent.backend;
    let api_key = config.api_key()?.to_string();
    let model = config.model().to_string();
    let base_url = config.base_url().to_string();

    debug!(backend = %kind, %model, %base_url, "building chat backend");
    let backend: Box<dyn ChatBackend> = match kind {
        BackendKind::OpenAi => Box::new(OpenAiBackend::new(api_key, model, base_url)),
        BackendKind::Gemini => Box::new(GeminiBackend::new(api_key, model, base_url)),
    };
    Ok(backend)
}

/// Answer a question about the loaded page.
///
/// Without page content this returns [`NO_CONTENT_MESSAGE`] and makes no call.
/// A backend failure becomes an `Error getting response: ...` line and leaves
/// the history untouched; on success the turn is appended to the history.
pub async fn get_response(
    backend: &mut dyn ChatBackend,
    state: &mut SessionState,
    question: &str,
) -> String {
    if !state.has_content() {
        return NO_CONTENT_MESSAGE.to_string();
    }

    let kind = backend.kind();
    let payload = prompt::build(&state.content, question, &state.history, kind);

    match backend.send(payload).await {
        Ok(reply) => {
            record_turn(&mut state.history, kind, question, &reply);
            reply
        }
        Err(err) => {
            warn!(backend = %kind, error = %err, "chat request failed");
            format!("Error getting response: {}", err)
        }
    }
}

fn record_turn(history: &mut ConversationHistory, kind: BackendKind, question: &str, reply: &str) {
    match kind {
        BackendKind::OpenAi => {
            history.push(HistoryEntry::Message(ChatMessage::user(question)));
            history.push(HistoryEntry::Message(ChatMessage::assistant(reply)));
        }
        BackendKind::Gemini => history.push(HistoryEntry::Exchange {
            user: question.to_string(),
            assistant: reply.to_string(),
        }),
    }
}

/// Pull a readable message out of an API error body.
///
/// OpenAI and Gemini both wrap failures as `{"error": {"message": ...}}`; any
/// other body is returned trimmed.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message").or(Some(error)))
                .and_then(|message| message.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
