//! Stateful Gemini chat backend.
//!
//! A [`ChatSession`] is created on the first call and kept for the life of the
//! backend. It holds the transcript of every successful turn and replays it on
//! each `generateContent` request, so callers only ever send the newest prompt.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{api_error_message, BackendError, BackendKind, ChatBackend};
use crate::prompt::PromptPayload;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn new(role: &str, text: String) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Endpoint details shared by every request
struct GeminiApi {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiApi {
    async fn generate(&self, contents: &[Content]) -> Result<String, BackendError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        debug!(%url, turns = contents.len(), "calling generateContent");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest { contents })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(BackendError::Api {
                status,
                message: api_error_message(&body),
            });
        }

        let generated: GenerateContentResponse = response.json().await?;
        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Transcript of one ongoing conversation with the model
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Content>,
}

impl ChatSession {
    /// Send one message with the full transcript; it is recorded only on success
    async fn send_message(
        &mut self,
        api: &GeminiApi,
        text: String,
    ) -> Result<String, BackendError> {
        let mut contents = self.history.clone();
        contents.push(Content::new("user", text));

        let reply = api.generate(&contents).await?;

        contents.push(Content::new("model", reply.clone()));
        self.history = contents;
        Ok(reply)
    }

    /// Number of recorded turns, counting user and model messages separately
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Sends only the newest prompt and relies on the session for earlier turns
pub struct GeminiBackend {
    api: GeminiApi,
    chat: Option<ChatSession>,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api: GeminiApi {
                client: Client::new(),
                api_key,
                model,
                base_url,
            },
            chat: None,
        }
    }

    /// The chat session, once the first message has been sent
    pub fn session(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn send(&mut self, payload: PromptPayload) -> Result<String, BackendError> {
        let PromptPayload::Text(prompt) = payload else {
            return Err(BackendError::PayloadMismatch(self.kind()));
        };

        let chat = self.chat.get_or_insert_with(|| {
            info!(model = %self.api.model, "starting chat session");
            ChatSession::default()
        });
        chat.send_message(&self.api, prompt).await
    }
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("api_key", &"<redacted>")
            .field("model", &self.api.model)
            .field("base_url", &self.api.base_url)
            .field("chat", &self.chat)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::get_response;
    use crate::history::HistoryEntry;
    use crate::prompt::SYSTEM_PROMPT;
    use crate::session::SessionState;
    use mockito::Matcher;
    use serde_json::json;

    const PATH: &str = "/models/gemini-2.0-flash:generateContent";

    fn reply(text: &str) -> String {
        json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]
        })
        .to_string()
    }

    fn prompt_for(question: &str) -> String {
        format!("{SYSTEM_PROMPT}\n\nWebsite content:\nHello World\n\nUser question: {question}")
    }

    fn backend(server: &mockito::ServerGuard) -> GeminiBackend {
        GeminiBackend::new("palm-key".to_string(), DEFAULT_MODEL.to_string(), server.url())
    }

    #[tokio::test]
    async fn session_is_created_lazily_and_reused() {
        let mut server = mockito::Server::new_async().await;
        let first_prompt = prompt_for("first?");
        let second_prompt = prompt_for("second?");

        let first = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "palm-key")
            .match_body(Matcher::Json(json!({
                "contents": [{"role": "user", "parts": [{"text": first_prompt}]}]
            })))
            .with_body(reply("one"))
            .create_async()
            .await;

        let mut backend = backend(&server);
        let mut state = SessionState::new();
        state.load_content("Hello World".to_string());
        assert!(backend.session().is_none());

        assert_eq!(get_response(&mut backend, &mut state, "first?").await, "one");
        first.assert_async().await;
        first.remove_async().await;

        let second = server
            .mock("POST", PATH)
            .match_body(Matcher::Json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": first_prompt}]},
                    {"role": "model", "parts": [{"text": "one"}]},
                    {"role": "user", "parts": [{"text": second_prompt}]}
                ]
            })))
            .with_body(reply("two"))
            .create_async()
            .await;

        assert_eq!(get_response(&mut backend, &mut state, "second?").await, "two");
        second.assert_async().await;

        assert_eq!(backend.session().map(ChatSession::len), Some(4));
        assert_eq!(
            state.history.entries()[1],
            HistoryEntry::Exchange {
                user: "second?".to_string(),
                assistant: "two".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn failed_turn_is_not_remembered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let mut backend = backend(&server);
        let mut state = SessionState::new();
        state.load_content("page".to_string());

        let reply = get_response(&mut backend, &mut state, "question").await;

        assert_eq!(
            reply,
            "Error getting response: API request failed with status 429: Resource has been exhausted"
        );
        assert!(backend.session().is_some_and(ChatSession::is_empty));
        assert!(state.history.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn candidate_without_text_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", PATH)
            .with_body(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
            .create_async()
            .await;

        let mut backend = backend(&server);
        let err = backend
            .send(PromptPayload::Text("prompt".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::EmptyResponse));
    }

    #[tokio::test]
    async fn rejects_message_payloads() {
        let mut backend = GeminiBackend::new(
            "palm-key".to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_BASE_URL.to_string(),
        );
        let err = backend.send(PromptPayload::Messages(Vec::new())).await.unwrap_err();

        assert!(matches!(err, BackendError::PayloadMismatch(BackendKind::Gemini)));
        assert!(backend.session().is_none());
    }
}
