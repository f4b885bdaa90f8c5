//! # Sitechat
//!
//! A console assistant that answers questions about a single webpage using an LLM.
//!
//! ## Pipeline
//!
//! - **Extraction**: fetch a URL and reduce its HTML to normalized plain text
//! - **Prompting**: cap the page text and combine it with the question and recent history
//! - **Backends**: a stateless OpenAI chat-completions adapter and a stateful Gemini chat session
//! - **Console**: a line-based loop that loads one page and then answers questions about it

pub mod backend;
pub mod config;
pub mod console;
pub mod history;
pub mod prompt;
pub mod scraper;
pub mod session;

pub use backend::{BackendKind, ChatBackend};
pub use config::Config;
pub use console::Console;
pub use session::SessionState;
