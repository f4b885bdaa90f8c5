//! Line-based console loop.
//!
//! The loop first asks for a URL until a page loads, then answers questions
//! about that page. `exit` at either prompt ends the whole program; there is no
//! way back to the URL prompt once chatting has started.

use reqwest::Client;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use crate::backend::{get_response, ChatBackend};
use crate::scraper;
use crate::session::SessionState;

const EXIT_COMMAND: &str = "exit";

/// Where the console is in its conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingUrl,
    Chatting,
}

pub struct Console<B> {
    client: Client,
    backend: B,
    state: SessionState,
}

impl<B: ChatBackend> Console<B> {
    pub fn new(client: Client, backend: B) -> Self {
        Self {
            client,
            backend,
            state: SessionState::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run the loop until `exit` or end of input
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        write_line(output, "Website Chatbot (type 'exit' to quit)").await?;
        write_line(output, "First, enter the website URL:").await?;

        let mut phase = Phase::AwaitingUrl;
        loop {
            match phase {
                Phase::AwaitingUrl => {
                    prompt(output, "\nURL: ").await?;
                    let Some(line) = lines.next_line().await? else {
                        break;
                    };
                    let url = line.trim();
                    if is_exit(url) {
                        break;
                    }

                    match scraper::fetch_content(&self.client, url).await {
                        Ok(content) => {
                            info!(%url, chars = content.chars().count(), "page loaded");
                            self.state.load_content(content);
                            write_line(output, "Website content fetched successfully!").await?;
                            write_line(
                                output,
                                "\nWebsite content loaded! You can now ask questions about it.",
                            )
                            .await?;
                            phase = Phase::Chatting;
                        }
                        Err(err) => {
                            warn!(%url, error = %err, "page fetch failed");
                            write_line(output, &err.to_string()).await?;
                        }
                    }
                }
                Phase::Chatting => {
                    prompt(output, "\nYou: ").await?;
                    let Some(line) = lines.next_line().await? else {
                        break;
                    };
                    let question = line.trim();
                    if is_exit(question) {
                        break;
                    }

                    let reply = get_response(&mut self.backend, &mut self.state, question).await;
                    write_line(output, &format!("\nBot: {}", reply)).await?;
                }
            }
        }

        Ok(())
    }
}

fn is_exit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(EXIT_COMMAND)
}

async fn prompt<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::BackendKind;
    use crate::prompt::PromptPayload;
    use crate::scraper::create_client;

    const PAGE: &str = "<html><body><script>x</script><p>Hello World</p></body></html>";

    async fn page_server(hits: usize) -> (mockito::ServerGuard, mockito::Mock) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(PAGE)
            .expect(hits)
            .create_async()
            .await;
        (server, mock)
    }

    async fn run_console(backend: FakeBackend, input: &str) -> (Console<FakeBackend>, String) {
        let mut console = Console::new(create_client().unwrap(), backend);
        let mut output = Vec::new();
        console.run(input.as_bytes(), &mut output).await.unwrap();
        (console, String::from_utf8(output).unwrap())
    }

    #[test]
    fn exit_is_case_insensitive_and_trimmed() {
        assert!(is_exit("exit"));
        assert!(is_exit("  EXIT \t"));
        assert!(is_exit("Exit"));
        assert!(!is_exit("exit now"));
    }

    #[tokio::test]
    async fn invalid_url_stays_at_url_prompt() {
        let (console, output) = run_console(
            FakeBackend::replying(BackendKind::OpenAi, []),
            "not a url\nexit\n",
        )
        .await;

        assert!(output.contains("Error: Invalid URL format"));
        assert_eq!(output.matches("URL: ").count(), 2);
        assert!(!output.contains("You: "));
        assert!(!console.state().has_content());
    }

    #[tokio::test]
    async fn loads_page_then_answers_questions() {
        let (server, mock) = page_server(1).await;
        let input = format!("{}/\nWhat does it say?\nexit\n", server.url());

        let (console, output) = run_console(
            FakeBackend::replying(BackendKind::OpenAi, ["It says Hello World."]),
            &input,
        )
        .await;

        assert_eq!(console.state().content, "Hello World");
        assert!(output.contains("Website content fetched successfully!"));
        assert!(output.contains("\nBot: It says Hello World.\n"));

        let PromptPayload::Messages(messages) = &console.backend().payloads[0] else {
            panic!("expected messages");
        };
        assert_eq!(
            messages[1].content,
            "Website content:\nHello World\n\nUser question: What does it say?"
        );
        assert_eq!(console.state().history.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exit_at_url_prompt_fetches_nothing() {
        let (_server, mock) = page_server(0).await;

        let (console, output) = run_console(
            FakeBackend::replying(BackendKind::OpenAi, []),
            "exit\n",
        )
        .await;

        assert!(output.ends_with("\nURL: "));
        assert!(!console.state().has_content());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exit_while_chatting_ends_the_program() {
        let (server, mock) = page_server(1).await;
        let input = format!("{url}/\nEXIT\n{url}/\n", url = server.url());

        let (console, output) = run_console(
            FakeBackend::replying(BackendKind::Gemini, []),
            &input,
        )
        .await;

        assert_eq!(output.matches("URL: ").count(), 1);
        assert!(output.ends_with("\nYou: "));
        assert!(console.backend().payloads.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn backend_errors_keep_the_loop_running() {
        let (server, _mock) = page_server(1).await;
        let input = format!("{}/\nfirst\nsecond\n", server.url());

        let (console, output) =
            run_console(FakeBackend::failing(BackendKind::OpenAi), &input).await;

        assert_eq!(output.matches("Bot: Error getting response: ").count(), 2);
        assert_eq!(console.backend().payloads.len(), 2);
        assert!(console.state().history.is_empty());
    }

    #[tokio::test]
    async fn end_of_input_behaves_like_exit() {
        let (console, output) =
            run_console(FakeBackend::replying(BackendKind::OpenAi, []), "").await;

        assert!(output.ends_with("\nURL: "));
        assert!(!console.state().has_content());
    }
}
