//! Sitechat CLI - ask questions about a webpage
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use sitechat::backend::build_backend;
use sitechat::config::ConfigError;
use sitechat::{scraper, BackendKind, Config, Console};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sitechat")]
#[command(author, version, about = "Ask an LLM questions about a webpage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// LLM backend to use (overrides the config file)
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendKind>,

    /// Model identifier (overrides the config file)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Path to a sitechat.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a webpage and chat about it (default)
    Chat,
    /// Print the text extracted from a webpage
    Extract {
        /// URL to extract
        url: String,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(backend) = cli.backend {
                config.agent.backend = backend;
            }
            if let Some(model) = cli.model {
                config.agent.model = Some(model);
            }

            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            return chat(&config, stdin, &mut stdout, &mut std::io::stderr()).await;
        }
        Commands::Extract { url } => {
            let client = scraper::create_client()?;
            match scraper::fetch_content(&client, &url).await {
                Ok(text) => {
                    println!("{}", text);
                    println!("\n--- Extracted {} characters ---", text.chars().count());
                }
                Err(err) => {
                    eprintln!("{}", err.to_string().red());
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "sitechat", &mut std::io::stdout());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Start the console loop, or report a missing API key and fail before it starts
async fn chat<R, W, E>(
    config: &Config,
    input: R,
    output: &mut W,
    errors: &mut E,
) -> anyhow::Result<ExitCode>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: Write,
{
    let backend = match build_backend(config) {
        Ok(backend) => backend,
        Err(err @ ConfigError::MissingApiKey(_)) => {
            writeln!(errors, "{}", err.to_string().yellow())?;
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return Err(err.into()),
    };

    let client = scraper::create_client()?;
    let mut console = Console::new(client, backend);
    console.run(input, output).await?;
    Ok(ExitCode::SUCCESS)
}

/// Log to stderr so the console conversation on stdout stays clean
fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    if verbose {
        env_filter = env_filter.add_directive("sitechat=debug".parse()?);
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    Ok(())
}
