//! mcpc: a minimal MCP client.
//!
//! Launches an MCP server script over stdio, then either lists what the
//! server offers or chats with a model that can call the server's tools.

mod chat;
mod members;

use anyhow::{Context, Result};
use clap::Parser;
use mcpc_api::OpenAiProvider;
use mcpc_config::{ClientConfig, CliOverrides};
use mcpc_mcp::{McpSession, ServerParams};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "mcpc",
    version,
    about = "A minimal MCP client: list a server's members or chat with its tools"
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(["members", "chat"])
))]
struct Cli {
    /// Path to the MCP server script (.py, .js or an executable)
    server_script: PathBuf,

    /// List the server's tools, prompts and resources
    #[arg(long)]
    members: bool,

    /// Start an interactive chat that can use the server's tools
    #[arg(long)]
    chat: bool,

    /// Command used to run the script, e.g. "uv run python"
    #[arg(long)]
    interpreter: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// Maximum tokens in each response
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Tool-call rounds allowed per message before giving up
    #[arg(long)]
    max_tool_rounds: Option<usize>,

    /// Enable verbose/debug logging
    #[arg(long)]
    verbose: bool,

    /// Extra arguments passed to the server script
    #[arg(last = true)]
    server_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Members,
    Chat,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.chat { Mode::Chat } else { Mode::Members }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mode = cli.mode();

    let config = ClientConfig::load(CliOverrides {
        model: cli.model,
        max_tokens: cli.max_tokens,
        max_tool_rounds: cli.max_tool_rounds,
        interpreter: cli.interpreter,
    })
    .context("Failed to load configuration")?;

    // Chat needs a credential; check it before any process is spawned.
    let provider = match mode {
        Mode::Chat => {
            let api_key = config.require_api_key()?;
            Some(
                OpenAiProvider::new(api_key, &config.api_base_url)
                    .context("Failed to create API client")?,
            )
        }
        Mode::Members => None,
    };

    let params = ServerParams::new(&cli.server_script)
        .with_interpreter(config.interpreter.clone())
        .with_args(cli.server_args);

    let session = Arc::new(McpSession::start(&params).await.with_context(|| {
        format!(
            "Failed to connect to server '{}'",
            cli.server_script.display()
        )
    })?);

    // Polled first: the interrupt handler must exist before the first prompt.
    let outcome = tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted.");
            Ok(())
        }
        result = run_mode(Arc::clone(&session), provider, &config) => result,
    };

    session.close().await;
    outcome
}

async fn run_mode(
    session: Arc<McpSession>,
    provider: Option<OpenAiProvider>,
    config: &ClientConfig,
) -> Result<()> {
    match provider {
        Some(provider) => chat::run(session, provider, config).await,
        None => {
            let members = session
                .list_members()
                .await
                .context("Failed to list server members")?;
            print!("{}", members::format_members(&members));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mode_flag_is_required() {
        assert!(Cli::try_parse_from(["mcpc", "server.py"]).is_err());
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(Cli::try_parse_from(["mcpc", "server.py", "--members", "--chat"]).is_err());
    }

    #[test]
    fn trailing_args_go_to_server() {
        let cli = Cli::try_parse_from([
            "mcpc",
            "server.py",
            "--chat",
            "--max-tool-rounds",
            "2",
            "--",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(cli.mode(), Mode::Chat);
        assert_eq!(cli.max_tool_rounds, Some(2));
        assert_eq!(cli.server_args, vec!["--port", "9000"]);
    }

    #[test]
    fn members_mode() {
        let cli = Cli::try_parse_from(["mcpc", "server.js", "--members"]).unwrap();
        assert_eq!(cli.mode(), Mode::Members);
        assert!(cli.interpreter.is_none());
    }
}
