//! Interactive chat loop on stdin/stdout.

use anyhow::Result;
use mcpc_api::OpenAiProvider;
use mcpc_config::ClientConfig;
use mcpc_core::{ChatEvent, ChatHandler, ChatSettings};
use mcpc_mcp::McpSession;
use mcpc_types::{Usage, truncate_str};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Longest argument rendering echoed after a tool call.
const MAX_ARGS_DISPLAY: usize = 200;

/// Run the REPL until `quit`, `exit` or end of input.
pub async fn run(
    session: Arc<McpSession>,
    provider: OpenAiProvider,
    config: &ClientConfig,
) -> Result<()> {
    let mut handler = ChatHandler::new(
        Arc::new(provider),
        session.clone(),
        ChatSettings {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            max_tool_rounds: config.max_tool_rounds,
        },
    );

    let info = session.server_info();
    println!("\nMCP Client's Chat Started!");
    if !info.name.is_empty() {
        println!("Connected to {} {} (model: {})", info.name, info.version, config.model);
    }
    println!("Type your queries or 'quit' to exit.");

    let mut lines = spawn_line_reader();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.recv().await else {
            println!();
            break;
        };
        let line = line?;
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            break;
        }

        let mut last_args = String::new();
        let result = handler
            .send_user_message(query, |event| match event {
                ChatEvent::ToolCall { arguments, .. } => {
                    last_args = truncate_str(&arguments.to_string(), MAX_ARGS_DISPLAY).to_string();
                }
                ChatEvent::ToolResult {
                    name,
                    output,
                    is_error,
                } => {
                    if is_error {
                        println!("\n[Error: {}]", error_text(&output));
                    } else {
                        println!("\n[Used {name}({last_args})]");
                    }
                }
                ChatEvent::Usage(usage) => {
                    tracing::debug!(
                        "usage: {} prompt, {} completion tokens",
                        usage.prompt_tokens,
                        usage.completion_tokens
                    );
                }
                ChatEvent::Done => {}
            })
            .await;

        match result {
            Ok(reply) => println!("\nAssistant: {reply}"),
            Err(e) => eprintln!("\nError: {e}"),
        }
    }

    println!("\nGoodbye!");
    print_usage(handler.total_usage());
    Ok(())
}

/// Read stdin lines on a plain thread so an interrupted REPL never waits on
/// a pending read at runtime shutdown.
fn spawn_line_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

/// Tool error text without a doubled `Error:` prefix.
fn error_text(output: &str) -> &str {
    output
        .strip_prefix("Error:")
        .map(str::trim_start)
        .unwrap_or(output)
}

fn print_usage(usage: &Usage) {
    if usage.prompt_tokens + usage.completion_tokens > 0 {
        eprintln!(
            "Tokens: prompt {}, completion {}",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
}
