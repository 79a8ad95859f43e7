//! A configurable mock MCP server for testing.
//!
//! Speaks newline-delimited JSON-RPC over stdin/stdout and offers a single
//! `echo` tool. CLI flags control capabilities and failure modes.

use std::io::{BufRead, Write};

use clap::Parser;
use serde_json::{Value, json};

/// Mock MCP server for integration testing.
#[derive(Parser, Debug)]
#[command(name = "mockmcp")]
struct Args {
    /// Do not advertise the tools capability.
    #[arg(long)]
    no_tools: bool,

    /// Advertise one prompt, `greet`.
    #[arg(long)]
    with_prompts: bool,

    /// Advertise one resource, `readme`.
    #[arg(long)]
    with_resources: bool,

    /// Extra numbered tools listed after `echo`.
    #[arg(long, default_value_t = 0)]
    extra_tools: usize,

    /// Return tools in pages of this size (0 = one page).
    #[arg(long, default_value_t = 0)]
    page_size: usize,

    /// Point the last tools page back at the second one.
    #[arg(long)]
    cycle_cursor: bool,

    /// Sleep this long before answering a `tools/call`.
    #[arg(long, default_value_t = 0)]
    call_delay_ms: u64,

    /// Exit with status 3 as soon as any `tools/call` arrives.
    #[arg(long)]
    exit_on_call: bool,

    /// Exit before reading anything.
    #[arg(long)]
    exit_immediately: bool,

    /// Reply to this method with a JSON-RPC error (repeatable).
    #[arg(long)]
    fail_on: Vec<String>,

    /// Ping the client right after `notifications/initialized`.
    #[arg(long)]
    ping_client: bool,

    /// Write this process's id to the given file on startup.
    #[arg(long)]
    pid_file: Option<std::path::PathBuf>,
}

struct MockServer {
    args: Args,
    out: std::io::Stdout,
}

impl MockServer {
    fn send(&mut self, message: &Value) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{message}");
        let _ = out.flush();
    }

    fn respond(&mut self, id: Value, result: Value) {
        self.send(&json!({"jsonrpc": "2.0", "id": id, "result": result}));
    }

    fn respond_error(&mut self, id: Value, code: i64, message: &str) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }));
    }

    fn handle_request(&mut self, id: Value, method: &str, params: &Value) {
        if self.args.fail_on.iter().any(|m| m == method) {
            self.respond_error(id, -32603, &format!("{method} failed on purpose"));
            return;
        }

        match method {
            "initialize" => {
                let mut capabilities = serde_json::Map::new();
                if !self.args.no_tools {
                    capabilities.insert("tools".into(), json!({}));
                }
                if self.args.with_prompts {
                    capabilities.insert("prompts".into(), json!({}));
                }
                if self.args.with_resources {
                    capabilities.insert("resources".into(), json!({}));
                }
                let version = params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or("2024-11-05")
                    .to_string();
                self.respond(
                    id,
                    json!({
                        "protocolVersion": version,
                        "capabilities": capabilities,
                        "serverInfo": {"name": "mockmcp", "version": env!("CARGO_PKG_VERSION")}
                    }),
                );
            }
            "ping" => self.respond(id, json!({})),
            "tools/list" => {
                let result = self.tools_page(params);
                self.respond(id, result);
            }
            "tools/call" => {
                if self.args.exit_on_call {
                    std::process::exit(3);
                }
                if self.args.call_delay_ms > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(self.args.call_delay_ms));
                }
                let result = call_tool(params);
                self.respond(id, result);
            }
            "prompts/list" => self.respond(
                id,
                json!({"prompts": [{
                    "name": "greet",
                    "description": "Greet someone by name",
                    "arguments": [{"name": "name", "description": "Who to greet", "required": true}]
                }]}),
            ),
            "resources/list" => self.respond(
                id,
                json!({"resources": [{
                    "uri": "file:///readme.md",
                    "name": "readme",
                    "description": "Project readme",
                    "mimeType": "text/markdown"
                }]}),
            ),
            _ => self.respond_error(id, -32601, &format!("Method not found: {method}")),
        }
    }

    fn tools_page(&self, params: &Value) -> Value {
        let mut tools = vec![json!({
            "name": "echo",
            "description": "Echo the input back",
            "inputSchema": {
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }
        })];
        for n in 1..=self.args.extra_tools {
            tools.push(json!({
                "name": format!("tool_{n}"),
                "inputSchema": {"type": "object"}
            }));
        }

        if self.args.page_size == 0 {
            return json!({"tools": tools});
        }

        let start: usize = params
            .get("cursor")
            .and_then(Value::as_str)
            .and_then(|c| c.parse().ok())
            .unwrap_or(0);
        let end = (start + self.args.page_size).min(tools.len());
        let page: Vec<Value> = tools.get(start..end).map(<[Value]>::to_vec).unwrap_or_default();
        if end < tools.len() {
            json!({"tools": page, "nextCursor": end.to_string()})
        } else if self.args.cycle_cursor {
            json!({"tools": page, "nextCursor": self.args.page_size.to_string()})
        } else {
            json!({"tools": page})
        }
    }
}

fn call_tool(params: &Value) -> Value {
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let text = params
        .get("arguments")
        .and_then(|a| a.get("text"))
        .and_then(Value::as_str);

    match (name, text) {
        ("echo", Some(text)) => json!({"content": [{"type": "text", "text": text}]}),
        ("echo", None) => json!({
            "content": [{"type": "text", "text": "missing 'text' argument"}],
            "isError": true
        }),
        (other, _) => json!({
            "content": [{"type": "text", "text": format!("{other} called")}]
        }),
    }
}

fn main() {
    let args = Args::parse();
    if args.exit_immediately {
        std::process::exit(1);
    }
    if let Some(path) = &args.pid_file {
        let _ = std::fs::write(path, std::process::id().to_string());
    }

    let mut server = MockServer {
        args,
        out: std::io::stdout(),
    };

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };

        let method = message.get("method").and_then(Value::as_str);
        let id = message.get("id").cloned();
        match (id, method) {
            (Some(id), Some(method)) => {
                let params = message.get("params").cloned().unwrap_or(Value::Null);
                server.handle_request(id, method, &params);
            }
            (None, Some("notifications/initialized")) => {
                if server.args.ping_client {
                    server.send(&json!({"jsonrpc": "2.0", "id": "mock-ping-1", "method": "ping"}));
                }
            }
            // Other notifications and replies to our pings.
            _ => {}
        }
    }
}
