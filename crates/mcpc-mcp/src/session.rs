//! MCP session: one server process driven by an `rmcp` client.
//!
//! The server is spawned here so its lifetime stays under our control; its
//! stdio pipes are handed to `rmcp`, which owns the protocol (handshake,
//! request correlation, server pings).

use crate::error::McpError;
use crate::members::{MemberDescriptor, ServerMembers};
use crate::params::ServerParams;
use mcpc_types::{ToolOutput, ToolOutputContent};
use rmcp::model::{
    CallToolRequestParam, Content, ErrorCode, PaginatedRequestParam, RawContent, ResourceContents,
};
use rmcp::service::{Peer, RunningService, ServiceError};
use rmcp::{RoleClient, ServiceExt};
use std::collections::HashSet;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// How long a server gets to exit on its own once its stdin is closed.
const GRACEFUL_EXIT: Duration = Duration::from_secs(5);

/// Name and version the server reported during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Member kinds the server advertised in its capabilities.
#[derive(Debug, Clone, Copy, Default)]
struct Advertised {
    tools: bool,
    prompts: bool,
    resources: bool,
}

struct Connection {
    client: RunningService<RoleClient, ()>,
    child: Child,
}

/// A live session with one MCP server process.
///
/// Exists only after a successful [`McpSession::start`]. The child process is
/// killed if the session is dropped without [`McpSession::close`].
pub struct McpSession {
    script: String,
    connection: Mutex<Option<Connection>>,
    pid: Option<u32>,
    advertised: Advertised,
    server_info: ServerInfo,
    tool_names: Mutex<HashSet<String>>,
}

impl McpSession {
    /// Launch the server and complete the MCP handshake.
    ///
    /// Fails with [`McpError::ServerLaunch`] if the process cannot be started
    /// and [`McpError::SessionInit`] if the handshake does not complete. On
    /// handshake failure the process is shut down before returning.
    pub async fn start(params: &ServerParams) -> Result<Self, McpError> {
        let (program, args) = params.command_line()?;
        tracing::debug!("Launching MCP server: {program:?} {args:?}");

        let launch_error = |message: String| McpError::ServerLaunch {
            path: program.to_string_lossy().into_owned(),
            message,
        };

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| launch_error(e.to_string()))?;
        let pid = child.id();

        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            reap(child, pid).await;
            return Err(launch_error("stdio was not captured".to_string()));
        };

        let client = match ().serve((stdout, stdin)).await {
            Ok(client) => client,
            Err(e) => {
                reap(child, pid).await;
                return Err(McpError::SessionInit(e.to_string()));
            }
        };

        let (advertised, server_info) = match client.peer().peer_info() {
            Some(info) => (
                Advertised {
                    tools: info.capabilities.tools.is_some(),
                    prompts: info.capabilities.prompts.is_some(),
                    resources: info.capabilities.resources.is_some(),
                },
                ServerInfo {
                    name: info.server_info.name.clone(),
                    version: info.server_info.version.clone(),
                },
            ),
            None => (Advertised::default(), ServerInfo::default()),
        };

        let session = Self {
            script: params.script.display().to_string(),
            connection: Mutex::new(Some(Connection { client, child })),
            pid,
            advertised,
            server_info,
            tool_names: Mutex::new(HashSet::new()),
        };

        // Seed the tool-name set used by `call_tool`.
        if let Err(e) = session.list_tools().await {
            session.close().await;
            return Err(McpError::SessionInit(e.to_string()));
        }

        tracing::info!(
            "MCP session with '{}' ({} {}) ready",
            session.script,
            session.server_info.name,
            session.server_info.version
        );
        Ok(session)
    }

    /// Name and version the server reported.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// OS process id of the server.
    pub fn server_pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether [`McpSession::close`] has run.
    pub async fn is_closed(&self) -> bool {
        self.connection.lock().await.is_none()
    }

    /// List tools, prompts and resources.
    ///
    /// A kind the server did not advertise is returned empty without a
    /// request.
    pub async fn list_members(&self) -> Result<ServerMembers, McpError> {
        let tools = self.list_tools().await?;
        let peer = self.peer().await?;

        let prompts = if self.advertised.prompts {
            list_pages("prompts/list", |params| {
                let peer = peer.clone();
                async move {
                    peer.list_prompts(params)
                        .await
                        .map(|page| (page.prompts, page.next_cursor))
                }
            })
            .await?
        } else {
            Vec::new()
        };

        let resources = if self.advertised.resources {
            list_pages("resources/list", |params| {
                let peer = peer.clone();
                async move {
                    peer.list_resources(params)
                        .await
                        .map(|page| (page.resources, page.next_cursor))
                }
            })
            .await?
        } else {
            Vec::new()
        };

        Ok(ServerMembers {
            tools,
            prompts: prompts.into_iter().map(MemberDescriptor::from).collect(),
            resources: resources.into_iter().map(MemberDescriptor::from).collect(),
        })
    }

    /// List tools and refresh the set of names `call_tool` accepts.
    pub async fn list_tools(&self) -> Result<Vec<MemberDescriptor>, McpError> {
        let peer = self.peer().await?;
        let tools: Vec<MemberDescriptor> = if self.advertised.tools {
            list_pages("tools/list", |params| {
                let peer = peer.clone();
                async move {
                    peer.list_tools(params)
                        .await
                        .map(|page| (page.tools, page.next_cursor))
                }
            })
            .await?
            .into_iter()
            .map(MemberDescriptor::from)
            .collect()
        } else {
            tracing::debug!("Server does not advertise tools");
            Vec::new()
        };

        *self.tool_names.lock().await = tools.iter().map(|t| t.name.clone()).collect();
        Ok(tools)
    }

    /// Call a tool on the server.
    ///
    /// Names missing from the last tool listing fail with
    /// [`McpError::ToolNotFound`] without contacting the server. Object
    /// arguments are passed through; the server validates them.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutput, McpError> {
        let peer = self.peer().await?;
        if !self.tool_names.lock().await.contains(name) {
            return Err(McpError::ToolNotFound {
                name: name.to_string(),
            });
        }

        let execution_error = |message: String| McpError::ToolExecution {
            tool: name.to_string(),
            message,
        };

        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(execution_error(format!(
                    "arguments must be a JSON object, got {other}"
                )));
            }
        };

        let request = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments),
        };
        let result = match peer.call_tool(request).await {
            Ok(result) => result,
            Err(e) => {
                if self.is_closed().await {
                    return Err(McpError::SessionClosed);
                }
                return Err(match e {
                    ServiceError::McpError(err) => execution_error(err.message.to_string()),
                    other => execution_error(other.to_string()),
                });
            }
        };

        let is_error = result.is_error.unwrap_or(false);
        tracing::debug!(
            "Tool '{name}' returned {} item(s), is_error={is_error}",
            result.content.len()
        );

        Ok(ToolOutput {
            content: result.content.into_iter().filter_map(output_content).collect(),
            is_error,
        })
    }

    /// Shut down the client and the server process.
    ///
    /// Idempotent: calls after the first do nothing.
    pub async fn close(&self) {
        let connection = self.connection.lock().await.take();
        if let Some(Connection { client, child }) = connection {
            tracing::info!("Closing MCP session with '{}'", self.script);
            // Ending the client drops the pipes, which closes the server's stdin.
            if let Err(e) = client.cancel().await {
                tracing::warn!("MCP client task ended abnormally: {e}");
            }
            reap(child, self.pid).await;
        }
    }

    async fn peer(&self) -> Result<Peer<RoleClient>, McpError> {
        self.connection
            .lock()
            .await
            .as_ref()
            .map(|c| c.client.peer().clone())
            .ok_or(McpError::SessionClosed)
    }
}

/// Collect every page of a `*/list` method.
///
/// Stops when the server stops returning a cursor or hands back one it has
/// already used. A server without the method yields whatever was collected.
async fn list_pages<T, F, Fut>(method: &'static str, mut fetch: F) -> Result<Vec<T>, McpError>
where
    F: FnMut(Option<PaginatedRequestParam>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>), ServiceError>>,
{
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let params = cursor.take().map(|c| PaginatedRequestParam { cursor: Some(c) });
        let (page, next) = match fetch(params).await {
            Ok(page) => page,
            Err(ServiceError::McpError(err)) if err.code == ErrorCode::METHOD_NOT_FOUND => {
                tracing::debug!("Server does not implement {method}");
                return Ok(items);
            }
            Err(source) => return Err(McpError::Request { method, source }),
        };
        items.extend(page);

        match unseen_cursor(&mut seen, next) {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(items)
}

/// The next cursor to follow, or `None` when pagination is over.
fn unseen_cursor(seen: &mut HashSet<String>, next: Option<String>) -> Option<String> {
    let next = next.filter(|c| !c.is_empty())?;
    if seen.insert(next.clone()) {
        Some(next)
    } else {
        tracing::warn!("Server repeated pagination cursor {next:?}; stopping");
        None
    }
}

fn output_content(content: Content) -> Option<ToolOutputContent> {
    match content.raw {
        RawContent::Text(text) => Some(ToolOutputContent::Text { text: text.text }),
        RawContent::Image(image) => Some(ToolOutputContent::Image {
            data: image.data,
            mime_type: image.mime_type,
        }),
        RawContent::Audio(audio) => Some(ToolOutputContent::Text {
            text: format!("[audio: {}]", audio.mime_type),
        }),
        RawContent::Resource(embedded) => Some(match embedded.resource {
            ResourceContents::TextResourceContents { uri, text, .. } => {
                ToolOutputContent::Resource {
                    uri,
                    text: Some(text),
                }
            }
            ResourceContents::BlobResourceContents { uri, .. } => {
                ToolOutputContent::Resource { uri, text: None }
            }
        }),
        // Resource links carry no content of their own.
        _ => None,
    }
}

/// Wait for the server to exit, killing it if it lingers.
async fn reap(mut child: Child, pid: Option<u32>) {
    match tokio::time::timeout(GRACEFUL_EXIT, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!("MCP server {pid:?} exited: {status}"),
        Ok(Err(e)) => tracing::warn!("Failed to wait for MCP server {pid:?}: {e}"),
        Err(_) => {
            tracing::warn!("MCP server {pid:?} did not exit, killing it");
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill MCP server {pid:?}: {e}");
            }
        }
    }
}
