//! MCP (Model Context Protocol) session library for mcpc.
//!
//! Launches one stdio-based MCP server as a child process and drives it with
//! the `rmcp` client: handshake, member discovery (tools, prompts and
//! resources) and tool invocation.

pub mod error;
mod executor;
pub mod members;
pub mod params;
pub mod session;

pub use error::McpError;
pub use members::{MemberDescriptor, MemberKind, ServerMembers};
pub use params::ServerParams;
pub use session::{McpSession, ServerInfo};
