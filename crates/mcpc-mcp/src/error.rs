//! Error types for MCP operations.

use rmcp::service::ServiceError;
use thiserror::Error;

/// Errors from the MCP session.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to launch MCP server '{path}': {message}")]
    ServerLaunch { path: String, message: String },

    #[error("Failed to initialize MCP session: {0}")]
    SessionInit(String),

    #[error("MCP session is closed")]
    SessionClosed,

    #[error("Tool '{name}' is not provided by the server")]
    ToolNotFound { name: String },

    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    #[error("MCP request '{method}' failed: {source}")]
    Request {
        method: &'static str,
        #[source]
        source: ServiceError,
    },
}

impl From<McpError> for mcpc_types::ToolError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::ToolNotFound { name } => mcpc_types::ToolError::UnknownTool { name },
            McpError::SessionClosed => mcpc_types::ToolError::SessionClosed,
            McpError::ToolExecution { message, .. } => {
                mcpc_types::ToolError::ExecutionFailed(message)
            }
            other => mcpc_types::ToolError::ExecutionFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpc_types::ToolError;

    #[test]
    fn tool_not_found_maps_to_unknown_tool() {
        let err: ToolError = McpError::ToolNotFound {
            name: "nope".into(),
        }
        .into();
        assert!(matches!(err, ToolError::UnknownTool { name } if name == "nope"));
    }

    #[test]
    fn session_closed_maps_through() {
        let err: ToolError = McpError::SessionClosed.into();
        assert!(matches!(err, ToolError::SessionClosed));
    }

    #[test]
    fn execution_failure_keeps_server_message() {
        let err: ToolError = McpError::ToolExecution {
            tool: "echo".into(),
            message: "division by zero".into(),
        }
        .into();
        match err {
            ToolError::ExecutionFailed(msg) => assert_eq!(msg, "division by zero"),
            other => panic!("Expected ExecutionFailed, got {other:?}"),
        }
    }

    #[test]
    fn request_failure_names_the_method() {
        let err = McpError::Request {
            method: "tools/list",
            source: ServiceError::TransportClosed,
        };
        assert!(err.to_string().starts_with("MCP request 'tools/list' failed"));
    }
}
