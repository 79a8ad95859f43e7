//! Error hierarchy for mcpc.

use thiserror::Error;

/// Top-level error type for a chat turn.
#[derive(Debug, Error)]
pub enum McpcError {
    #[error("Chat API error: {0}")]
    Api(#[from] ApiError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Model kept requesting tools after {max_rounds} tool-call rounds")]
    ToolCallLoop { max_rounds: usize },
}

/// Errors from the chat-completion API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Errors from running a server tool on the model's behalf.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Session is closed")]
    SessionClosed,
}

impl ToolError {
    /// Whether the failure should be reported back to the model instead of
    /// ending the turn.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ToolError::SessionClosed)
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing credential: set the {var} environment variable")]
    MissingCredential { var: String },

    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_variable() {
        let err = ConfigError::MissingCredential {
            var: "OPENAI_API_KEY".into(),
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn tool_call_loop_display() {
        let err = McpcError::ToolCallLoop { max_rounds: 2 };
        assert_eq!(
            err.to_string(),
            "Model kept requesting tools after 2 tool-call rounds"
        );
    }

    #[test]
    fn session_closed_is_not_recoverable() {
        assert!(!ToolError::SessionClosed.is_recoverable());
        assert!(ToolError::UnknownTool { name: "x".into() }.is_recoverable());
        assert!(ToolError::ExecutionFailed("boom".into()).is_recoverable());
    }

    #[test]
    fn api_error_converts_into_top_level() {
        let err: McpcError = ApiError::Timeout.into();
        assert!(matches!(err, McpcError::Api(ApiError::Timeout)));
    }
}
