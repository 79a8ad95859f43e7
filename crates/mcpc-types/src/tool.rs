//! Tool execution seam between the chat handler and the MCP session.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::{ToolDefinition, ToolError};

/// Result of executing a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The output content items, in server order.
    pub content: Vec<ToolOutputContent>,
    /// Whether the tool reported a failure.
    pub is_error: bool,
}

/// A single piece of tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutputContent {
    Text { text: String },
    Image { data: String, mime_type: String },
    Resource { uri: String, text: Option<String> },
}

impl ToolOutput {
    /// Create a successful text output.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolOutputContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Create an error text output.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolOutputContent::Text { text: text.into() }],
            is_error: true,
        }
    }

    /// Flatten the content into a single string for the chat API.
    ///
    /// Non-text items are rendered as short placeholders.
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolOutputContent::Text { text } => text.clone(),
                ToolOutputContent::Image { mime_type, .. } => format!("[image: {mime_type}]"),
                ToolOutputContent::Resource { uri, text } => match text {
                    Some(text) => text.clone(),
                    None => format!("[resource: {uri}]"),
                },
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Something that can list and run tools on the model's behalf.
///
/// Implemented by the MCP session; the chat handler only sees this trait.
pub trait ToolExecutor: Send + Sync {
    /// Current tool declarations, in the order the server lists them.
    fn tool_definitions(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDefinition>, ToolError>> + Send + '_>>;

    /// Run a tool. Arguments are passed through unvalidated.
    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;
}
