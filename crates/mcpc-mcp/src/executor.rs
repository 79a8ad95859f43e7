//! `McpSession` as a `mcpc_types::ToolExecutor`.

use crate::session::McpSession;
use mcpc_types::{ToolDefinition, ToolError, ToolExecutor, ToolOutput};
use std::future::Future;
use std::pin::Pin;

/// Placeholder for tools the server left undescribed.
const NO_DESCRIPTION: &str = "No description";

impl ToolExecutor for McpSession {
    fn tool_definitions(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ToolDefinition>, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let tools = self.list_tools().await.map_err(ToolError::from)?;
            Ok(tools
                .into_iter()
                .map(|t| ToolDefinition {
                    description: if t.description.is_empty() {
                        NO_DESCRIPTION.to_string()
                    } else {
                        t.description
                    },
                    name: t.name,
                    input_schema: t.input_schema,
                })
                .collect())
        })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            McpSession::call_tool(self, name, arguments)
                .await
                .map_err(ToolError::from)
        })
    }
}
