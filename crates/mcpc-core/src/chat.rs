//! The chat loop: conversation history plus tool-call rounds.

use mcpc_types::{
    ChatRequest, Message, McpcError, Provider, ToolCall, ToolDefinition, ToolError,
    ToolExecutor, ToolOutput, Usage,
};
use std::sync::Arc;

/// Events emitted while a user message is being answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A tool is about to be called with these arguments.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },
    /// A tool call finished; failures are reported with `is_error`.
    ToolResult {
        name: String,
        output: String,
        is_error: bool,
    },
    /// Token usage of one model call.
    Usage(Usage),
    /// The model produced its final text for this message.
    Done,
}

/// Per-handler request settings.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: usize,
}

/// Where a turn stands between suspension points.
enum TurnState {
    /// Ready to send the conversation to the model.
    ModelCalled { rounds_used: usize },
    /// The model asked for tools; their results go back on the next call.
    ToolRound {
        calls: Vec<ToolCall>,
        rounds_used: usize,
    },
    /// Final text is in; back to waiting for the user.
    AwaitingUserInput(String),
}

/// Holds one conversation and drives it against a provider and a tool executor.
pub struct ChatHandler {
    provider: Arc<dyn Provider>,
    tools: Arc<dyn ToolExecutor>,
    settings: ChatSettings,
    conversation: Vec<Message>,
    total_usage: Usage,
}

impl ChatHandler {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolExecutor>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
            conversation: Vec::new(),
            total_usage: Usage::default(),
        }
    }

    /// The conversation so far, oldest first.
    pub fn conversation(&self) -> &[Message] {
        &self.conversation
    }

    /// Usage accumulated over every model call made by this handler.
    pub fn total_usage(&self) -> &Usage {
        &self.total_usage
    }

    /// Answer one user message, running tool rounds as the model requests them.
    ///
    /// Returns the model's final text. Tool failures are fed back to the model;
    /// a closed session ends the turn with an error.
    pub async fn send_user_message<F>(
        &mut self,
        text: &str,
        mut on_event: F,
    ) -> Result<String, McpcError>
    where
        F: FnMut(ChatEvent),
    {
        self.conversation.push(Message::user(text));

        let tools = self.tools.tool_definitions().await?;
        tracing::debug!("Turn started with {} tools available", tools.len());

        let mut state = TurnState::ModelCalled { rounds_used: 0 };
        loop {
            state = match state {
                TurnState::ModelCalled { rounds_used } => {
                    self.call_model(&tools, rounds_used, &mut on_event).await?
                }
                TurnState::ToolRound { calls, rounds_used } => {
                    self.run_tools(calls, &mut on_event).await?;
                    TurnState::ModelCalled {
                        rounds_used: rounds_used + 1,
                    }
                }
                TurnState::AwaitingUserInput(reply) => {
                    on_event(ChatEvent::Done);
                    return Ok(reply);
                }
            };
        }
    }

    async fn call_model<F>(
        &mut self,
        tools: &[ToolDefinition],
        rounds_used: usize,
        on_event: &mut F,
    ) -> Result<TurnState, McpcError>
    where
        F: FnMut(ChatEvent),
    {
        let mut request = ChatRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: self.settings.system_prompt.clone(),
            messages: std::mem::take(&mut self.conversation),
            tools: tools.to_vec(),
        };

        let result = self.provider.complete(&request).await;

        // Hand the history back before looking at the result.
        self.conversation = std::mem::take(&mut request.messages);

        let response = result?;
        self.total_usage.add(&response.usage);
        on_event(ChatEvent::Usage(response.usage.clone()));

        if !response.wants_tools() {
            let reply = response.content.unwrap_or_default();
            self.conversation.push(Message::assistant_text(reply.clone()));
            return Ok(TurnState::AwaitingUserInput(reply));
        }

        if rounds_used >= self.settings.max_tool_rounds {
            tracing::warn!(
                "Model requested tools again after {rounds_used} rounds; giving up on this turn"
            );
            return Err(McpcError::ToolCallLoop {
                max_rounds: self.settings.max_tool_rounds,
            });
        }

        self.conversation.push(Message::Assistant {
            content: response.content,
            tool_calls: response.tool_calls.clone(),
        });
        Ok(TurnState::ToolRound {
            calls: response.tool_calls,
            rounds_used,
        })
    }

    /// Execute each call in order, appending one tool message per call.
    ///
    /// On a fatal error the remaining calls still get an error result so the
    /// history stays well-formed for the next turn.
    async fn run_tools<F>(
        &mut self,
        calls: Vec<ToolCall>,
        on_event: &mut F,
    ) -> Result<(), McpcError>
    where
        F: FnMut(ChatEvent),
    {
        let mut fatal: Option<ToolError> = None;

        for call in calls {
            let skipped = fatal.as_ref().map(ToString::to_string);
            let output = match skipped {
                Some(reason) => ToolOutput::error(reason),
                None => {
                    on_event(ChatEvent::ToolCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    });
                    let output = match self.tools.call_tool(&call.name, call.arguments).await {
                        Ok(output) => output,
                        Err(err) => {
                            tracing::debug!("Tool '{}' failed: {err}", call.name);
                            let output = ToolOutput::error(err.to_string());
                            if !err.is_recoverable() {
                                fatal = Some(err);
                            }
                            output
                        }
                    };
                    on_event(ChatEvent::ToolResult {
                        name: call.name.clone(),
                        output: output.to_text(),
                        is_error: output.is_error,
                    });
                    output
                }
            };
            self.conversation.push(Message::tool_result(call.id, &output));
        }

        match fatal {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
