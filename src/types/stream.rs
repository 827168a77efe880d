//! Stream events produced by a model backend

use std::pin::Pin;

use futures::Stream;

use super::{Message, ToolDefinition};
use crate::error::GatewayError;

/// A single incremental event from a streaming completion.
///
/// One upstream chunk may expand into several events (e.g. a content
/// fragment and a tool-call fragment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// Plain answer text
    ContentDelta { delta: String },
    /// A fragment of the tool call being built in slot `index`
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        function_name: Option<String>,
        arguments_delta: Option<String>,
    },
    /// The upstream signalled completion
    StreamEnd { finish_reason: Option<String> },
}

impl ChatStreamEvent {
    pub fn content(delta: impl Into<String>) -> Self {
        Self::ContentDelta {
            delta: delta.into(),
        }
    }

    /// Arguments-only fragment for `index`.
    pub fn arguments(index: usize, fragment: impl Into<String>) -> Self {
        Self::ToolCallDelta {
            index,
            id: None,
            function_name: None,
            arguments_delta: Some(fragment.into()),
        }
    }

    /// Header fragment announcing id and name for `index`.
    pub fn tool_call_start(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ToolCallDelta {
            index,
            id: Some(id.into()),
            function_name: Some(name.into()),
            arguments_delta: None,
        }
    }
}

/// Boxed stream of model events
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, GatewayError>> + Send>>;

/// What the orchestrator sends to the model for one turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
}
