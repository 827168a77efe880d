use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};
use crate::types::{ChatStreamEvent, ToolCallRef};

/// Slots tracked per model turn before new ones are refused
pub const DEFAULT_MAX_TOOL_CALLS: usize = 100;

/// Tool call still being assembled from stream fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingToolCall {
    pub index: usize,
    /// Set by the first fragment that carries one
    pub id: Option<String>,
    /// Set by the first fragment that carries one
    pub name: Option<String>,
    /// Raw argument text, fragments in arrival order
    pub arguments: String,
}

impl PendingToolCall {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    fn merge(&mut self, id: Option<String>, name: Option<String>, fragment: Option<String>) {
        if let Some(id) = id.filter(|v| !v.is_empty()) {
            match &self.id {
                None => self.id = Some(id),
                Some(existing) if *existing != id => {
                    tracing::debug!(index = self.index, %existing, ignored = %id, "tool call id already set");
                }
                Some(_) => {}
            }
        }
        if let Some(name) = name.filter(|v| !v.trim().is_empty()) {
            match &self.name {
                None => self.name = Some(name),
                Some(existing) if *existing != name => {
                    tracing::debug!(index = self.index, %existing, ignored = %name, "tool call name already set");
                }
                Some(_) => {}
            }
        }
        if let Some(fragment) = fragment {
            self.arguments.push_str(&fragment);
        }
    }
}

/// A slot that ended the stream with both an id and a function name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedToolCall {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl CompletedToolCall {
    /// Decode the argument text as a JSON object.
    ///
    /// Blank text means no arguments. Anything that is not a JSON object is
    /// reported as [`GatewayError::InvalidArguments`].
    pub fn parse_arguments(&self) -> Result<Map<String, Value>> {
        let text = self.arguments.trim();
        if text.is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(GatewayError::InvalidArguments {
                tool: self.name.clone(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(GatewayError::InvalidArguments {
                tool: self.name.clone(),
                reason: format!("malformed JSON: {e}"),
            }),
        }
    }

    /// Reference carried on the assistant message, arguments verbatim.
    pub fn to_ref(&self) -> ToolCallRef {
        ToolCallRef::function(&self.id, &self.name, &self.arguments)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Everything one model turn produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledTurn {
    pub content: String,
    /// Ascending slot order
    pub tool_calls: Vec<CompletedToolCall>,
    pub finish_reason: Option<String>,
}

impl AssembledTurn {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Reassembles one model turn from its stream events.
#[derive(Debug)]
pub struct StreamAssembler {
    content: String,
    slots: BTreeMap<usize, PendingToolCall>,
    finish_reason: Option<String>,
    max_tool_calls: usize,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::with_max_tool_calls(DEFAULT_MAX_TOOL_CALLS)
    }

    pub fn with_max_tool_calls(max_tool_calls: usize) -> Self {
        Self {
            content: String::new(),
            slots: BTreeMap::new(),
            finish_reason: None,
            max_tool_calls,
        }
    }

    /// Feed one event. Text fragments are handed back for immediate
    /// forwarding; tool-call fragments are buffered.
    pub fn apply(&mut self, event: ChatStreamEvent) -> Option<String> {
        match event {
            ChatStreamEvent::ContentDelta { delta } => {
                if delta.is_empty() {
                    return None;
                }
                self.content.push_str(&delta);
                Some(delta)
            }
            ChatStreamEvent::ToolCallDelta {
                index,
                id,
                function_name,
                arguments_delta,
            } => {
                if !self.slots.contains_key(&index) && self.slots.len() >= self.max_tool_calls {
                    tracing::warn!(
                        index,
                        limit = self.max_tool_calls,
                        "tool call limit reached, dropping fragment"
                    );
                    return None;
                }
                tracing::debug!(index, ?id, ?function_name, "tool call fragment");
                self.slots
                    .entry(index)
                    .or_insert_with(|| PendingToolCall::new(index))
                    .merge(id, function_name, arguments_delta);
                None
            }
            ChatStreamEvent::StreamEnd { finish_reason } => {
                if finish_reason.is_some() {
                    self.finish_reason = finish_reason;
                }
                None
            }
        }
    }

    /// Close the turn. Slots without an id or a name cannot be answered
    /// and are dropped.
    pub fn finish(self) -> AssembledTurn {
        let tool_calls = self
            .slots
            .into_values()
            .filter_map(|slot| match (slot.id, slot.name) {
                (Some(id), Some(name)) => Some(CompletedToolCall {
                    index: slot.index,
                    id,
                    name,
                    arguments: slot.arguments,
                }),
                (id, name) => {
                    tracing::warn!(index = slot.index, ?id, ?name, "dropping incomplete tool call");
                    None
                }
            })
            .collect();

        AssembledTurn {
            content: self.content,
            tool_calls,
            finish_reason: self.finish_reason,
        }
    }
}
