//! OpenAI streaming implementation using eventsource-stream

use eventsource_stream::{Event, Eventsource};
use futures_util::StreamExt;
use serde::Deserialize;

use crate::error::GatewayError;
use crate::types::{ChatStream, ChatStreamEvent};

/// OpenAI stream chunk
#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamEvent {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: Option<OpenAiStreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiToolCallDelta {
    index: Option<usize>,
    id: Option<String>,
    function: Option<OpenAiFunctionCallDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiFunctionCallDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Turns SSE events into [`ChatStreamEvent`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiEventConverter;

impl OpenAiEventConverter {
    /// Convert one SSE event; a chunk may expand into several events.
    pub fn convert_event(&self, event: &Event) -> Vec<Result<ChatStreamEvent, GatewayError>> {
        let data = event.data.trim();
        if data.is_empty() {
            return Vec::new();
        }
        if data == "[DONE]" {
            return vec![Ok(ChatStreamEvent::StreamEnd {
                finish_reason: None,
            })];
        }

        match serde_json::from_str::<OpenAiStreamEvent>(data) {
            Ok(chunk) => self.convert_chunk(chunk).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(GatewayError::ParseError(format!(
                "Failed to parse OpenAI event: {e}"
            )))],
        }
    }

    fn convert_chunk(&self, chunk: OpenAiStreamEvent) -> Vec<ChatStreamEvent> {
        let mut events = Vec::with_capacity(2);

        // n = 1: only the first choice is meaningful
        let Some(choice) = chunk.choices.into_iter().next() else {
            return events;
        };

        if let Some(delta) = choice.delta {
            if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                events.push(ChatStreamEvent::ContentDelta { delta: content });
            }

            for (position, call) in delta.tool_calls.unwrap_or_default().into_iter().enumerate() {
                let (function_name, arguments_delta) = match call.function {
                    Some(function) => (function.name, function.arguments),
                    None => (None, None),
                };
                events.push(ChatStreamEvent::ToolCallDelta {
                    index: call.index.unwrap_or(position),
                    id: call.id,
                    function_name,
                    arguments_delta,
                });
            }
        }

        if let Some(reason) = choice.finish_reason {
            events.push(ChatStreamEvent::StreamEnd {
                finish_reason: Some(reason),
            });
        }

        events
    }
}

/// Wrap a successful streaming response.
pub(crate) fn into_chat_stream(
    response: reqwest::Response,
    converter: OpenAiEventConverter,
) -> ChatStream {
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| match event {
            Ok(event) => converter.convert_event(&event),
            Err(e) => vec![Err(GatewayError::StreamError(format!(
                "SSE parsing error: {e}"
            )))],
        })
        .flat_map(futures::stream::iter);

    Box::pin(stream)
}
