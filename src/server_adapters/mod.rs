//! Server adapters: expose session turns over HTTP
//!
//! The framework-agnostic part maps [`TurnEvent`]s and turn results to SSE
//! event names and JSON payloads; [`axum`] wires that into a router.
//!
//! Event names:
//!
//! - `notice`: acknowledgement of the start command
//! - `delta`: answer text fragment
//! - `tool`: a tool call started, finished or was skipped
//! - `tool_error`: a tool call failed (the model sees the same text)
//! - `done`: final text plus optional action button
//! - `error`: the turn was aborted

#[cfg(feature = "server")]
pub mod axum;

use serde_json::{Value, json};

use crate::error::GatewayError;
use crate::orchestrator::TurnEvent;
use crate::session::TurnReply;

/// SSE encoding options.
#[derive(Debug, Clone)]
pub struct SseOptions {
    /// Emit `tool` progress events. Default: `true`
    pub include_tool_events: bool,
    /// Replace error details with `masked_error_message`. Default: `false`,
    /// aborted turns show their error text to the user.
    pub mask_errors: bool,
    pub masked_error_message: Option<String>,
}

impl Default for SseOptions {
    fn default() -> Self {
        Self {
            include_tool_events: true,
            mask_errors: false,
            masked_error_message: None,
        }
    }
}

impl SseOptions {
    /// Masked errors, no tool progress.
    pub fn production() -> Self {
        Self {
            include_tool_events: false,
            mask_errors: true,
            masked_error_message: None,
        }
    }

    fn error_text(&self, error: String) -> String {
        if self.mask_errors {
            self.masked_error_message
                .clone()
                .unwrap_or_else(|| "internal error".to_string())
        } else {
            error
        }
    }
}

/// Event name and payload for a turn event, `None` when filtered out.
pub fn turn_event_payload(event: TurnEvent, opts: &SseOptions) -> Option<(&'static str, Value)> {
    match event {
        TurnEvent::TextDelta(delta) => Some(("delta", json!({ "delta": delta }))),
        TurnEvent::ToolStarted { call_id, name } => tool_status(opts, call_id, name, "started"),
        TurnEvent::ToolFinished { call_id, name } => tool_status(opts, call_id, name, "finished"),
        TurnEvent::ToolSkipped { call_id, name } => tool_status(opts, call_id, name, "skipped"),
        TurnEvent::ToolFailed {
            call_id,
            name,
            error,
        } => Some((
            "tool_error",
            json!({ "id": call_id, "name": name, "error": opts.error_text(error) }),
        )),
    }
}

fn tool_status(
    opts: &SseOptions,
    call_id: String,
    name: String,
    status: &str,
) -> Option<(&'static str, Value)> {
    opts.include_tool_events
        .then(|| ("tool", json!({ "id": call_id, "name": name, "status": status })))
}

/// Closing event of a turn.
pub fn turn_result_payload(
    result: Result<TurnReply, GatewayError>,
    opts: &SseOptions,
) -> (&'static str, Value) {
    match result {
        Ok(reply) => (
            "done",
            json!({ "text": reply.text, "action": reply.action }),
        ),
        Err(e) => ("error", json!({ "error": opts.error_text(e.to_string()) })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionButton, ActionKind};
    use crate::orchestrator::TurnOutcome;

    #[test]
    fn tool_events_can_be_filtered() {
        let event = TurnEvent::ToolStarted {
            call_id: "c".into(),
            name: "f".into(),
        };
        assert_eq!(
            turn_event_payload(event.clone(), &SseOptions::default()),
            Some(("tool", json!({"id": "c", "name": "f", "status": "started"})))
        );
        assert_eq!(turn_event_payload(event, &SseOptions::production()), None);
    }

    #[test]
    fn errors_are_masked_on_request() {
        let (name, payload) = turn_result_payload(
            Err(GatewayError::api_error(500, "secret upstream detail")),
            &SseOptions::production(),
        );
        assert_eq!(name, "error");
        assert_eq!(payload, json!({"error": "internal error"}));
    }

    #[test]
    fn done_carries_action() {
        let reply = TurnReply {
            text: "Ready".into(),
            action: Some(ActionButton::new(ActionKind::Open, "ab-12")),
            outcome: TurnOutcome::default(),
        };
        let (name, payload) = turn_result_payload(Ok(reply), &SseOptions::default());
        assert_eq!(name, "done");
        assert_eq!(payload["action"]["label"], "Open transaction");
        assert_eq!(payload["action"]["url"], "https://www.blinkai.xyz/tran/ab-12");
    }
}
