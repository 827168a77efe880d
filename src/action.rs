//! Action buttons
//!
//! The tool API can answer with a markdown image link pointing at a
//! prepared transaction. Front-ends render that as a button instead of the
//! raw link, so the link is cut out of the displayed text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Web app that opens prepared transactions
pub const TRANSACTION_APP_URL: &str = "https://www.blinkai.xyz/tran/";

lazy_static! {
    static ref ACTION_PATTERN: Regex = Regex::new(
        r"https://www\.blinkai\.xyz/gpt/tran_(execute|open)\.svg\)\]\(https://www\.blinkai\.xyz/transaction/([a-f0-9-]+)\)"
    )
    .expect("action pattern is a valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Execute,
    Open,
}

/// A button attached to the final answer of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub kind: ActionKind,
    pub transaction_id: String,
    pub label: String,
    pub url: String,
}

impl ActionButton {
    pub fn new(kind: ActionKind, transaction_id: impl Into<String>) -> Self {
        let transaction_id = transaction_id.into();
        let label = match kind {
            ActionKind::Open => "Open transaction",
            ActionKind::Execute => "Execute transaction",
        };
        Self {
            kind,
            url: format!("{TRANSACTION_APP_URL}{transaction_id}"),
            label: label.to_string(),
            transaction_id,
        }
    }
}

/// Text to display plus the button taken from it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    pub text: String,
    pub action: Option<ActionButton>,
}

/// Build the button from the first match and strip every match from `text`.
pub fn extract_action(text: &str) -> RenderedReply {
    let Some(captures) = ACTION_PATTERN.captures(text) else {
        return RenderedReply {
            text: text.to_string(),
            action: None,
        };
    };

    let kind = match &captures[1] {
        "open" => ActionKind::Open,
        _ => ActionKind::Execute,
    };
    let action = ActionButton::new(kind, &captures[2]);

    RenderedReply {
        text: ACTION_PATTERN.replace_all(text, "").into_owned(),
        action: Some(action),
    }
}
