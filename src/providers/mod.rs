//! Model backends
//!
//! The orchestrator talks to the model through [`ChatModel`]; the only
//! backend shipped is the OpenAI (and Azure OpenAI) chat-completions API.

pub mod openai;

pub use openai::OpenAiChatModel;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatStream};

/// Streaming chat completion.
///
/// An `Err` from `chat_stream` means the request never produced a stream
/// (after retries); errors yielded by the stream itself are mid-flight
/// failures and are not retried.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream>;
}
