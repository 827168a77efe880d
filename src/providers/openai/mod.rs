//! OpenAI chat-completions backend

mod client;
mod streaming;

pub use client::OpenAiChatModel;
pub use streaming::OpenAiEventConverter;
