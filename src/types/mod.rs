//! Core data types shared by the catalog, stream assembler, dispatcher and orchestrator.

pub mod message;
pub mod stream;
pub mod tools;

pub use message::{FunctionCall, Message, MessageRole, ToolCallRef};
pub use stream::{ChatRequest, ChatStream, ChatStreamEvent};
pub use tools::{ParameterSchema, ToolDefinition};
