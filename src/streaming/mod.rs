//! Streaming reassembly
//!
//! The model API fragments tool-call arguments across many stream events.
//! [`StreamAssembler`] buffers those fragments per slot index and forwards
//! text fragments as they arrive.

mod assembler;

pub use assembler::{
    AssembledTurn, CompletedToolCall, DEFAULT_MAX_TOOL_CALLS, PendingToolCall, StreamAssembler,
};
