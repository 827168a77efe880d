//! # agent-gateway
//!
//! Relays chat messages to a streaming chat-completions API and lets the
//! model call a remote HTTP API, described by an OpenAPI document, as tools
//! in the middle of a conversation.
//!
#![deny(unsafe_code)]

//! ## Flow
//!
//! 1. [`session::SessionStore`] queues the user message on the session's worker.
//! 2. [`orchestrator::ConversationOrchestrator`] loads the tool catalog
//!    ([`catalog`]), streams a model turn ([`providers`]) and reassembles it
//!    ([`streaming`]).
//! 3. Tool calls go to [`dispatch`]; their results are appended and the
//!    model is asked again until it answers without tool calls.
//! 4. The final text is scanned for an action button ([`action`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_gateway::config::GatewayConfig;
//! use agent_gateway::gateway::build_session_store;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let store = build_session_store(&config, CancellationToken::new());
//!
//!     let mut turn = store.submit("chat-1", "What can you do?").await?;
//!     while let Some(event) = turn.events.recv().await {
//!         println!("{event:?}");
//!     }
//!     println!("{}", turn.reply().await?.text);
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod providers;
pub mod retry;
pub mod server_adapters;
pub mod session;
pub mod streaming;
pub mod telemetry;
pub mod types;

pub use error::{GatewayError, Result};

/// Commonly used items
pub mod prelude {
    pub use crate::action::{ActionButton, extract_action};
    pub use crate::catalog::{RouteBinding, RouteKind, ToolCatalog, build_catalog};
    pub use crate::config::{AuthContext, GatewayConfig, ModelConfig, ToolApiConfig};
    pub use crate::error::{GatewayError, Result};
    pub use crate::orchestrator::{ConversationOrchestrator, OrchestratorOptions, TurnEvent};
    pub use crate::session::{SessionStore, TurnReply};
    pub use crate::types::{Message, MessageRole};
}
