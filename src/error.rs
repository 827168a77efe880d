//! Error Handling Module
//!
//! A single error type flows through the gateway. Each variant maps onto one
//! of the failure classes the orchestrator distinguishes:
//!
//! - transport / API failures from the model or tool provider (`HttpError`, `ApiError`)
//! - stream decoding failures (`StreamError`, `ParseError`)
//! - catalog construction failures (`InvalidDocument`)
//! - per-call tool failures (`UnsupportedMethod`, `InvalidArguments`, `UnknownTool`)
//! - turn control (`MaxStepsExceeded`, `Cancelled`, `SessionBusy`)
//!
//! # Example
//!
//! ```rust
//! use agent_gateway::error::{ErrorCategory, GatewayError};
//!
//! let error = GatewayError::api_error(503, "upstream unavailable");
//! assert_eq!(error.category(), ErrorCategory::Server);
//! assert!(error.is_retryable());
//! ```

use thiserror::Error;

/// Coarse error category, used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Client,
    Server,
    Parsing,
    Tool,
    Control,
    Configuration,
}

/// Gateway error type
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Remote side answered with a non-success status
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// The model stream broke mid-flight
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A payload could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The OpenAPI document is missing required structure
    #[error("Invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    /// The route declares a method the dispatcher cannot issue
    #[error("HTTP method '{method}' is not implemented.")]
    UnsupportedMethod { method: String },

    /// Tool-call arguments are not a JSON object
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// No route binding exists for the requested tool name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The model kept requesting tools past the configured step budget
    #[error("Tool loop did not finish within {0} model turns")]
    MaxStepsExceeded(usize),

    /// Shutdown was requested while the turn was in flight
    #[error("Turn cancelled")]
    Cancelled,

    /// The session mailbox is full
    #[error("Session {0} is busy, try again later")]
    SessionBusy(String),

    /// The inbound request cannot start a turn
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

}

impl GatewayError {
    /// Build an `ApiError` from a status code and message.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::StreamError(_) => ErrorCategory::Network,
            Self::ApiError { status, .. } if *status >= 500 => ErrorCategory::Server,
            Self::ApiError { .. } | Self::InvalidRequest(_) => ErrorCategory::Client,
            Self::ParseError(_) | Self::InvalidDocument(_) => ErrorCategory::Parsing,
            Self::UnsupportedMethod { .. }
            | Self::InvalidArguments { .. }
            | Self::UnknownTool(_) => ErrorCategory::Tool,
            Self::MaxStepsExceeded(_) | Self::Cancelled | Self::SessionBusy(_) => {
                ErrorCategory::Control
            }
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Transport failures, timeouts (408), rate limits (429) and server errors
    /// are retryable; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) => true,
            Self::ApiError { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::api_error(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, GatewayError>;
