//! Axum front-end
//!
//! ```rust,ignore
//! let app = agent_gateway::server_adapters::axum::router(AppState::new(store));
//! axum::serve(listener, app).await?;
//! ```
//!
//! Routes:
//!
//! - `GET /`: liveness text
//! - `POST /v1/sessions/{id}/messages`: run a turn, answer is an SSE stream
//! - `GET /v1/sessions/{id}/transcript`: JSON transcript snapshot

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{SseOptions, turn_event_payload, turn_result_payload};
use crate::error::GatewayError;
use crate::session::{SessionStore, TranscriptEntry, TurnHandle};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub sse: SseOptions,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            sse: SseOptions::default(),
        }
    }

    pub fn with_sse_options(mut self, sse: SseOptions) -> Self {
        self.sse = sse;
        self
    }
}

/// Inbound chat message
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub text: String,
}

/// Error rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub struct ErrorResponse(pub GatewayError);

impl From<GatewayError> for ErrorResponse {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::SessionBusy(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/v1/sessions/{id}/messages", post(post_message))
        .route("/v1/sessions/{id}/transcript", get(get_transcript))
        .with_state(state)
}

async fn health() -> &'static str {
    "Bot is running."
}

async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(message): Json<InboundMessage>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ErrorResponse> {
    let handle = state.store.submit(&session_id, &message.text).await?;
    Ok(to_sse_response(handle, state.sse))
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<TranscriptEntry>>, Response> {
    state
        .store
        .transcript(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("unknown session {session_id}") })),
            )
                .into_response()
        })
}

fn sse_event(name: &str, payload: Value) -> Event {
    Event::default().event(name).data(payload.to_string())
}

/// Stream a submitted turn as SSE, closing with `done` or `error`.
///
/// Dropping the response (client gone) stops delivery only; the turn
/// itself runs to completion.
pub fn to_sse_response(
    handle: TurnHandle,
    opts: SseOptions,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let stream = async_stream::stream! {
        let mut handle = handle;

        if let Some(notice) = handle.notice.take() {
            yield Ok(sse_event("notice", json!({ "text": notice })));
        }

        while let Some(event) = handle.events.recv().await {
            if let Some((name, payload)) = turn_event_payload(event, &opts) {
                yield Ok(sse_event(name, payload));
            }
        }

        let (name, payload) = turn_result_payload(handle.reply().await, &opts);
        yield Ok(sse_event(name, payload));
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
