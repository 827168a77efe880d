//! Conversation sessions
//!
//! Each session id gets one worker task with a bounded mailbox. The worker
//! runs turns one after another, so a session's history is only ever
//! touched by a single turn. A full mailbox rejects new messages with
//! [`GatewayError::SessionBusy`]. Sessions live until the process exits.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::action::{ActionButton, extract_action};
use crate::error::{GatewayError, Result};
use crate::orchestrator::{ConversationOrchestrator, TurnEvent, TurnOutcome};
use crate::types::Message;

/// System message seeded into every new session
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a wallet assistant for blockchain actions. \
Call the available tools to find out which smart-contract actions are supported and use them to \
fulfil the user's requests. If a transaction needs the user's wallet address, ask for it. Fill \
in method parameters from what the user said or make a best guess instead of asking. Use only \
simple markdown in replies.";

/// Command that asks the assistant to introduce its capabilities
pub const START_COMMAND: &str = "/start";

const EVENT_BUFFER: usize = 64;

/// Per-session behaviour.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub system_prompt: String,
    /// Sent to the model in place of [`START_COMMAND`]
    pub start_prompt: String,
    /// Shown to the user while the start prompt runs
    pub start_notice: String,
    /// Turns that may wait behind the running one
    pub queue_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            start_prompt: "What are your smart-contract capabilities?".to_string(),
            start_notice: "Just a second, fetching the capabilities list".to_string(),
            queue_capacity: 4,
        }
    }
}

/// One line of the user-facing transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_human: bool,
    pub is_error: bool,
}

impl TranscriptEntry {
    fn new(text: impl Into<String>, is_human: bool, is_error: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            timestamp: Utc::now(),
            is_human,
            is_error,
        }
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(text, true, false)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, false, false)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, false, true)
    }
}

/// Model history plus rendered transcript of one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    history: Vec<Message>,
    transcript: Vec<TranscriptEntry>,
}

impl ConversationState {
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }
}

/// Final result of a turn as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Answer text with any action link removed
    pub text: String,
    pub action: Option<ActionButton>,
    pub outcome: TurnOutcome,
}

/// Caller's side of a submitted turn.
#[derive(Debug)]
pub struct TurnHandle {
    /// Set when the input was [`START_COMMAND`]
    pub notice: Option<String>,
    pub events: mpsc::Receiver<TurnEvent>,
    reply: oneshot::Receiver<Result<TurnReply>>,
}

impl TurnHandle {
    /// Wait for the turn to finish.
    pub async fn reply(self) -> Result<TurnReply> {
        // an unread event buffer would stall the turn once full
        let Self { events, reply, .. } = self;
        drop(events);
        reply.await.unwrap_or(Err(GatewayError::Cancelled))
    }
}

struct TurnJob {
    text: String,
    events: mpsc::Sender<TurnEvent>,
    reply: oneshot::Sender<Result<TurnReply>>,
}

#[derive(Clone)]
struct SessionHandle {
    mailbox: mpsc::Sender<TurnJob>,
    state: Arc<RwLock<ConversationState>>,
}

/// Session map with one serialized worker per session.
pub struct SessionStore {
    orchestrator: ConversationOrchestrator,
    options: SessionOptions,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    cancel: CancellationToken,
}

static_assertions::assert_impl_all!(SessionStore: Send, Sync);
static_assertions::assert_impl_all!(ConversationOrchestrator: Send, Sync);

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Workers stop when `cancel` fires; queued turns then resolve to
    /// [`GatewayError::Cancelled`].
    pub fn new(
        orchestrator: ConversationOrchestrator,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            options,
            sessions: Mutex::new(HashMap::new()),
            cancel,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Queue `text` as the next turn of `session_id`, creating the session
    /// on first use.
    pub async fn submit(&self, session_id: &str, text: &str) -> Result<TurnHandle> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GatewayError::InvalidRequest("message text is empty".into()));
        }
        if self.cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let (text, notice) = if text == START_COMMAND {
            (
                self.options.start_prompt.clone(),
                Some(self.options.start_notice.clone()),
            )
        } else {
            (text.to_string(), None)
        };

        let handle = self.session(session_id).await;
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (reply_tx, reply_rx) = oneshot::channel();

        let job = TurnJob {
            text,
            events: events_tx,
            reply: reply_tx,
        };
        handle.mailbox.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GatewayError::SessionBusy(session_id.to_string()),
            mpsc::error::TrySendError::Closed(_) => GatewayError::Cancelled,
        })?;

        Ok(TurnHandle {
            notice,
            events: events_rx,
            reply: reply_rx,
        })
    }

    /// Transcript snapshot, `None` for a session never seen.
    pub async fn transcript(&self, session_id: &str) -> Option<Vec<TranscriptEntry>> {
        let handle = self.sessions.lock().await.get(session_id).cloned()?;
        let state = handle.state.read().await;
        Some(state.transcript.clone())
    }

    /// Model history snapshot, `None` for a session never seen.
    pub async fn history(&self, session_id: &str) -> Option<Vec<Message>> {
        let handle = self.sessions.lock().await.get(session_id).cloned()?;
        let state = handle.state.read().await;
        Some(state.history.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn session(&self, session_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(session_id) {
            return handle.clone();
        }

        let (mailbox, inbox) = mpsc::channel(self.options.queue_capacity.max(1));
        let handle = SessionHandle {
            mailbox,
            state: Arc::new(RwLock::new(ConversationState::default())),
        };

        let worker = SessionWorker {
            session_id: session_id.to_string(),
            orchestrator: self.orchestrator.clone(),
            system_prompt: self.options.system_prompt.clone(),
            state: handle.state.clone(),
            cancel: self.cancel.clone(),
        };
        tokio::spawn(worker.run(inbox));

        tracing::info!(session = session_id, "session created");
        sessions.insert(session_id.to_string(), handle.clone());
        handle
    }
}

struct SessionWorker {
    session_id: String,
    orchestrator: ConversationOrchestrator,
    system_prompt: String,
    state: Arc<RwLock<ConversationState>>,
    cancel: CancellationToken,
}

impl SessionWorker {
    async fn run(self, mut inbox: mpsc::Receiver<TurnJob>) {
        loop {
            let job = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                job = inbox.recv() => job,
            };
            let Some(job) = job else { break };

            let result = self.run_turn(&job.text, &job.events).await;
            let _ = job.reply.send(result);
        }
        tracing::debug!(session = %self.session_id, "session worker stopped");
    }

    async fn run_turn(&self, text: &str, events: &mpsc::Sender<TurnEvent>) -> Result<TurnReply> {
        let mut history = {
            let mut state = self.state.write().await;
            state.transcript.push(TranscriptEntry::human(text));
            if state.history.is_empty() && !self.system_prompt.is_empty() {
                state.history.push(Message::system(self.system_prompt.clone()));
            }
            state.history.push(Message::user(text));
            state.history.clone()
        };

        tracing::info!(session = %self.session_id, "turn started");
        let result = self.orchestrator.run_turn(&mut history, events).await;

        let mut state = self.state.write().await;
        match result {
            Ok(outcome) => {
                state.history = history;
                let rendered = extract_action(&outcome.text);
                state
                    .transcript
                    .push(TranscriptEntry::assistant(rendered.text.clone()));
                Ok(TurnReply {
                    text: rendered.text,
                    action: rendered.action,
                    outcome,
                })
            }
            Err(e) => {
                // the user message stays; partial model output of the failed turn does not
                tracing::error!(session = %self.session_id, error = %e, "turn failed");
                state.transcript.push(TranscriptEntry::error(e.to_string()));
                Err(e)
            }
        }
    }
}
