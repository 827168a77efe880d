//! Orchestrator for the streaming tool-call loop
//!
//! One user message drives a loop: stream a model turn, forward its text,
//! dispatch any tool calls it produced, append the results, re-ask. The loop
//! ends on the first model turn without tool calls, or fails with
//! [`GatewayError::MaxStepsExceeded`] once `max_steps` turns have run.
//!
//! History append order per step is: assistant message (with tool calls),
//! then tool-result messages in ascending slot order.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogSource, ToolCatalog};
use crate::config::AuthContext;
use crate::dispatch::ToolInvoker;
use crate::error::{GatewayError, Result};
use crate::providers::ChatModel;
use crate::streaming::{AssembledTurn, CompletedToolCall, StreamAssembler};
use crate::types::{ChatRequest, ChatStream, Message};


/// What to do with a tool call whose name is not in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownToolPolicy {
    /// Log and move on; no tool-result message is appended.
    #[default]
    Skip,
    /// Append a tool-result message carrying an "unknown tool" error.
    ReportError,
}

/// What to do when the tool catalog cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogFallback {
    /// Log and run the step without tools.
    #[default]
    NoTools,
    /// Abort the turn with the load error.
    FailTurn,
}

/// Orchestrator options.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Maximum model turns per user message (including the final answer).
    pub max_steps: usize,
    pub unknown_tool: UnknownToolPolicy,
    pub catalog_fallback: CatalogFallback,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_steps: 8,
            unknown_tool: UnknownToolPolicy::default(),
            catalog_fallback: CatalogFallback::default(),
        }
    }
}

/// Progress reported to the front-end while a turn runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Answer text, in arrival order
    TextDelta(String),
    /// A tool call is about to be dispatched
    ToolStarted { call_id: String, name: String },
    ToolFinished { call_id: String, name: String },
    /// The tool failed; `error` is also the tool-result content
    ToolFailed {
        call_id: String,
        name: String,
        error: String,
    },
    /// The tool name has no route binding
    ToolSkipped { call_id: String, name: String },
}

/// Summary of a completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Every text fragment forwarded during the turn, concatenated
    pub text: String,
    /// Model turns taken
    pub steps: usize,
    /// Tool calls sent to the tool API
    pub dispatched: usize,
}

/// Drives model turns and tool dispatch for one conversation turn.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    model: Arc<dyn ChatModel>,
    catalog: Arc<dyn CatalogSource>,
    invoker: Arc<dyn ToolInvoker>,
    auth: AuthContext,
    options: OrchestratorOptions,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ConversationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator")
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ConversationOrchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        catalog: Arc<dyn CatalogSource>,
        invoker: Arc<dyn ToolInvoker>,
        auth: AuthContext,
    ) -> Self {
        Self {
            model,
            catalog,
            invoker,
            auth,
            options: OrchestratorOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Tie in-flight work to `token` (normally the process shutdown token).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Run the loop over `history`, which must already end with the user
    /// message. Assistant and tool messages are appended in place.
    ///
    /// Text fragments and tool progress go to `events`; a closed receiver
    /// does not stop the turn.
    pub async fn run_turn(
        &self,
        history: &mut Vec<Message>,
        events: &mpsc::Sender<TurnEvent>,
    ) -> Result<TurnOutcome> {
        let max_steps = self.options.max_steps.max(1);
        let mut outcome = TurnOutcome::default();

        for step in 0..max_steps {
            let catalog = self.load_catalog().await?;
            let request = ChatRequest {
                messages: history.clone(),
                tools: catalog.tools().to_vec(),
            };

            tracing::debug!(step, tools = request.tools.len(), "streaming model response");
            let stream = self.cancellable(self.model.chat_stream(request)).await?;
            let turn = self.consume(stream, events, &mut outcome.text).await?;
            outcome.steps = step + 1;

            history.push(Message::assistant(
                turn.content.clone(),
                turn.tool_calls.iter().map(CompletedToolCall::to_ref).collect(),
            ));

            if !turn.has_tool_calls() {
                tracing::info!(steps = outcome.steps, dispatched = outcome.dispatched, "turn complete");
                return Ok(outcome);
            }

            outcome.dispatched += self
                .dispatch_batch(&catalog, &turn.tool_calls, history, events)
                .await?;
        }

        tracing::error!(max_steps, "model kept requesting tools, giving up");
        Err(GatewayError::MaxStepsExceeded(max_steps))
    }

    async fn load_catalog(&self) -> Result<ToolCatalog> {
        match self.cancellable(self.catalog.load()).await {
            Ok(catalog) => Ok(catalog),
            Err(GatewayError::Cancelled) => Err(GatewayError::Cancelled),
            Err(e) => match self.options.catalog_fallback {
                CatalogFallback::NoTools => {
                    tracing::warn!(error = %e, "tool catalog unavailable, continuing without tools");
                    Ok(ToolCatalog::empty())
                }
                CatalogFallback::FailTurn => Err(e),
            },
        }
    }

    async fn consume(
        &self,
        mut stream: ChatStream,
        events: &mpsc::Sender<TurnEvent>,
        text: &mut String,
    ) -> Result<AssembledTurn> {
        let mut assembler = StreamAssembler::new();

        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(GatewayError::Cancelled),
                item = stream.next() => item,
            };
            let Some(item) = item else { break };

            if let Some(delta) = assembler.apply(item?) {
                text.push_str(&delta);
                let _ = events.send(TurnEvent::TextDelta(delta)).await;
            }
        }

        Ok(assembler.finish())
    }

    /// Dispatch every call in slot order. Failures become tool results;
    /// only cancellation ends the batch early. Returns the dispatch count.
    async fn dispatch_batch(
        &self,
        catalog: &ToolCatalog,
        calls: &[CompletedToolCall],
        history: &mut Vec<Message>,
        events: &mpsc::Sender<TurnEvent>,
    ) -> Result<usize> {
        let mut dispatched = 0;

        for call in calls {
            let Some(route) = catalog.route(&call.name) else {
                match self.options.unknown_tool {
                    UnknownToolPolicy::Skip => {
                        tracing::warn!(tool = %call.name, call_id = %call.id, "unknown tool, skipping");
                        let _ = events
                            .send(TurnEvent::ToolSkipped {
                                call_id: call.id.clone(),
                                name: call.name.clone(),
                            })
                            .await;
                    }
                    UnknownToolPolicy::ReportError => {
                        let error = GatewayError::UnknownTool(call.name.clone()).to_string();
                        tracing::warn!(tool = %call.name, call_id = %call.id, "unknown tool, reporting");
                        history.push(Message::tool(error.clone(), call.id.clone()));
                        let _ = events
                            .send(TurnEvent::ToolFailed {
                                call_id: call.id.clone(),
                                name: call.name.clone(),
                                error,
                            })
                            .await;
                    }
                }
                continue;
            };

            let _ = events
                .send(TurnEvent::ToolStarted {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                })
                .await;

            let result = match call.parse_arguments() {
                Ok(arguments) => {
                    let result = self
                        .cancellable(self.invoker.invoke(route, &arguments, &self.auth))
                        .await;
                    // unsupported routes fail before any request is made
                    if !matches!(result, Err(GatewayError::UnsupportedMethod { .. })) {
                        dispatched += 1;
                    }
                    result
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(content) => {
                    tracing::info!(tool = %call.name, call_id = %call.id, "tool call succeeded");
                    history.push(Message::tool(content, call.id.clone()));
                    let _ = events
                        .send(TurnEvent::ToolFinished {
                            call_id: call.id.clone(),
                            name: call.name.clone(),
                        })
                        .await;
                }
                Err(GatewayError::Cancelled) => return Err(GatewayError::Cancelled),
                Err(e) => {
                    let error = e.to_string();
                    tracing::warn!(tool = %call.name, call_id = %call.id, %error, "tool call failed");
                    history.push(Message::tool(error.clone(), call.id.clone()));
                    let _ = events
                        .send(TurnEvent::ToolFailed {
                            call_id: call.id.clone(),
                            name: call.name.clone(),
                            error,
                        })
                        .await;
                }
            }
        }

        Ok(dispatched)
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(GatewayError::Cancelled),
            res = fut => res,
        }
    }
}
