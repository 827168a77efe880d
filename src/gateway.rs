//! Wiring from [`GatewayConfig`] to a ready [`SessionStore`]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog::HttpCatalogSource;
use crate::config::GatewayConfig;
use crate::dispatch::HttpToolDispatcher;
use crate::orchestrator::ConversationOrchestrator;
use crate::providers::OpenAiChatModel;
use crate::session::SessionStore;

/// Build the orchestrator for `config`, sharing one HTTP client between
/// the model, the document fetch and tool dispatch.
pub fn build_orchestrator(
    config: &GatewayConfig,
    http_client: reqwest::Client,
    cancel: CancellationToken,
) -> ConversationOrchestrator {
    let model = OpenAiChatModel::with_http_client(config.model.clone(), http_client.clone());
    let catalog = HttpCatalogSource::new(http_client.clone(), config.tools.openapi_url.clone())
        .with_timeout(config.tools.timeout);
    let dispatcher = HttpToolDispatcher::new(http_client, &config.tools);

    ConversationOrchestrator::new(
        Arc::new(model),
        Arc::new(catalog),
        Arc::new(dispatcher),
        config.auth.clone(),
    )
    .with_options(config.orchestrator.clone())
    .with_cancellation(cancel)
}

/// Session store serving every session with the configured backends.
pub fn build_session_store(config: &GatewayConfig, cancel: CancellationToken) -> SessionStore {
    let orchestrator = build_orchestrator(config, reqwest::Client::new(), cancel.clone());
    SessionStore::new(orchestrator, config.session.clone(), cancel)
}
