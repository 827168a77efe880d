use std::sync::Arc;

use agent_gateway::config::GatewayConfig;
use agent_gateway::gateway::build_session_store;
use agent_gateway::server_adapters::axum::{AppState, router};
use agent_gateway::telemetry;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = telemetry::init_from_env()?;
    let config = GatewayConfig::from_env()?;

    let cancel = CancellationToken::new();
    let store = Arc::new(build_session_store(&config, cancel.clone()));
    let app = router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        model = %config.model.model,
        openapi = %config.tools.openapi_url,
        "gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    tracing::info!("gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels in-flight turns.
async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    cancel.cancel();
}
