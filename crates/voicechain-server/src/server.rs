//! Server startup and shutdown.

use std::sync::Arc;

use tracing::info;

use crate::routes::api_router;
use crate::state::AppState;

/// Bind and serve until ctrl-c.
pub async fn start_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.bind_addr(), state.config.port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Voicechain server listening on {addr}");

    axum::serve(listener, api_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
