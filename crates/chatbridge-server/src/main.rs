//! ChatBridge — HTTP-to-extension relay server.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use chatbridge_server::routes;
use chatbridge_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = chatbridge_core::BridgeConfig::from_env();
    let port = config.port;

    let state = Arc::new(AppState::new(config));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ChatBridge listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
