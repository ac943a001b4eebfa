use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use localai_engine::core;
use localai_engine::core::config::AppPaths;
use localai_engine::server;
use localai_engine::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);

    let state = AppState::initialize(paths).await?;

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("LOCALAI_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    server::serve(listener, state, server::shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
