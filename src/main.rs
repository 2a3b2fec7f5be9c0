use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use sibyl_backend::core;
use sibyl_backend::core::config::Settings;
use sibyl_backend::server;
use sibyl_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing model key is the one configuration error that is fatal.
    let settings = Settings::from_env()?;

    let state = AppState::initialize(settings.clone()).await?;
    core::logging::init(&state.paths, settings.trace_enabled);

    if settings.trace_enabled && settings.trace_api_key.is_none() {
        tracing::warn!("Tracing is enabled but SIBYL_TRACE_KEY is missing.");
    }

    let bind_addr = format!("0.0.0.0:{}", settings.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state.clone());

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
