use std::net::SocketAddr;

use anyhow::Context;
use gatepass_api::{app, registry_from_config, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatepass_api=debug,gatepass_scan=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = gatepass_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!(
        "Starting gatepass on port {} with {:?} registry",
        config.server.port,
        config.registry.backend
    );

    let registry = registry_from_config(&config).await?;
    let app_state = AppState::new(registry, config.scanner.event_buffer);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
