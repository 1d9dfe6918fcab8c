use std::sync::Arc;

use anyhow::Context;
use axum::{http::Method, Router};
use gatepass_core::TicketRegistry;
use gatepass_scan::InMemoryRegistry;
use gatepass_store::app_config::{Config, RegistryBackend};
use gatepass_store::{RedisTicketRegistry, SeedSummary};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod sessions;
pub mod state;
pub mod stream;
pub mod tickets;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(tickets::routes())
        .merge(sessions::routes())
        .merge(stream::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the configured registry backend and load the seed file into it.
pub async fn registry_from_config(config: &Config) -> anyhow::Result<Arc<dyn TicketRegistry>> {
    let registry: Arc<dyn TicketRegistry> = match config.registry.backend {
        RegistryBackend::Memory => Arc::new(InMemoryRegistry::new()),
        RegistryBackend::Redis => Arc::new(
            RedisTicketRegistry::new(&config.redis.url, &config.redis.key_prefix)
                .await
                .context("Failed to open Redis registry")?,
        ),
    };

    seed_from_config(registry.as_ref(), config).await?;
    Ok(registry)
}

/// Load `registry.seed_path`, if set. Tokens already present (another gate
/// process seeded a shared Redis first) are skipped.
pub async fn seed_from_config(
    registry: &dyn TicketRegistry,
    config: &Config,
) -> anyhow::Result<SeedSummary> {
    let Some(path) = &config.registry.seed_path else {
        return Ok(SeedSummary::default());
    };

    let tickets = gatepass_store::load_seed_file(path)
        .with_context(|| format!("Failed to load seed file {}", path))?;
    let summary =
        gatepass_store::seed_registry(registry, tickets, &config.registry.namespace).await?;
    Ok(summary)
}
