use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use quarry_api::{app, AppState};
use quarry_net::{build_adapters, FetchOrchestrator};
use quarry_offer::registry::{fallback_offers, load_registry};
use quarry_store::{CacheClient, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarry_api=debug,quarry_net=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Quarry offer engine on port {}", config.server.port);

    // Cache is optional: without Redis the engine still serves registry
    // and fallback offers and fetches upstreams uncached
    let cache = match &config.redis.url {
        Some(url) => match CacheClient::new(url).await {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, running cache-less: {}", e);
                None
            }
        },
        None => None,
    };

    let registry = match load_registry(Path::new(&config.registry.path)) {
        Ok(offers) => {
            tracing::info!("Loaded {} curated offers from {}", offers.len(), config.registry.path);
            offers
        }
        Err(e) => {
            tracing::warn!("Registry unavailable ({}), continuing without it", e);
            Vec::new()
        }
    };

    let adapters = build_adapters(&config.networks, cache.clone());
    tracing::info!("{} upstream adapters configured", adapters.len());
    let orchestrator = FetchOrchestrator::new(
        adapters,
        cache.clone(),
        config.cache.offers_ttl_seconds,
        Duration::from_secs(config.fetch.timeout_seconds),
    );

    let state = AppState {
        cache,
        orchestrator: Arc::new(orchestrator),
        registry: Arc::new(registry),
        fallback: Arc::new(fallback_offers()),
        api_keys: Arc::new(config.auth.keys()),
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
