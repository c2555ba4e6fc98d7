use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use quarry_offer::Offer;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct RegistryCounts {
    pub registry: usize,
    pub fallback: usize,
}

#[derive(Serialize)]
pub struct RegistryResponse {
    pub counts: RegistryCounts,
    pub registry: Vec<Offer>,
    pub fallback: Vec<Offer>,
}

/// GET /admin/registry
/// Curated registry and fallback listing, as loaded at startup
pub async fn list_registry(State(state): State<AppState>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        counts: RegistryCounts {
            registry: state.registry.len(),
            fallback: state.fallback.len(),
        },
        registry: (*state.registry).clone(),
        fallback: (*state.fallback).clone(),
    })
}

/// POST /admin/cache/refresh
/// Drop the per-network offers cache so the next search refetches
pub async fn refresh_cache(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let mut cleared: Vec<String> = Vec::new();

    if let Some(cache) = &state.cache {
        for network in state.orchestrator.networks() {
            match cache.delete_offers(&network).await {
                Ok(()) => cleared.push(network),
                Err(e) => {
                    tracing::warn!("cache refresh failed for {}: {}", network, e);
                }
            }
        }
    }

    Ok(Json(json!({ "cleared": cleared })))
}
