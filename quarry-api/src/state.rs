use std::sync::Arc;

use quarry_net::FetchOrchestrator;
use quarry_offer::Offer;
use quarry_store::CacheClient;

#[derive(Clone)]
pub struct AppState {
    /// Absent when no Redis url is configured; everything degrades to
    /// direct fetches and fail-open rate limiting
    pub cache: Option<Arc<CacheClient>>,
    pub orchestrator: Arc<FetchOrchestrator>,
    /// Curated registry, loaded once at startup
    pub registry: Arc<Vec<Offer>>,
    /// Static last-resort offers, lowest merge precedence
    pub fallback: Arc<Vec<Offer>>,
    /// Static shared-secret allow-list
    pub api_keys: Arc<Vec<String>>,
}
