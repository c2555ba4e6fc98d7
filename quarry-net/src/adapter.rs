use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use quarry_offer::{normalize, Offer};
use quarry_store::CacheClient;

use crate::envelope::extract_records;
use crate::error::AdapterError;

/// Request-scoped inputs forwarded to adapters
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    /// Requested result cap, applied per network
    pub max: usize,
    /// Bypass the offers cache and hit the upstream
    pub refresh: bool,
    /// Requester IP, passed through to upstreams that key inventory on it
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// One upstream affiliate network.
///
/// Implementations perform the network call (including any auth dance)
/// and return the parsed JSON body; envelope extraction, normalization
/// and caching are the orchestrator's job.
#[async_trait]
pub trait NetworkAdapter: Send + Sync {
    fn network(&self) -> &str;

    async fn fetch_raw(&self, ctx: &FetchContext) -> Result<Value, AdapterError>;
}

/// Runs the adapter set for a search: cache-first per network, concurrent
/// fan-out, per-adapter timeout, failure isolation.
pub struct FetchOrchestrator {
    adapters: Vec<Arc<dyn NetworkAdapter>>,
    cache: Option<Arc<CacheClient>>,
    offers_ttl_seconds: u64,
    timeout: Duration,
}

impl FetchOrchestrator {
    pub fn new(
        adapters: Vec<Arc<dyn NetworkAdapter>>,
        cache: Option<Arc<CacheClient>>,
        offers_ttl_seconds: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            adapters,
            cache,
            offers_ttl_seconds,
            timeout,
        }
    }

    pub fn networks(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.network().to_string()).collect()
    }

    /// Fetch every selected network concurrently. `networks` holds
    /// lowercased names from the query's network filter; empty selects
    /// all. One vec per network, empty on failure: a dead upstream
    /// never blocks its siblings or errors the search.
    pub async fn fetch_all(&self, ctx: &FetchContext, networks: &[String]) -> Vec<Vec<Offer>> {
        let selected: Vec<Arc<dyn NetworkAdapter>> = self
            .adapters
            .iter()
            .filter(|a| networks.is_empty() || networks.contains(&a.network().to_lowercase()))
            .cloned()
            .collect();

        let fetches = selected
            .into_iter()
            .map(|adapter| self.fetch_network(adapter, ctx));
        join_all(fetches).await
    }

    async fn fetch_network(&self, adapter: Arc<dyn NetworkAdapter>, ctx: &FetchContext) -> Vec<Offer> {
        let network = adapter.network().to_string();

        // 1. Cache check, unless the caller forces a refresh
        if !ctx.refresh {
            if let Some(cache) = &self.cache {
                match cache.get_offers(&network).await {
                    Ok(Some(cached)) if !cached.is_empty() => {
                        debug!("{}: {} offers from cache", network, cached.len());
                        return truncate(cached, ctx.max);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("{}: offers cache read failed: {}", network, e),
                }
            }
        }

        // 2-4. Upstream call, bounded so a hung feed cannot stall the search
        let body = match tokio::time::timeout(self.timeout, adapter.fetch_raw(ctx)).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                warn!("{}: upstream fetch failed, contributing nothing: {}", network, e);
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    "{}: {}",
                    network,
                    AdapterError::Timeout {
                        network: network.clone(),
                        seconds: self.timeout.as_secs(),
                    }
                );
                return Vec::new();
            }
        };

        // 5-6. Envelope extraction + normalization; url-less records drop out
        let records = match extract_records(&body) {
            Some((shape, records)) => {
                debug!("{}: {} raw records ({:?} envelope)", network, records.len(), shape);
                records
            }
            None => {
                debug!("{}: empty or unrecognized feed", network);
                Vec::new()
            }
        };
        let offers: Vec<Offer> = records.iter().filter_map(|r| normalize(&network, r)).collect();

        // 7. Cache the full normalized array before truncation
        if let Some(cache) = &self.cache {
            if !offers.is_empty() {
                if let Err(e) = cache
                    .put_offers(&network, &offers, self.offers_ttl_seconds)
                    .await
                {
                    debug!("{}: offers cache write failed: {}", network, e);
                }
            }
        }

        truncate(offers, ctx.max)
    }
}

fn truncate(mut offers: Vec<Offer>, max: usize) -> Vec<Offer> {
    if max > 0 {
        offers.truncate(max);
    }
    offers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubAdapter {
        name: &'static str,
        body: Result<Value, ()>,
    }

    #[async_trait]
    impl NetworkAdapter for StubAdapter {
        fn network(&self) -> &str {
            self.name
        }

        async fn fetch_raw(&self, _ctx: &FetchContext) -> Result<Value, AdapterError> {
            self.body.clone().map_err(|_| AdapterError::Http {
                network: self.name.to_string(),
                status: 503,
            })
        }
    }

    fn orchestrator(adapters: Vec<Arc<dyn NetworkAdapter>>) -> FetchOrchestrator {
        FetchOrchestrator::new(adapters, None, 900, Duration::from_secs(5))
    }

    fn feed(n: usize) -> Value {
        let records: Vec<Value> = (0..n)
            .map(|i| {
                json!({
                    "offer_id": format!("o{}", i),
                    "name": format!("Offer {}", i),
                    "url": format!("https://up.example/{}", i),
                    "payout": 2.5
                })
            })
            .collect();
        json!({ "offers": records })
    }

    #[tokio::test]
    async fn fetches_normalize_and_truncate() {
        let orch = orchestrator(vec![Arc::new(StubAdapter {
            name: "OGAds",
            body: Ok(feed(5)),
        })]);
        let ctx = FetchContext {
            max: 3,
            ..Default::default()
        };
        let out = orch.fetch_all(&ctx, &[]).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 3);
        assert_eq!(out[0][0].network, "OGAds");
        assert_eq!(out[0][0].payout, Some(2.5));
    }

    #[tokio::test]
    async fn one_failing_upstream_never_blocks_the_others() {
        let orch = orchestrator(vec![
            Arc::new(StubAdapter {
                name: "OGAds",
                body: Err(()),
            }),
            Arc::new(StubAdapter {
                name: "CPAGrip",
                body: Ok(feed(2)),
            }),
        ]);
        let ctx = FetchContext {
            max: 20,
            ..Default::default()
        };
        let out = orch.fetch_all(&ctx, &[]).await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_empty());
        assert_eq!(out[1].len(), 2);
    }

    #[tokio::test]
    async fn network_filter_selects_adapters() {
        let orch = orchestrator(vec![
            Arc::new(StubAdapter {
                name: "OGAds",
                body: Ok(feed(1)),
            }),
            Arc::new(StubAdapter {
                name: "CPAGrip",
                body: Ok(feed(1)),
            }),
        ]);
        let ctx = FetchContext {
            max: 20,
            ..Default::default()
        };
        let out = orch.fetch_all(&ctx, &["cpagrip".to_string()]).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0][0].network, "CPAGrip");
    }

    #[tokio::test]
    async fn urlless_records_are_discarded() {
        let body = json!({"offers": [
            {"offer_id": "a", "name": "keep", "url": "https://x/a"},
            {"offer_id": "b", "name": "drop"}
        ]});
        let orch = orchestrator(vec![Arc::new(StubAdapter {
            name: "CPALead",
            body: Ok(body),
        })]);
        let ctx = FetchContext {
            max: 20,
            ..Default::default()
        };
        let out = orch.fetch_all(&ctx, &[]).await;
        assert_eq!(out[0].len(), 1);
        assert_eq!(out[0][0].id, "a");
    }
}
