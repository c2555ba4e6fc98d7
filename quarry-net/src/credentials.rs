use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use quarry_store::cache::CachedToken;
use quarry_store::CacheClient;

use crate::error::AdapterError;

/// Fetches a fresh bearer token from an upstream login endpoint
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch_token(&self) -> Result<CachedToken, AdapterError>;
}

/// Per-network credential provider.
///
/// Owns a short-lived in-process memory cache layered in front of the
/// persistent token cache (`secrets:<network>_token`). Passed into the
/// adapter that needs it; there is no process-wide token state.
pub struct CredentialProvider {
    network: String,
    memory: RwLock<Option<CachedToken>>,
    store: Option<Arc<CacheClient>>,
    fetcher: Arc<dyn TokenFetcher>,
    token_ttl_seconds: u64,
}

impl CredentialProvider {
    pub fn new(
        network: impl Into<String>,
        fetcher: Arc<dyn TokenFetcher>,
        store: Option<Arc<CacheClient>>,
        token_ttl_seconds: u64,
    ) -> Self {
        Self {
            network: network.into(),
            memory: RwLock::new(None),
            store,
            fetcher,
            token_ttl_seconds,
        }
    }

    /// Current token: memory cache, then persistent cache, then a fresh
    /// fetch. None when the upstream login fails.
    pub async fn get_token(&self) -> Option<String> {
        if let Some(cached) = self.memory.read().await.clone() {
            if !is_expired(&cached) {
                return Some(cached.token);
            }
        }

        if let Some(store) = &self.store {
            match store.get_token(&self.network).await {
                Ok(Some(cached)) if !is_expired(&cached) => {
                    debug!("{}: token from persistent cache", self.network);
                    *self.memory.write().await = Some(cached.clone());
                    return Some(cached.token);
                }
                Ok(_) => {}
                Err(e) => debug!("{}: token cache read failed: {}", self.network, e),
            }
        }

        self.fetch_and_store().await
    }

    /// Drop every cached copy and log in again, once. Called after an
    /// upstream 401; the adapter retries the request a single time with
    /// the result and gives up after that.
    pub async fn invalidate_and_refresh(&self) -> Option<String> {
        *self.memory.write().await = None;
        if let Some(store) = &self.store {
            if let Err(e) = store.delete_token(&self.network).await {
                debug!("{}: token cache delete failed: {}", self.network, e);
            }
        }
        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> Option<String> {
        match self.fetcher.fetch_token().await {
            Ok(fresh) => {
                if let Some(store) = &self.store {
                    if let Err(e) = store
                        .put_token(&self.network, &fresh, self.token_ttl_seconds)
                        .await
                    {
                        debug!("{}: token cache write failed: {}", self.network, e);
                    }
                }
                let token = fresh.token.clone();
                *self.memory.write().await = Some(fresh);
                Some(token)
            }
            Err(e) => {
                warn!("{}: token acquisition failed: {}", self.network, e);
                None
            }
        }
    }
}

fn is_expired(cached: &CachedToken) -> bool {
    match cached.exp {
        Some(exp) => exp <= chrono::Utc::now().timestamp(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubFetcher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl TokenFetcher for StubFetcher {
        async fn fetch_token(&self) -> Result<CachedToken, AdapterError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(AdapterError::Http {
                    network: "stub".into(),
                    status: 403,
                });
            }
            Ok(CachedToken {
                token: format!("token_{}", n),
                exp: None,
            })
        }
    }

    #[tokio::test]
    async fn memory_cache_avoids_repeat_fetches() {
        let fetcher = StubFetcher::new(false);
        let provider = CredentialProvider::new("MyLead", fetcher.clone(), None, 3600);

        assert_eq!(provider.get_token().await.as_deref(), Some("token_1"));
        assert_eq!(provider.get_token().await.as_deref(), Some("token_1"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_fetches_exactly_once() {
        let fetcher = StubFetcher::new(false);
        let provider = CredentialProvider::new("MyLead", fetcher.clone(), None, 3600);

        assert_eq!(provider.get_token().await.as_deref(), Some("token_1"));
        assert_eq!(
            provider.invalidate_and_refresh().await.as_deref(),
            Some("token_2")
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        // The refreshed token is now the cached one
        assert_eq!(provider.get_token().await.as_deref(), Some("token_2"));
    }

    #[tokio::test]
    async fn failed_login_yields_none() {
        let fetcher = StubFetcher::new(true);
        let provider = CredentialProvider::new("MyLead", fetcher, None, 3600);
        assert_eq!(provider.get_token().await, None);
    }

    #[tokio::test]
    async fn expired_memory_token_is_refetched() {
        let fetcher = StubFetcher::new(false);
        let provider = CredentialProvider::new("MyLead", fetcher.clone(), None, 3600);

        *provider.memory.write().await = Some(CachedToken {
            token: "stale".into(),
            exp: Some(chrono::Utc::now().timestamp() - 60),
        });
        assert_eq!(provider.get_token().await.as_deref(), Some("token_1"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
