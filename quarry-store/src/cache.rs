use redis::{AsyncCommands, RedisResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use quarry_offer::Offer;

/// Cached upstream bearer token, stored as JSON under
/// `secrets:<network>_token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Redis-backed cache for normalized upstream offers, network tokens and
/// rate-limit counters
#[derive(Clone)]
pub struct CacheClient {
    client: redis::Client,
}

fn offers_key(network: &str) -> String {
    format!("offers:{}", network.to_lowercase())
}

fn token_key(network: &str) -> String {
    format!("secrets:{}_token", network.to_lowercase())
}

impl CacheClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Normalized offers for one network, or None on miss/decode failure
    pub async fn get_offers(&self, network: &str) -> RedisResult<Option<Vec<Offer>>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(offers_key(network)).await?;
        Ok(raw.and_then(|json| serde_json::from_str(&json).ok()))
    }

    pub async fn put_offers(
        &self,
        network: &str,
        offers: &[Offer],
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(offers).unwrap_or_else(|_| "[]".to_string());
        conn.set_ex::<_, _, ()>(offers_key(network), json, ttl_seconds)
            .await?;
        debug!("cached {} offers for {}", offers.len(), network);
        Ok(())
    }

    pub async fn delete_offers(&self, network: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(offers_key(network)).await
    }

    pub async fn get_token(&self, network: &str) -> RedisResult<Option<CachedToken>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(token_key(network)).await?;
        Ok(raw.and_then(|json| serde_json::from_str(&json).ok()))
    }

    pub async fn put_token(
        &self,
        network: &str,
        token: &CachedToken,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(token).unwrap_or_default();
        conn.set_ex::<_, _, ()>(token_key(network), json, ttl_seconds)
            .await
    }

    pub async fn delete_token(&self, network: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(token_key(network)).await
    }

    /// Sliding per-key counter; true while the caller is under the limit
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
