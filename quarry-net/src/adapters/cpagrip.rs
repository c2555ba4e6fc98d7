use async_trait::async_trait;
use serde_json::Value;

use quarry_store::app_config::CpagripConfig;

use crate::adapter::{FetchContext, NetworkAdapter};
use crate::adapters::read_json_body;
use crate::error::AdapterError;

pub const NETWORK: &str = "CPAGrip";

/// CPAGrip offer feed; credentials ride in the query string
/// (`user_id`/`pubkey`) and the requester's IP and user-agent are passed
/// through so the feed geo-targets correctly.
pub struct CpagripAdapter {
    config: CpagripConfig,
    client: reqwest::Client,
}

impl CpagripAdapter {
    pub fn new(config: CpagripConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NetworkAdapter for CpagripAdapter {
    fn network(&self) -> &str {
        NETWORK
    }

    async fn fetch_raw(&self, ctx: &FetchContext) -> Result<Value, AdapterError> {
        let mut query: Vec<(&str, String)> = vec![
            ("user_id", self.config.user_id.clone()),
            ("pubkey", self.config.pubkey.clone()),
            ("limit", ctx.max.to_string()),
        ];
        if let Some(ip) = &ctx.client_ip {
            query.push(("tracking_ip", ip.clone()));
        }
        if let Some(ua) = &ctx.user_agent {
            query.push(("ua", ua.clone()));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AdapterError::Network {
                network: NETWORK.to_string(),
                source: e,
            })?;

        read_json_body(NETWORK, response).await
    }
}
