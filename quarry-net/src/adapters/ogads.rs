use async_trait::async_trait;
use serde_json::Value;

use quarry_store::app_config::OgadsConfig;

use crate::adapter::{FetchContext, NetworkAdapter};
use crate::adapters::read_json_body;
use crate::error::AdapterError;

pub const NETWORK: &str = "OGAds";

/// OGAds feed; authenticates with a static bearer key from config
pub struct OgadsAdapter {
    config: OgadsConfig,
    client: reqwest::Client,
}

impl OgadsAdapter {
    pub fn new(config: OgadsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NetworkAdapter for OgadsAdapter {
    fn network(&self) -> &str {
        NETWORK
    }

    async fn fetch_raw(&self, ctx: &FetchContext) -> Result<Value, AdapterError> {
        let mut query: Vec<(&str, String)> = vec![("max", ctx.max.to_string())];
        // The feed personalizes inventory by requester when present
        if let Some(ip) = &ctx.client_ip {
            query.push(("ip", ip.clone()));
        }
        if let Some(ua) = &ctx.user_agent {
            query.push(("user_agent", ua.clone()));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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
