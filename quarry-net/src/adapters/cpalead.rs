use async_trait::async_trait;
use serde_json::Value;

use quarry_store::app_config::CpaleadConfig;

use crate::adapter::{FetchContext, NetworkAdapter};
use crate::adapters::read_json_body;
use crate::error::AdapterError;

pub const NETWORK: &str = "CPALead";

/// CPALead campaign feed; static api key + secret pair
pub struct CpaleadAdapter {
    config: CpaleadConfig,
    client: reqwest::Client,
}

impl CpaleadAdapter {
    pub fn new(config: CpaleadConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NetworkAdapter for CpaleadAdapter {
    fn network(&self) -> &str {
        NETWORK
    }

    async fn fetch_raw(&self, ctx: &FetchContext) -> Result<Value, AdapterError> {
        let query: Vec<(&str, String)> = vec![
            ("api_key", self.config.api_key.clone()),
            ("api_secret", self.config.api_secret.clone()),
            ("limit", ctx.max.to_string()),
        ];

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
