use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use quarry_store::app_config::MyleadConfig;
use quarry_store::cache::CachedToken;
use quarry_store::CacheClient;

use crate::adapter::{FetchContext, NetworkAdapter};
use crate::adapters::read_json_body;
use crate::credentials::{CredentialProvider, TokenFetcher};
use crate::error::AdapterError;

pub const NETWORK: &str = "MyLead";

/// MyLead campaign feed. The bearer token comes from a login endpoint
/// via the credential provider; a 401 triggers one invalidate-and-refresh
/// cycle and one retry, then the adapter gives up for this request.
pub struct MyleadAdapter {
    config: MyleadConfig,
    client: reqwest::Client,
    credentials: CredentialProvider,
}

impl MyleadAdapter {
    pub fn new(config: MyleadConfig, cache: Option<Arc<CacheClient>>) -> Self {
        let client = reqwest::Client::new();
        let fetcher = Arc::new(MyleadLogin {
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            client: client.clone(),
        });
        let credentials =
            CredentialProvider::new(NETWORK, fetcher, cache, config.token_ttl_seconds);
        Self {
            config,
            client,
            credentials,
        }
    }

    async fn request_campaigns(
        &self,
        token: &str,
        ctx: &FetchContext,
    ) -> Result<reqwest::Response, AdapterError> {
        self.client
            .get(format!("{}/campaigns", self.config.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .query(&[("limit", ctx.max.to_string())])
            .send()
            .await
            .map_err(|e| AdapterError::Network {
                network: NETWORK.to_string(),
                source: e,
            })
    }
}

#[async_trait]
impl NetworkAdapter for MyleadAdapter {
    fn network(&self) -> &str {
        NETWORK
    }

    async fn fetch_raw(&self, ctx: &FetchContext) -> Result<Value, AdapterError> {
        let token = self
            .credentials
            .get_token()
            .await
            .ok_or_else(|| AdapterError::MissingCredentials {
                network: NETWORK.to_string(),
            })?;

        let mut response = self.request_campaigns(&token, ctx).await?;

        if response.status().as_u16() == 401 {
            debug!("{}: 401, refreshing token once", NETWORK);
            let fresh = self
                .credentials
                .invalidate_and_refresh()
                .await
                .ok_or_else(|| AdapterError::MissingCredentials {
                    network: NETWORK.to_string(),
                })?;
            response = self.request_campaigns(&fresh, ctx).await?;
        }

        read_json_body(NETWORK, response).await
    }
}

/// Login call used by the credential provider
struct MyleadLogin {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

#[async_trait]
impl TokenFetcher for MyleadLogin {
    async fn fetch_token(&self) -> Result<CachedToken, AdapterError> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::Network {
                network: NETWORK.to_string(),
                source: e,
            })?;

        let body = read_json_body(NETWORK, response).await?;

        // Token either at the top level or under a data envelope
        let token = body
            .get("token")
            .or_else(|| body.get("data").and_then(|d| d.get("token")))
            .and_then(Value::as_str)
            .ok_or(AdapterError::MissingCredentials {
                network: NETWORK.to_string(),
            })?
            .to_string();
        let exp = body
            .get("exp")
            .or_else(|| body.get("data").and_then(|d| d.get("exp")))
            .and_then(Value::as_i64);

        Ok(CachedToken { token, exp })
    }
}
