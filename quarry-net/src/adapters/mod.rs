pub mod cpagrip;
pub mod cpalead;
pub mod mylead;
pub mod ogads;

use std::sync::Arc;

use serde_json::Value;

use quarry_store::app_config::NetworksConfig;
use quarry_store::CacheClient;

use crate::adapter::NetworkAdapter;
use crate::error::AdapterError;

pub use cpagrip::CpagripAdapter;
pub use cpalead::CpaleadAdapter;
pub use mylead::MyleadAdapter;
pub use ogads::OgadsAdapter;

/// Construct the adapter set from configuration; unconfigured networks
/// simply do not participate in searches.
pub fn build_adapters(
    networks: &NetworksConfig,
    cache: Option<Arc<CacheClient>>,
) -> Vec<Arc<dyn NetworkAdapter>> {
    let mut adapters: Vec<Arc<dyn NetworkAdapter>> = Vec::new();

    if let Some(cfg) = &networks.ogads {
        adapters.push(Arc::new(OgadsAdapter::new(cfg.clone())));
    }
    if let Some(cfg) = &networks.cpagrip {
        adapters.push(Arc::new(CpagripAdapter::new(cfg.clone())));
    }
    if let Some(cfg) = &networks.mylead {
        adapters.push(Arc::new(MyleadAdapter::new(cfg.clone(), cache.clone())));
    }
    if let Some(cfg) = &networks.cpalead {
        adapters.push(Arc::new(CpaleadAdapter::new(cfg.clone())));
    }

    adapters
}

/// Shared response handling: non-success status and non-JSON content
/// types are adapter failures the orchestrator degrades to empty.
pub(crate) async fn read_json_body(
    network: &str,
    response: reqwest::Response,
) -> Result<Value, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Http {
            network: network.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("application/json") {
        let snippet: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(300)
            .collect();
        return Err(AdapterError::NonJson {
            network: network.to_string(),
            status: status.as_u16(),
            snippet,
        });
    }

    response.json::<Value>().await.map_err(|e| AdapterError::Network {
        network: network.to_string(),
        source: e,
    })
}
