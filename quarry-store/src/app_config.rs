use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub networks: NetworksConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Absent url runs the engine cache-less (registry + fallback only
    /// between upstream fetches)
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Comma-separated static API keys
    pub api_keys: String,
}

impl AuthConfig {
    pub fn keys(&self) -> Vec<String> {
        self.api_keys
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_offers_ttl")]
    pub offers_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            offers_ttl_seconds: default_offers_ttl(),
        }
    }
}

fn default_offers_ttl() -> u64 {
    900
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

fn default_registry_path() -> String {
    "registry.json".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NetworksConfig {
    pub ogads: Option<OgadsConfig>,
    pub cpagrip: Option<CpagripConfig>,
    pub mylead: Option<MyleadConfig>,
    pub cpalead: Option<CpaleadConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OgadsConfig {
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CpagripConfig {
    pub base_url: String,
    pub user_id: String,
    pub pubkey: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MyleadConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
}

fn default_token_ttl() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct CpaleadConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration file
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Machine-local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `QUARRY__SERVER__PORT=9000` overrides `server.port`
            .add_source(config::Environment::with_prefix("QUARRY").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_split_and_trim() {
        let auth = AuthConfig {
            api_keys: " key_a, key_b ,,key_c".into(),
        };
        assert_eq!(auth.keys(), vec!["key_a", "key_b", "key_c"]);
    }

    #[test]
    fn cache_and_fetch_defaults() {
        assert_eq!(CacheConfig::default().offers_ttl_seconds, 900);
        assert_eq!(FetchConfig::default().timeout_seconds, 10);
        assert_eq!(RegistryConfig::default().path, "registry.json");
    }
}
