use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub ims: ImsConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub aem: AemConfig,
    /// Default action parameters, merged under every request's own parameters.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub state_db_path: String,
    pub files_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImsConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_token_cache_ttl_secs")]
    pub token_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_ingress_url")]
    pub ingress_url: String,
    #[serde(default)]
    pub registration_provider_id: String,
    #[serde(default)]
    pub asset_sync_provider_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AemConfig {
    /// Overrides `https://<repo:repositoryId>` when set.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ImsConfig {
    fn default() -> Self {
        ImsConfig {
            token_url: default_token_url(),
            token_cache_ttl_secs: default_token_cache_ttl_secs(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        EventsConfig {
            ingress_url: default_ingress_url(),
            registration_provider_id: String::new(),
            asset_sync_provider_id: String::new(),
        }
    }
}

fn default_package() -> String { "a2b-brand".to_string() }
fn default_http_timeout_secs() -> u64 { 30 }
fn default_token_url() -> String { "https://ims-na1.adobelogin.com/ims/token/v3".to_string() }
fn default_token_cache_ttl_secs() -> u64 { 1320 }
fn default_ingress_url() -> String { "https://eventsingress.adobe.io".to_string() }

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path))?;
        Ok(config)
    }

    pub fn default_path() -> String {
        std::env::var("A2B_CONFIG")
            .unwrap_or_else(|_| "./config/default.toml".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind_addr = "127.0.0.1:8080"

            [storage]
            state_db_path = "./data/state.db"
            files_dir = "./data/files"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.package, "a2b-brand");
        assert_eq!(config.server.http_timeout_secs, 30);
        assert_eq!(config.ims.token_url, "https://ims-na1.adobelogin.com/ims/token/v3");
        assert_eq!(config.ims.token_cache_ttl_secs, 1320);
        assert_eq!(config.events.ingress_url, "https://eventsingress.adobe.io");
        assert!(config.events.registration_provider_id.is_empty());
        assert!(config.aem.base_url.is_none());
        assert!(config.inputs.is_empty());
    }

    #[test]
    fn inputs_table_keeps_parameter_names() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind_addr = "0.0.0.0:9000"
            package = "brand-bridge"

            [storage]
            state_db_path = "state.db"
            files_dir = "files"

            [events]
            registration_provider_id = "reg-provider"
            asset_sync_provider_id = "asset-provider"

            [inputs]
            APPLICATION_RUNTIME_INFO = '{"consoleId":"c1","projectName":"a2b","workspace":"Stage"}'
            S2S_SCOPES = '["AdobeID","openid"]'
            "#,
        )
        .unwrap();

        assert_eq!(config.server.package, "brand-bridge");
        assert_eq!(config.events.registration_provider_id, "reg-provider");
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.inputs["S2S_SCOPES"], r#"["AdobeID","openid"]"#);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
