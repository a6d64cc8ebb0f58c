//! Directory configuration
//!
//! Loaded from TOML; every section and field has a default so an empty
//! file (or no file) yields a working local setup.

use crate::error::{GardenError, Result};
use crate::types::Network;
use crate::voided::VoidedRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkSelection,
    #[serde(default = "default_networks")]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    /// Voided garden addresses keyed by chain id
    #[serde(default)]
    pub voided: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSelection {
    /// Chain the directory starts on
    #[serde(default = "default_chain_id")]
    pub default_chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Document URL; `{chain_id}` is substituted
    #[serde(default = "default_metadata_url")]
    pub url_template: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum gardens per list query
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Name filter settling delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl FilterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// Defaults
fn default_chain_id() -> u64 { 100 }
fn default_metadata_url() -> String { "http://localhost:8080/gardens/{chain_id}.json".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_page_size() -> u32 { 1000 }
fn default_debounce_ms() -> u64 { 300 }
fn default_networks() -> Vec<Network> {
    vec![
        Network {
            chain_id: 100,
            name: "Gnosis".to_string(),
            subgraph_url: "http://localhost:8000/subgraphs/name/gardens-xdai".to_string(),
            metadata_url: None,
        },
        Network {
            chain_id: 137,
            name: "Polygon".to_string(),
            subgraph_url: "http://localhost:8000/subgraphs/name/gardens-polygon".to_string(),
            metadata_url: None,
        },
    ]
}

impl Default for NetworkSelection {
    fn default() -> Self {
        Self {
            default_chain_id: default_chain_id(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            url_template: default_metadata_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkSelection::default(),
            networks: default_networks(),
            metadata: MetadataConfig::default(),
            indexer: IndexerConfig::default(),
            filter: FilterConfig::default(),
            voided: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GardenError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Like [`load`](Self::load), falling back to defaults for a missing file
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        for chain_id in self.voided.keys() {
            chain_id
                .parse::<u64>()
                .map_err(|_| GardenError::Config(format!("voided: invalid chain id '{}'", chain_id)))?;
        }
        if self.indexer.page_size == 0 {
            return Err(GardenError::Config("indexer.page_size must be positive".into()));
        }
        Ok(())
    }

    /// Network configuration for a chain
    pub fn network(&self, chain_id: u64) -> Result<Network> {
        self.networks
            .iter()
            .find(|network| network.chain_id == chain_id)
            .cloned()
            .ok_or(GardenError::UnknownNetwork(chain_id))
    }

    pub fn default_network(&self) -> Result<Network> {
        self.network(self.network.default_chain_id)
    }

    /// Voided registry built from the `[voided]` section
    pub fn voided_registry(&self) -> VoidedRegistry {
        VoidedRegistry::from_entries(self.voided.iter().filter_map(|(chain_id, addresses)| {
            chain_id
                .parse::<u64>()
                .ok()
                .map(|chain_id| (chain_id, addresses.iter().map(String::as_str)))
        }))
    }
}
