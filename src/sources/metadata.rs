//! Curated metadata source
//!
//! One document per network holds the metadata of every garden. The
//! document is fetched once per `(network, refetch token)` key and shared
//! by the directory and the connected-garden resolver.

use crate::config::MetadataConfig;
use crate::error::{GardenError, Result};
use crate::task::{KeyedLoader, Loadable};
use crate::types::{MetadataDocument, Network, OrgMetadata};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// `(chain id, refetch token)`
pub type MetadataKey = (u64, u64);

/// Published metadata snapshot
pub type MetadataState = Loadable<MetadataKey, Vec<OrgMetadata>>;

/// Metadata file collaborator
#[async_trait]
pub trait MetadataHost: Send + Sync {
    async fn fetch_document(&self, network: &Network) -> Result<MetadataDocument>;
}

/// Fetches metadata documents from a content host over HTTP
pub struct HttpMetadataHost {
    url_template: String,
    http_client: reqwest::Client,
}

impl HttpMetadataHost {
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url_template: config.url_template.clone(),
            http_client,
        })
    }

    /// Document URL for a network; a per-network URL wins over the template
    pub fn document_url(&self, network: &Network) -> String {
        match &network.metadata_url {
            Some(url) => url.clone(),
            None => self
                .url_template
                .replace("{chain_id}", &network.chain_id.to_string()),
        }
    }
}

#[async_trait]
impl MetadataHost for HttpMetadataHost {
    async fn fetch_document(&self, network: &Network) -> Result<MetadataDocument> {
        let url = self.document_url(network);
        debug!(chain_id = network.chain_id, url = %url, "Fetching gardens metadata");

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GardenError::Network(format!("HTTP {} - {}", status, body)));
        }

        let document: MetadataDocument = response.json().await?;
        Ok(document)
    }
}

/// Keyed, shared loader for the metadata document of the active network
pub struct MetadataSource {
    host: Arc<dyn MetadataHost>,
    loader: KeyedLoader<MetadataKey, Vec<OrgMetadata>>,
}

impl MetadataSource {
    pub fn new(host: Arc<dyn MetadataHost>) -> Self {
        Self {
            host,
            loader: KeyedLoader::new("gardens metadata"),
        }
    }

    /// Load metadata for `network` unless this key is already authoritative
    ///
    /// Switching networks clears the published collection immediately.
    /// Failures publish an empty collection.
    pub fn load(&self, network: &Network, refetch: u64) -> bool {
        let reset = self.loader.current_key().map(|(chain_id, _)| chain_id) != Some(network.chain_id);
        let host = Arc::clone(&self.host);
        let network = network.clone();
        self.loader.load((network.chain_id, refetch), reset, async move {
            Ok(host.fetch_document(&network).await?.gardens)
        })
    }

    pub fn state(&self) -> MetadataState {
        self.loader.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<MetadataState> {
        self.loader.subscribe()
    }
}
