//! Garden list source
//!
//! Lists are keyed by `(network, query params, refetch token)`; the latest
//! issued key is authoritative. Voided gardens are dropped before the list
//! is published.

use crate::sources::Indexer;
use crate::task::{KeyedLoader, Loadable};
use crate::types::{Network, OrgRecord, QueryParams};
use crate::voided::VoidedRegistry;
use std::sync::Arc;
use tokio::sync::watch;

/// `(chain id, query params, refetch token)`
pub type ListKey = (u64, QueryParams, u64);

/// Published list snapshot
pub type ListState = Loadable<ListKey, Vec<OrgRecord>>;

pub struct DirectorySource {
    indexer: Arc<dyn Indexer>,
    voided: Arc<VoidedRegistry>,
    loader: KeyedLoader<ListKey, Vec<OrgRecord>>,
}

impl DirectorySource {
    pub fn new(indexer: Arc<dyn Indexer>, voided: Arc<VoidedRegistry>) -> Self {
        Self {
            indexer,
            voided,
            loader: KeyedLoader::new("gardens"),
        }
    }

    /// Load the list unless this key is already authoritative
    pub fn load(&self, network: &Network, query: &QueryParams, refetch: u64) -> bool {
        let reset = self.loader.current_key().map(|(chain_id, _, _)| chain_id) != Some(network.chain_id);
        let indexer = Arc::clone(&self.indexer);
        let voided = Arc::clone(&self.voided);
        let network = network.clone();
        let query = query.clone();
        let key = (network.chain_id, query.clone(), refetch);

        self.loader.load(key, reset, async move {
            let gardens = indexer.list_organizations(&network, &query).await?;
            Ok(voided.retain_active(network.chain_id, gardens))
        })
    }

    pub fn state(&self) -> ListState {
        self.loader.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.loader.subscribe()
    }
}
