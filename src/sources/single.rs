//! Single garden lookup

use crate::error::{GardenError, Result};
use crate::sources::Indexer;
use crate::types::{Network, OrgRecord};
use std::sync::Arc;
use tracing::warn;

/// Fetches one garden by address
///
/// Every failure, missing garden or transport error alike, comes back as
/// `GardenError::GardenNotFound` for the requested address.
#[derive(Clone)]
pub struct SingleOrgSource {
    indexer: Arc<dyn Indexer>,
}

impl SingleOrgSource {
    pub fn new(indexer: Arc<dyn Indexer>) -> Self {
        Self { indexer }
    }

    pub async fn fetch(&self, network: &Network, id: &str) -> Result<OrgRecord> {
        match self.indexer.get_organization(network, id).await {
            Ok(record) => Ok(record),
            Err(err @ GardenError::GardenNotFound(_)) => Err(err),
            Err(err) => {
                warn!(chain_id = network.chain_id, garden = id, "Error fetching garden: {}", err);
                Err(GardenError::GardenNotFound(id.to_string()))
            }
        }
    }
}
