//! Voided gardens registry
//!
//! Gardens that were deployed by mistake or abandoned are listed per
//! network and never shown in the directory.

use crate::address;
use crate::types::OrgRecord;
use std::collections::{HashMap, HashSet};

/// Read-only set of excluded garden addresses, keyed by chain id
#[derive(Debug, Clone, Default)]
pub struct VoidedRegistry {
    by_network: HashMap<u64, HashSet<String>>,
    empty: HashSet<String>,
}

impl VoidedRegistry {
    /// Registry with no voided gardens
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(chain_id, addresses)` pairs; addresses are normalized
    pub fn from_entries<I, A, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, A)>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_network: HashMap<u64, HashSet<String>> = HashMap::new();
        for (chain_id, addresses) in entries {
            by_network
                .entry(chain_id)
                .or_default()
                .extend(addresses.into_iter().map(|a| address::normalize(a.as_ref())));
        }
        Self {
            by_network,
            empty: HashSet::new(),
        }
    }

    /// Excluded addresses for a network (empty for unknown networks)
    pub fn excluded(&self, chain_id: u64) -> &HashSet<String> {
        self.by_network.get(&chain_id).unwrap_or(&self.empty)
    }

    /// Whether a garden is voided on the given network
    pub fn is_voided(&self, chain_id: u64, id: &str) -> bool {
        self.excluded(chain_id).contains(&address::normalize(id))
    }

    /// Drop every voided garden from a fetched list, keeping order
    pub fn retain_active(&self, chain_id: u64, mut gardens: Vec<OrgRecord>) -> Vec<OrgRecord> {
        let excluded = self.excluded(chain_id);
        if !excluded.is_empty() {
            gardens.retain(|garden| !excluded.contains(&address::normalize(&garden.id)));
        }
        gardens
    }
}
