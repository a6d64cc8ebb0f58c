//! Data sources for the directory
//!
//! - `indexer`: on-chain gardens through the subgraph (list and single)
//! - `metadata`: curated metadata document per network
//! - `directory`: keyed, cancellable list loads
//! - `single`: one garden by address

mod directory;
mod indexer;
mod metadata;
mod single;

pub use directory::{DirectorySource, ListKey, ListState};
pub use indexer::{Indexer, SubgraphIndexer};
pub use metadata::{HttpMetadataHost, MetadataHost, MetadataKey, MetadataSource, MetadataState};
pub use single::SingleOrgSource;
