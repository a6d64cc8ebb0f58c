//! Garden Directory
//!
//! Aggregates the directory of gardens for a network from two independent
//! sources and resolves the garden a consumer navigates to.
//!
//! # Architecture
//!
//! - **Indexer**: on-chain gardens (list and single lookup) from the subgraph
//! - **Metadata host**: one curated document per network (logos, forum,
//!   wrappable-token overrides, arbitrary attributes)
//! - **Merger**: overlays metadata on on-chain records
//! - **Aggregator**: metadata + list + voided exclusion + debounced name
//!   filter, with a manual `reload()`
//! - **Resolver**: the routed garden, or a not-found signal once everything
//!   it depends on has loaded
//! - **Cascade**: garden-scoped providers mounted only while a garden is
//!   resolved
//!
//! Every fetch is tagged with a generation; a result from a superseded or
//! torn-down fetch is discarded.
//!
//! # Example
//!
//! ```rust,ignore
//! use garden_directory::{Config, Gardens};
//!
//! let gardens = Gardens::from_config(&Config::default())?;
//!
//! let directory = gardens.aggregator().ready().await;
//! for garden in directory.gardens.iter() {
//!     println!("{} {}", garden.address, garden.display_name());
//! }
//!
//! // Typing in the name filter
//! gardens.set_name_filter("hive");
//!
//! // Navigating to a garden
//! let garden = gardens.open("0x8ccbeab14b5ac4a431fffc39f4bec4089020a155").await?;
//! ```

pub mod address;
pub mod aggregator;
pub mod cascade;
pub mod config;
pub mod error;
pub mod filter;
pub mod gardens;
pub mod logging;
pub mod merge;
pub mod resolver;
pub mod sources;
pub mod task;
pub mod types;
pub mod voided;

pub use aggregator::{AggregatorOptions, DirectoryAggregator, DirectoryView};
pub use cascade::{can_activate_scope, ContextCascade, ScopeKind, ScopedProvider};
pub use config::Config;
pub use error::{GardenError, Result};
pub use filter::{Debouncer, FilterEngine, NameMatcher, SubstringMatcher};
pub use gardens::{Gardens, GardensDeps};
pub use merge::merge_garden_metadata;
pub use resolver::{ConnectedResolver, ResolutionResult, ResolverState};
pub use sources::{
    DirectorySource, HttpMetadataHost, Indexer, MetadataHost, MetadataSource, SingleOrgSource,
    SubgraphIndexer,
};
pub use types::{
    InternalFilters, MergedOrg, MetadataDocument, Network, OrgMetadata, OrgRecord, QueryParams,
    SortDirection, Sorting, Token, TokenOverride,
};
pub use voided::VoidedRegistry;
