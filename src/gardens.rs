//! Gardens facade
//!
//! Wires the shared metadata source, the directory aggregator and the
//! connected-garden resolver for one active network, and exposes the
//! combined state consumers read. Garden-scoped providers are mounted with
//! [`Gardens::mount_scope`].

use crate::aggregator::{AggregatorOptions, DirectoryAggregator, DirectoryView};
use crate::cascade::{ContextCascade, ScopedProvider};
use crate::config::Config;
use crate::error::{GardenError, Result};
use crate::filter::{FilterEngine, NameMatcher, SubstringMatcher};
use crate::resolver::{ConnectedResolver, ResolutionResult, ResolverState};
use crate::sources::{
    DirectorySource, HttpMetadataHost, Indexer, MetadataHost, MetadataSource, SingleOrgSource,
    SubgraphIndexer,
};
use crate::types::{MergedOrg, Network, QueryParams};
use crate::voided::VoidedRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Collaborators injected into [`Gardens`]
pub struct GardensDeps {
    pub indexer: Arc<dyn Indexer>,
    pub metadata_host: Arc<dyn MetadataHost>,
    pub voided: Arc<VoidedRegistry>,
    pub matcher: Arc<dyn NameMatcher>,
}

/// Directory plus connected garden for the active network
pub struct Gardens {
    aggregator: DirectoryAggregator,
    resolver: ConnectedResolver,
}

impl Gardens {
    /// Must be called from within a tokio runtime
    pub fn new(network: Network, deps: GardensDeps, query: QueryParams, debounce: Duration) -> Self {
        let metadata = Arc::new(MetadataSource::new(deps.metadata_host));
        let directory = DirectorySource::new(Arc::clone(&deps.indexer), deps.voided);
        let aggregator = DirectoryAggregator::new(
            network.clone(),
            Arc::clone(&metadata),
            directory,
            FilterEngine::new(deps.matcher),
            AggregatorOptions { query, debounce },
        );
        let resolver = ConnectedResolver::new(network, metadata, SingleOrgSource::new(deps.indexer));

        Self { aggregator, resolver }
    }

    /// Build with HTTP collaborators from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let deps = GardensDeps {
            indexer: Arc::new(SubgraphIndexer::new(&config.indexer)?),
            metadata_host: Arc::new(HttpMetadataHost::new(&config.metadata)?),
            voided: Arc::new(config.voided_registry()),
            matcher: Arc::new(SubstringMatcher),
        };
        Ok(Self::new(
            config.default_network()?,
            deps,
            QueryParams::default(),
            config.filter.debounce(),
        ))
    }

    pub fn aggregator(&self) -> &DirectoryAggregator {
        &self.aggregator
    }

    pub fn resolver(&self) -> &ConnectedResolver {
        &self.resolver
    }

    pub fn directory(&self) -> DirectoryView {
        self.aggregator.view()
    }

    pub fn connected(&self) -> Option<Arc<MergedOrg>> {
        match self.resolver.result() {
            ResolutionResult::Found(garden) => Some(garden),
            _ => None,
        }
    }

    /// Directory or connected garden still loading
    pub fn loading(&self) -> bool {
        self.aggregator.loading() || self.resolver.loading()
    }

    pub fn reload(&self) {
        self.aggregator.reload();
    }

    pub fn set_route(&self, id: Option<String>) {
        self.resolver.set_route(id);
    }

    pub fn set_name_filter(&self, text: impl Into<String>) {
        self.aggregator.set_name_filter(text);
    }

    pub fn set_query(&self, query: QueryParams) {
        self.aggregator.set_query(query);
    }

    pub fn switch_network(&self, network: Network) {
        self.resolver.set_network(network.clone());
        self.aggregator.switch_network(network);
    }

    /// Raise the not-found signal for an unresolvable route target
    ///
    /// Only raised once nothing is loading any more.
    pub fn check_connected(&self) -> Result<Option<Arc<MergedOrg>>> {
        match self.resolver.check() {
            Err(_) if self.aggregator.loading() => Ok(None),
            checked => checked,
        }
    }

    pub fn resolution(&self) -> watch::Receiver<ResolverState> {
        self.resolver.subscribe()
    }

    /// Mount `providers` whenever a garden is resolved
    ///
    /// The returned task ends, with every scope torn down, once this
    /// facade is dropped.
    pub fn mount_scope(&self, providers: Vec<Arc<dyn ScopedProvider>>) -> JoinHandle<ContextCascade> {
        let states = self.resolver.subscribe();
        tokio::spawn(async move {
            let mut cascade = ContextCascade::new(providers);
            cascade.follow(states).await;
            cascade
        })
    }

    /// Resolve `id` and wait for the answer
    pub async fn open(&self, id: impl Into<String>) -> Result<Arc<MergedOrg>> {
        let id = id.into();
        self.set_route(Some(id.clone()));
        self.resolver
            .settled()
            .await?
            .ok_or(GardenError::GardenNotFound(id))
    }
}
