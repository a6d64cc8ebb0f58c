//! Garden directory aggregation
//!
//! Combines the curated metadata and the on-chain list of the active
//! network into the merged, filtered directory:
//!
//! ```text
//! metadata ─┐
//!           ├─ merge (memoized per snapshot pair) ─ name filter ─ DirectoryView
//! list ─────┘                                          ▲
//!                                         debounced name text
//! ```
//!
//! Metadata and list load independently; the directory is loading while
//! either of them is. `reload()` bumps the refetch token so both are fetched
//! again even if nothing else changed.

use crate::filter::{Debouncer, FilterEngine, DEFAULT_DEBOUNCE};
use crate::merge::merge_all;
use crate::sources::{DirectorySource, ListState, MetadataSource, MetadataState};
use crate::types::{InternalFilters, MergedOrg, Network, OrgMetadata, OrgRecord, QueryParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Snapshot of the directory as exposed to consumers
#[derive(Debug, Clone)]
pub struct DirectoryView {
    pub network: Network,
    /// Merged gardens after the name filter, in indexer order
    pub gardens: Arc<Vec<MergedOrg>>,
    /// Metadata collection the gardens were merged with
    pub metadata: Arc<Vec<OrgMetadata>>,
    pub loading: bool,
    /// Raw name filter as typed
    pub internal_filters: InternalFilters,
    /// Query parameters of the current list
    pub external_filters: QueryParams,
    /// Settled name filter the gardens were filtered with
    pub applied_filter: String,
    /// `(metadata, list)` generations this view was computed from
    pub source_generations: (u64, u64),
}

/// Aggregator options
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    pub query: QueryParams,
    pub debounce: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            query: QueryParams::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Inputs {
    network: Network,
    query: QueryParams,
    refetch: u64,
    name: String,
}

/// Orchestrates metadata, list, merge and filter into the directory
pub struct DirectoryAggregator {
    metadata: Arc<MetadataSource>,
    directory: Arc<DirectorySource>,
    debouncer: Debouncer,
    inputs_tx: watch::Sender<Inputs>,
    view_rx: watch::Receiver<DirectoryView>,
    driver: JoinHandle<()>,
}

impl DirectoryAggregator {
    /// Create the aggregator and start loading the active network
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        network: Network,
        metadata: Arc<MetadataSource>,
        directory: DirectorySource,
        filter: FilterEngine,
        options: AggregatorOptions,
    ) -> Self {
        let directory = Arc::new(directory);
        let debouncer = Debouncer::new(options.debounce, "");
        let inputs = Inputs {
            network: network.clone(),
            query: options.query.clone(),
            refetch: 0,
            name: String::new(),
        };

        let (inputs_tx, inputs_rx) = watch::channel(inputs);
        let (view_tx, view_rx) = watch::channel(DirectoryView {
            network: network.clone(),
            gardens: Arc::new(Vec::new()),
            metadata: Arc::new(Vec::new()),
            loading: true,
            internal_filters: InternalFilters::default(),
            external_filters: options.query.clone(),
            applied_filter: String::new(),
            source_generations: (0, 0),
        });

        info!(network = %network, "Loading garden directory");
        metadata.load(&network, 0);
        directory.load(&network, &options.query, 0);

        let driver = tokio::spawn(drive(
            metadata.subscribe(),
            directory.subscribe(),
            debouncer.subscribe(),
            inputs_rx,
            view_tx,
            filter,
        ));

        Self {
            metadata,
            directory,
            debouncer,
            inputs_tx,
            view_rx,
            driver,
        }
    }

    fn update(&self, change: impl FnOnce(&mut Inputs)) -> Inputs {
        self.inputs_tx.send_modify(change);
        self.inputs_tx.borrow().clone()
    }

    /// Force both metadata and list to be fetched again
    pub fn reload(&self) {
        let inputs = self.update(|inputs| inputs.refetch += 1);
        debug!(refetch = inputs.refetch, "Reloading garden directory");
        self.metadata.load(&inputs.network, inputs.refetch);
        self.directory.load(&inputs.network, &inputs.query, inputs.refetch);
    }

    /// Change the query parameters; refetches the list only
    pub fn set_query(&self, query: QueryParams) {
        let inputs = self.update(|inputs| inputs.query = query);
        self.directory.load(&inputs.network, &inputs.query, inputs.refetch);
    }

    /// Feed raw name filter text; applied once it settles
    pub fn set_name_filter(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|inputs| inputs.name = text.clone());
        self.debouncer.push(text);
    }

    /// Switch the active network, dropping everything loaded for the old one
    pub fn switch_network(&self, network: Network) {
        let inputs = self.update(|inputs| inputs.network = network);
        info!(network = %inputs.network, "Switching garden directory network");
        self.metadata.load(&inputs.network, inputs.refetch);
        self.directory.load(&inputs.network, &inputs.query, inputs.refetch);
    }

    pub fn network(&self) -> Network {
        self.inputs_tx.borrow().network.clone()
    }

    /// Latest published view
    pub fn view(&self) -> DirectoryView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DirectoryView> {
        self.view_rx.clone()
    }

    /// Whether metadata or the list is still loading
    pub fn loading(&self) -> bool {
        self.metadata.state().loading || self.directory.state().loading
    }

    /// Wait until both sources settled and the view reflects them
    pub async fn ready(&self) -> DirectoryView {
        let mut view_rx = self.view_rx.clone();
        loop {
            {
                let view = view_rx.borrow_and_update();
                if self.reflects_sources(&view) {
                    return view.clone();
                }
            }
            if view_rx.changed().await.is_err() {
                return self.view();
            }
        }
    }

    fn reflects_sources(&self, view: &DirectoryView) -> bool {
        let metadata = self.metadata.state();
        let list = self.directory.state();
        !metadata.loading
            && !list.loading
            && !view.loading
            && view.source_generations == (metadata.generation, list.generation)
            && view.network == self.inputs_tx.borrow().network
    }
}

impl Drop for DirectoryAggregator {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

type MergeMemo = Option<(Arc<Vec<OrgRecord>>, Arc<Vec<OrgMetadata>>, Arc<Vec<MergedOrg>>)>;

async fn drive(
    mut metadata_rx: watch::Receiver<MetadataState>,
    mut list_rx: watch::Receiver<ListState>,
    mut filter_rx: watch::Receiver<String>,
    mut inputs_rx: watch::Receiver<Inputs>,
    view_tx: watch::Sender<DirectoryView>,
    filter: FilterEngine,
) {
    let mut memo: MergeMemo = None;

    loop {
        let view = {
            let metadata = metadata_rx.borrow_and_update().clone();
            let list = list_rx.borrow_and_update().clone();
            let applied_filter = filter_rx.borrow_and_update().clone();
            let inputs = inputs_rx.borrow_and_update().clone();
            compose(&metadata, &list, applied_filter, inputs, &filter, &mut memo)
        };
        view_tx.send_replace(view);

        let closed = tokio::select! {
            changed = metadata_rx.changed() => changed.is_err(),
            changed = list_rx.changed() => changed.is_err(),
            changed = filter_rx.changed() => changed.is_err(),
            changed = inputs_rx.changed() => changed.is_err(),
        };
        if closed {
            break;
        }
    }
}

fn compose(
    metadata: &MetadataState,
    list: &ListState,
    applied_filter: String,
    inputs: Inputs,
    filter: &FilterEngine,
    memo: &mut MergeMemo,
) -> DirectoryView {
    let cached = memo.as_ref().and_then(|(records, meta, merged)| {
        (Arc::ptr_eq(records, &list.value) && Arc::ptr_eq(meta, &metadata.value))
            .then(|| Arc::clone(merged))
    });
    let merged = match cached {
        Some(merged) => merged,
        None => {
            let merged = Arc::new(merge_all(&list.value, &metadata.value));
            *memo = Some((
                Arc::clone(&list.value),
                Arc::clone(&metadata.value),
                Arc::clone(&merged),
            ));
            merged
        }
    };

    DirectoryView {
        network: inputs.network,
        gardens: filter.apply_shared(&merged, &applied_filter),
        metadata: Arc::clone(&metadata.value),
        loading: metadata.loading || list.loading || !metadata.loaded || !list.loaded,
        internal_filters: InternalFilters { name: inputs.name },
        external_filters: inputs.query,
        applied_filter,
        source_generations: (metadata.generation, list.generation),
    }
}
