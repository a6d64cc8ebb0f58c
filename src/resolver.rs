//! Connected garden resolution
//!
//! Resolves the garden named by the current route. The lookup waits for
//! the metadata of the route's network so the garden is merged in a
//! single pass:
//!
//! ```text
//! Idle ──(route id + metadata loaded)──▶ Loading ──▶ Found | NotFound
//! ```
//!
//! A route without metadata, or whose metadata is being fetched again, is
//! still pending, never not-found.

use crate::address::{self, addresses_equal};
use crate::error::{GardenError, Result};
use crate::merge::merge_garden_metadata;
use crate::sources::{MetadataSource, MetadataState, SingleOrgSource};
use crate::task::TaskSlot;
use crate::types::{MergedOrg, Network};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Resolver state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverState {
    /// No route target, or metadata not loaded (or reloading)
    Idle,
    /// Lookup in flight
    Loading { id: String },
    Found(Arc<MergedOrg>),
    NotFound { id: String },
}

/// Outcome as seen by consumers
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionResult {
    Pending,
    Found(Arc<MergedOrg>),
    NotFound(String),
}

impl ResolverState {
    pub fn result(&self) -> ResolutionResult {
        match self {
            ResolverState::Idle | ResolverState::Loading { .. } => ResolutionResult::Pending,
            ResolverState::Found(garden) => ResolutionResult::Found(Arc::clone(garden)),
            ResolverState::NotFound { id } => ResolutionResult::NotFound(id.clone()),
        }
    }

    /// Whether this state is the final answer for `id`
    fn settles(&self, id: &str) -> bool {
        match self {
            ResolverState::Found(garden) => addresses_equal(&garden.id, id),
            ResolverState::NotFound { id: missing } => addresses_equal(missing, id),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RouteInput {
    network: Network,
    id: Option<String>,
}

/// `(chain id, normalized garden id, metadata generation)`
type ResolveKey = (u64, String, u64);

/// Resolves the routed garden against the shared metadata
pub struct ConnectedResolver {
    route_tx: watch::Sender<RouteInput>,
    state_rx: watch::Receiver<ResolverState>,
    driver: JoinHandle<()>,
}

impl ConnectedResolver {
    /// Must be called from within a tokio runtime
    pub fn new(network: Network, metadata: Arc<MetadataSource>, source: SingleOrgSource) -> Self {
        let (route_tx, route_rx) = watch::channel(RouteInput { network, id: None });
        let (state_tx, state_rx) = watch::channel(ResolverState::Idle);

        let lookup = Lookup {
            source,
            slot: Arc::new(TaskSlot::new("connected garden")),
            state_tx: Arc::new(state_tx),
            tasks: Vec::new(),
        };
        let driver = tokio::spawn(drive(lookup, route_rx, metadata.subscribe()));

        Self {
            route_tx,
            state_rx,
            driver,
        }
    }

    /// Route to a garden, or to no garden at all
    pub fn set_route(&self, id: Option<String>) {
        let id = id.filter(|id| !id.trim().is_empty());
        self.route_tx.send_if_modified(|route| {
            if route.id == id {
                return false;
            }
            route.id = id;
            true
        });
    }

    pub fn set_network(&self, network: Network) {
        self.route_tx.send_if_modified(|route| {
            if route.network == network {
                return false;
            }
            route.network = network;
            true
        });
    }

    pub fn route(&self) -> Option<String> {
        self.route_tx.borrow().id.clone()
    }

    pub fn state(&self) -> ResolverState {
        self.state_rx.borrow().clone()
    }

    pub fn result(&self) -> ResolutionResult {
        self.state_rx.borrow().result()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.state_rx.clone()
    }

    /// A route target exists and has no final answer yet
    pub fn loading(&self) -> bool {
        match self.route() {
            Some(id) => !self.state_rx.borrow().settles(&id),
            None => false,
        }
    }

    /// Connected garden, or the not-found signal for the routed target
    ///
    /// `Ok(None)` while nothing is routed or the lookup is pending.
    pub fn check(&self) -> Result<Option<Arc<MergedOrg>>> {
        let Some(id) = self.route() else {
            return Ok(None);
        };
        match &*self.state_rx.borrow() {
            ResolverState::Found(garden) if addresses_equal(&garden.id, &id) => Ok(Some(Arc::clone(garden))),
            ResolverState::NotFound { id: missing } if addresses_equal(missing, &id) => {
                Err(GardenError::GardenNotFound(missing.clone()))
            }
            _ => Ok(None),
        }
    }

    /// Wait for the final answer for the current route
    pub async fn settled(&self) -> Result<Option<Arc<MergedOrg>>> {
        let Some(id) = self.route() else {
            return Ok(None);
        };
        let mut state_rx = self.state_rx.clone();
        if state_rx.wait_for(|state| state.settles(&id)).await.is_err() {
            return Err(GardenError::GardenNotFound(id));
        }
        self.check()
    }
}

impl Drop for ConnectedResolver {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

struct Lookup {
    source: SingleOrgSource,
    slot: Arc<TaskSlot<ResolveKey>>,
    state_tx: Arc<watch::Sender<ResolverState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Lookup {
    fn publish(&self, state: ResolverState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn evaluate(&mut self, route: RouteInput, metadata: MetadataState) {
        let Some(id) = route.id else {
            self.slot.invalidate();
            self.publish(ResolverState::Idle);
            return;
        };

        let chain_id = route.network.chain_id;
        let same_chain = metadata.key.map(|(chain, _)| chain) == Some(chain_id);
        if !(metadata.loaded && !metadata.loading && same_chain) {
            self.slot.invalidate();
            // Only a found garden outlives a metadata refresh of its own chain
            let keep_found = metadata.loaded
                && same_chain
                && matches!(&*self.state_tx.borrow(), ResolverState::Found(garden) if addresses_equal(&garden.id, &id));
            if !keep_found {
                self.publish(ResolverState::Idle);
            }
            return;
        }

        let key = (chain_id, address::normalize(&id), metadata.generation);
        let Some(ticket) = self.slot.issue_if_changed(key) else {
            return;
        };

        // A refresh of the garden already shown keeps it until the new result lands
        let refreshing = matches!(&*self.state_tx.borrow(), ResolverState::Found(garden) if addresses_equal(&garden.id, &id));
        if !refreshing {
            self.publish(ResolverState::Loading { id: id.clone() });
        }
        debug!(chain_id, garden = %id, generation = ticket.generation(), "Resolving connected garden");

        let source = self.source.clone();
        let slot = Arc::clone(&self.slot);
        let state_tx = Arc::clone(&self.state_tx);
        let network = route.network;
        let gardens_metadata = metadata.value;
        let handle = tokio::spawn(async move {
            let state = match source.fetch(&network, &id).await {
                Ok(record) => ResolverState::Found(Arc::new(merge_garden_metadata(&record, &gardens_metadata))),
                Err(_) => ResolverState::NotFound { id: id.clone() },
            };
            slot.commit(&ticket, || {
                if let ResolverState::NotFound { id } = &state {
                    warn!(chain_id = network.chain_id, garden = %id, "Garden not found");
                }
                state_tx.send_replace(state);
            });
        });

        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle);
    }
}

impl Drop for Lookup {
    fn drop(&mut self) {
        self.slot.close();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

async fn drive(
    mut lookup: Lookup,
    mut route_rx: watch::Receiver<RouteInput>,
    mut metadata_rx: watch::Receiver<MetadataState>,
) {
    loop {
        let route = route_rx.borrow_and_update().clone();
        let metadata = metadata_rx.borrow_and_update().clone();
        lookup.evaluate(route, metadata);

        let closed = tokio::select! {
            changed = route_rx.changed() => changed.is_err(),
            changed = metadata_rx.changed() => changed.is_err(),
        };
        if closed {
            break;
        }
    }
}
