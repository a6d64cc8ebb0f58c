//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use garden_directory::address::addresses_equal;
use garden_directory::{
    GardenError, Indexer, MergedOrg, MetadataDocument, MetadataHost, Network, OrgMetadata,
    OrgRecord, QueryParams, Result, ScopeKind, ScopedProvider, Token,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub fn network(chain_id: u64) -> Network {
    Network {
        chain_id,
        name: format!("chain-{}", chain_id),
        subgraph_url: format!("http://localhost:8000/{}", chain_id),
        metadata_url: None,
    }
}

pub fn record(id: &str) -> OrgRecord {
    OrgRecord {
        id: id.to_string(),
        token: Token {
            id: format!("{}-token", id),
            name: "Garden Token".into(),
            symbol: "GT".into(),
            decimals: 18,
            logo: None,
        },
        ..Default::default()
    }
}

pub fn metadata(id: &str, token_logo: Option<&str>) -> OrgMetadata {
    OrgMetadata {
        address: id.to_string(),
        name: Some(format!("Garden {}", id)),
        token_logo: token_logo.map(String::from),
        ..Default::default()
    }
}

/// Yield until `ready` holds, panicking if it never does
pub async fn until(mut ready: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if ready() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

type GetResponder = oneshot::Sender<Result<OrgRecord>>;

#[derive(Default)]
pub struct FakeIndexer {
    gardens: Mutex<HashMap<u64, Vec<OrgRecord>>>,
    pub fail_list: AtomicBool,
    pub fail_get: AtomicBool,
    pub gate_get: AtomicBool,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub queries: Mutex<Vec<QueryParams>>,
    pending_get: Mutex<Vec<(String, GetResponder)>>,
}

impl FakeIndexer {
    pub fn with(chain_id: u64, ids: &[&str]) -> Self {
        let indexer = Self::default();
        indexer.set(chain_id, ids);
        indexer
    }

    pub fn set(&self, chain_id: u64, ids: &[&str]) {
        let records = ids
            .iter()
            .map(|id| OrgRecord {
                chain_id,
                ..record(id)
            })
            .collect();
        self.gardens.lock().unwrap().insert(chain_id, records);
    }

    pub fn pending_get(&self) -> usize {
        self.pending_get.lock().unwrap().len()
    }

    /// Answer the in-flight lookup for `id` from the stored records
    pub fn release_get(&self, chain_id: u64, id: &str) {
        let responder = {
            let mut pending = self.pending_get.lock().unwrap();
            let index = pending
                .iter()
                .position(|(pending_id, _)| pending_id == id)
                .expect("lookup pending");
            pending.remove(index).1
        };
        let _ = responder.send(self.lookup(chain_id, id));
    }

    fn lookup(&self, chain_id: u64, id: &str) -> Result<OrgRecord> {
        self.gardens
            .lock()
            .unwrap()
            .get(&chain_id)
            .and_then(|records| records.iter().find(|r| addresses_equal(&r.id, id)).cloned())
            .ok_or_else(|| GardenError::GardenNotFound(id.to_string()))
    }
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn list_organizations(&self, network: &Network, query: &QueryParams) -> Result<Vec<OrgRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(GardenError::Network("HTTP 502 - bad gateway".into()));
        }
        Ok(self
            .gardens
            .lock()
            .unwrap()
            .get(&network.chain_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_organization(&self, network: &Network, id: &str) -> Result<OrgRecord> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.gate_get.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.pending_get.lock().unwrap().push((id.to_string(), tx));
            return rx
                .await
                .unwrap_or_else(|_| Err(GardenError::Network("dropped".into())));
        }
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(GardenError::Network("connection reset".into()));
        }
        self.lookup(network.chain_id, id)
    }
}

type DocResponder = oneshot::Sender<Result<MetadataDocument>>;

#[derive(Default)]
pub struct FakeMetadataHost {
    docs: Mutex<HashMap<u64, Vec<OrgMetadata>>>,
    pub fail: AtomicBool,
    pub gated: AtomicBool,
    pub calls: AtomicUsize,
    pending: Mutex<Vec<DocResponder>>,
}

impl FakeMetadataHost {
    pub fn with(chain_id: u64, gardens: Vec<OrgMetadata>) -> Self {
        let host = Self::default();
        host.docs.lock().unwrap().insert(chain_id, gardens);
        host
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Answer the `index`-th in-flight fetch (in issue order)
    pub fn release(&self, index: usize, gardens: Vec<OrgMetadata>) {
        let responder = self.pending.lock().unwrap().remove(index);
        let _ = responder.send(Ok(MetadataDocument { gardens }));
    }
}

#[async_trait]
impl MetadataHost for FakeMetadataHost {
    async fn fetch_document(&self, network: &Network) -> Result<MetadataDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push(tx);
            return rx
                .await
                .unwrap_or_else(|_| Err(GardenError::Network("dropped".into())));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(GardenError::Network("HTTP 404 - not found".into()));
        }
        Ok(MetadataDocument {
            gardens: self
                .docs
                .lock()
                .unwrap()
                .get(&network.chain_id)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

pub type ScopeLog = Arc<Mutex<Vec<String>>>;

/// Scoped provider recording its lifecycle
pub struct RecordingScope {
    pub kind: ScopeKind,
    pub log: ScopeLog,
}

#[async_trait]
impl ScopedProvider for RecordingScope {
    fn kind(&self) -> ScopeKind {
        self.kind
    }

    async fn activate(&self, garden: Arc<MergedOrg>) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("+{}:{}", self.kind.as_str(), garden.id));
        Ok(())
    }

    async fn deactivate(&self) {
        self.log.lock().unwrap().push(format!("-{}", self.kind.as_str()));
    }
}

pub fn scopes(log: &ScopeLog) -> Vec<Arc<dyn ScopedProvider>> {
    ScopeKind::ORDER
        .iter()
        .map(|kind| {
            Arc::new(RecordingScope {
                kind: *kind,
                log: Arc::clone(log),
            }) as Arc<dyn ScopedProvider>
        })
        .collect()
}
