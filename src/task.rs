//! Generation-tagged task slots
//!
//! Every fetch is issued against a slot and receives a [`Ticket`] carrying
//! the slot generation at issue time. A completion may only publish while its
//! ticket is still current; anything issued later, an explicit invalidation,
//! or closing the slot makes older tickets stale.

use crate::error::GardenError;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Proof of issue for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    generation: u64,
    key: K,
}

impl<K> Ticket<K> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> &K {
        &self.key
    }
}

#[derive(Debug)]
struct SlotState<K> {
    generation: u64,
    key: Option<K>,
    closed: bool,
}

/// Tracks the authoritative fetch for one dependency key
#[derive(Debug)]
pub struct TaskSlot<K> {
    name: &'static str,
    state: Mutex<SlotState<K>>,
}

impl<K> TaskSlot<K> {
    fn lock(&self) -> MutexGuard<'_, SlotState<K>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Tear the slot down; no ticket can publish afterwards
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.generation += 1;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl<K: Clone + PartialEq> TaskSlot<K> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(SlotState {
                generation: 0,
                key: None,
                closed: false,
            }),
        }
    }

    /// Issue a new fetch for `key`, superseding every outstanding ticket
    pub fn issue(&self, key: K) -> Ticket<K> {
        let mut state = self.lock();
        state.generation += 1;
        state.key = Some(key.clone());
        Ticket {
            generation: state.generation,
            key,
        }
    }

    /// Issue only when `key` differs from the last issued key
    pub fn issue_if_changed(&self, key: K) -> Option<Ticket<K>> {
        {
            let state = self.lock();
            if state.key.as_ref() == Some(&key) {
                return None;
            }
        }
        Some(self.issue(key))
    }

    /// Last issued key, if any
    pub fn current_key(&self) -> Option<K> {
        self.lock().key.clone()
    }

    /// Whether a ticket may still publish
    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        let state = self.lock();
        !state.closed && state.generation == ticket.generation
    }

    /// Run `publish` if the ticket is current, atomically with the check
    ///
    /// Returns false (and drops the result) for stale tickets.
    pub fn commit<F: FnOnce()>(&self, ticket: &Ticket<K>, publish: F) -> bool {
        let state = self.lock();
        if state.closed || state.generation != ticket.generation {
            debug!(
                slot = self.name,
                generation = ticket.generation,
                current = state.generation,
                "Discarding stale result"
            );
            return false;
        }
        publish();
        true
    }

    /// Make every outstanding ticket stale and forget the last key
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.key = None;
    }
}

/// Published snapshot of a keyed load
#[derive(Debug)]
pub struct Loadable<K, T> {
    /// Key of the committed value (None before the first commit)
    pub key: Option<K>,
    /// Slot generation of the committed value
    pub generation: u64,
    /// A fetch is outstanding
    pub loading: bool,
    /// At least one fetch committed since the last reset
    pub loaded: bool,
    pub value: Arc<T>,
}

impl<K: Clone, T> Clone for Loadable<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            generation: self.generation,
            loading: self.loading,
            loaded: self.loaded,
            value: Arc::clone(&self.value),
        }
    }
}

impl<K, T: Default> Default for Loadable<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            generation: 0,
            loading: false,
            loaded: false,
            value: Arc::new(T::default()),
        }
    }
}

/// Runs fetches against a [`TaskSlot`] and publishes committed values
///
/// Failed fetches degrade to `T::default()`; the failure is logged only
/// when the fetch was still current. Outstanding fetches are aborted when
/// the loader is dropped.
pub struct KeyedLoader<K, T> {
    label: &'static str,
    slot: Arc<TaskSlot<K>>,
    state_tx: Arc<watch::Sender<Loadable<K, T>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<K, T> KeyedLoader<K, T>
where
    K: Clone + PartialEq + Send + Sync + 'static,
    T: Default + Send + Sync + 'static,
{
    pub fn new(label: &'static str) -> Self {
        let (state_tx, _) = watch::channel(Loadable::default());
        Self {
            label,
            slot: Arc::new(TaskSlot::new(label)),
            state_tx: Arc::new(state_tx),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Last issued key
    pub fn current_key(&self) -> Option<K> {
        self.slot.current_key()
    }

    pub fn state(&self) -> Loadable<K, T> {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Loadable<K, T>> {
        self.state_tx.subscribe()
    }

    /// Issue `fetch` for `key` unless `key` is already the authoritative one
    ///
    /// With `reset`, the published value is cleared immediately (the
    /// previous value belongs to another scope, e.g. another network).
    /// Must be called from within a tokio runtime.
    pub fn load<F>(&self, key: K, reset: bool, fetch: F) -> bool
    where
        F: Future<Output = Result<T, GardenError>> + Send + 'static,
    {
        let Some(ticket) = self.slot.issue_if_changed(key) else {
            return false;
        };
        self.start(ticket, reset, fetch);
        true
    }

    /// Issue `fetch` for `key` even if the key is unchanged
    pub fn force<F>(&self, key: K, reset: bool, fetch: F)
    where
        F: Future<Output = Result<T, GardenError>> + Send + 'static,
    {
        let ticket = self.slot.issue(key);
        self.start(ticket, reset, fetch);
    }

    fn start<F>(&self, ticket: Ticket<K>, reset: bool, fetch: F)
    where
        F: Future<Output = Result<T, GardenError>> + Send + 'static,
    {
        self.state_tx.send_modify(|state| {
            state.loading = true;
            if reset {
                state.key = None;
                state.loaded = false;
                state.value = Arc::new(T::default());
            }
        });

        let label = self.label;
        let slot = Arc::clone(&self.slot);
        let state_tx = Arc::clone(&self.state_tx);
        let handle = tokio::spawn(async move {
            let value = match fetch.await {
                Ok(value) => value,
                Err(err) => {
                    if slot.is_current(&ticket) {
                        error!(source = label, generation = ticket.generation(), "Error fetching {}: {}", label, err);
                    }
                    T::default()
                }
            };
            let value = Arc::new(value);
            slot.commit(&ticket, || {
                state_tx.send_modify(|state| {
                    state.key = Some(ticket.key().clone());
                    state.generation = ticket.generation();
                    state.loading = false;
                    state.loaded = true;
                    state.value = value;
                });
            });
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

impl<K, T> Drop for KeyedLoader<K, T> {
    fn drop(&mut self) {
        self.slot.close();
        let tasks = self.tasks.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
