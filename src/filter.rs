//! Client-side name filtering
//!
//! The raw filter text is coalesced by a [`Debouncer`] and then applied to
//! the merged collection by a [`FilterEngine`]. Filtering never reorders.

use crate::types::MergedOrg;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default settling delay for the name filter
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Name-test collaborator
pub trait NameMatcher: Send + Sync {
    fn matches(&self, filter: &str, garden: &MergedOrg) -> bool;
}

/// Case-insensitive substring match on the display name
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl NameMatcher for SubstringMatcher {
    fn matches(&self, filter: &str, garden: &MergedOrg) -> bool {
        let needle = filter.trim().to_lowercase();
        garden.display_name().to_lowercase().contains(&needle)
    }
}

/// Applies the settled name filter to a merged collection
#[derive(Clone)]
pub struct FilterEngine {
    matcher: Arc<dyn NameMatcher>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(Arc::new(SubstringMatcher))
    }
}

impl FilterEngine {
    pub fn new(matcher: Arc<dyn NameMatcher>) -> Self {
        Self { matcher }
    }

    /// Keep the gardens matching `filter`; blank text keeps everything
    pub fn apply(&self, collection: &[MergedOrg], filter: &str) -> Vec<MergedOrg> {
        if filter.trim().is_empty() {
            return collection.to_vec();
        }
        collection
            .iter()
            .filter(|garden| self.matcher.matches(filter, garden))
            .cloned()
            .collect()
    }

    /// Like [`apply`](Self::apply), sharing the input when nothing is filtered
    pub fn apply_shared(&self, collection: &Arc<Vec<MergedOrg>>, filter: &str) -> Arc<Vec<MergedOrg>> {
        if filter.trim().is_empty() {
            return Arc::clone(collection);
        }
        Arc::new(self.apply(collection, filter))
    }
}

/// Single-timer coalescing queue
///
/// Every pushed value restarts the timer; only the value present when the
/// timer fires is published. The timer task stops when the debouncer is
/// dropped.
pub struct Debouncer {
    input: mpsc::UnboundedSender<String>,
    output: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Must be called from within a tokio runtime
    pub fn new(delay: Duration, initial: impl Into<String>) -> Self {
        let (input, mut pending_rx) = mpsc::unbounded_channel::<String>();
        let (output_tx, output) = watch::channel(initial.into());

        let task = tokio::spawn(async move {
            while let Some(mut pending) = pending_rx.recv().await {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => break,
                        next = pending_rx.recv() => match next {
                            Some(value) => pending = value,
                            None => return,
                        },
                    }
                }
                output_tx.send_if_modified(move |settled| {
                    if *settled == pending {
                        return false;
                    }
                    *settled = pending;
                    true
                });
            }
        });

        Self {
            input,
            output,
            task,
        }
    }

    /// Queue a new raw value, resetting the timer
    pub fn push(&self, value: impl Into<String>) {
        let _ = self.input.send(value.into());
    }

    /// Last settled value
    pub fn settled(&self) -> String {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.output.clone()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
