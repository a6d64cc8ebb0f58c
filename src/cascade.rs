//! Garden-scoped provider cascade
//!
//! Garden-scoped collaborators (connection, activity, garden state,
//! staking, agreement subscription) only run while a garden is resolved.
//! They are activated in a fixed order and deactivated in reverse order
//! whenever the resolution is lost or changes garden.

use crate::address::addresses_equal;
use crate::error::{GardenError, Result};
use crate::resolver::{ResolutionResult, ResolverState};
use crate::types::MergedOrg;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Garden-scoped capabilities, in activation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKind {
    Connect,
    Activity,
    GardenState,
    Staking,
    AgreementSubscription,
}

impl ScopeKind {
    pub const ORDER: [ScopeKind; 5] = [
        ScopeKind::Connect,
        ScopeKind::Activity,
        ScopeKind::GardenState,
        ScopeKind::Staking,
        ScopeKind::AgreementSubscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Connect => "connect",
            ScopeKind::Activity => "activity",
            ScopeKind::GardenState => "garden-state",
            ScopeKind::Staking => "staking",
            ScopeKind::AgreementSubscription => "agreement-subscription",
        }
    }
}

/// A collaborator that initializes against one resolved garden
#[async_trait]
pub trait ScopedProvider: Send + Sync {
    fn kind(&self) -> ScopeKind;

    async fn activate(&self, garden: Arc<MergedOrg>) -> Result<()>;

    async fn deactivate(&self);
}

/// Only a found garden unlocks garden scope
pub fn can_activate_scope(result: &ResolutionResult) -> bool {
    matches!(result, ResolutionResult::Found(_))
}

/// Activates scoped providers while a garden is resolved
pub struct ContextCascade {
    providers: Vec<Arc<dyn ScopedProvider>>,
    active: Vec<Arc<dyn ScopedProvider>>,
    garden: Option<Arc<MergedOrg>>,
}

impl ContextCascade {
    pub fn new(mut providers: Vec<Arc<dyn ScopedProvider>>) -> Self {
        providers.sort_by_key(|provider| provider.kind());
        Self {
            providers,
            active: Vec::new(),
            garden: None,
        }
    }

    /// Garden the scope is mounted for
    pub fn garden(&self) -> Option<&Arc<MergedOrg>> {
        self.garden.as_ref()
    }

    pub fn is_scoped(&self) -> bool {
        self.garden.is_some()
    }

    pub fn active_scopes(&self) -> Vec<ScopeKind> {
        self.active.iter().map(|provider| provider.kind()).collect()
    }

    /// Bring the mounted scope in line with a resolution result
    ///
    /// Returns whether the garden scope is mounted afterwards. A provider
    /// failing to activate unwinds the ones already activated.
    pub async fn sync(&mut self, result: &ResolutionResult) -> Result<bool> {
        let ResolutionResult::Found(garden) = result else {
            self.teardown().await;
            return Ok(false);
        };

        if let Some(current) = &self.garden {
            if addresses_equal(&current.id, &garden.id) && current.chain_id == garden.chain_id {
                self.garden = Some(Arc::clone(garden));
                return Ok(true);
            }
            self.teardown().await;
        }

        info!(garden = %garden.id, "Mounting garden scope");
        for provider in self.providers.clone() {
            if let Err(err) = provider.activate(Arc::clone(garden)).await {
                warn!(scope = provider.kind().as_str(), garden = %garden.id, "Scope activation failed: {}", err);
                self.teardown().await;
                return Err(GardenError::Scope {
                    scope: provider.kind().as_str().to_string(),
                    reason: err.to_string(),
                });
            }
            self.active.push(provider);
        }
        self.garden = Some(Arc::clone(garden));
        Ok(true)
    }

    /// Deactivate every active provider in reverse order
    pub async fn teardown(&mut self) {
        if self.active.is_empty() && self.garden.is_none() {
            return;
        }
        debug!(scopes = self.active.len(), "Unmounting garden scope");
        while let Some(provider) = self.active.pop() {
            provider.deactivate().await;
        }
        self.garden = None;
    }

    /// Follow a resolver until its channel closes, then tear down
    pub async fn follow(&mut self, mut states: watch::Receiver<ResolverState>) {
        loop {
            let result = states.borrow_and_update().result();
            if let Err(err) = self.sync(&result).await {
                warn!("Garden scope unavailable: {}", err);
            }
            if states.changed().await.is_err() {
                break;
            }
        }
        self.teardown().await;
    }
}
