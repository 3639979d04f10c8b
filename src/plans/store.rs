//! Diff store: the collection of proposed changes keyed by instance.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::addrs::{ConfigResourceAddress, ResourceInstanceAddress};
use crate::error::Result;

use super::change::{ChangeAction, ResourceInstanceChange};
use super::changeset::ChangeSet;

/// Trait for diff storage backends.
#[async_trait]
pub trait DiffStore: Send + Sync {
    /// Records the change for an instance, replacing any earlier one.
    async fn put(&self, address: &ResourceInstanceAddress, change: ResourceInstanceChange) -> Result<()>;

    /// Gets the change recorded for an instance.
    async fn get(&self, address: &ResourceInstanceAddress) -> Result<Option<ResourceInstanceChange>>;

    /// Returns true if any instance of the resource has a change other
    /// than a no-op.
    async fn has_pending_change(&self, resource: &ConfigResourceAddress) -> Result<bool>;
}

/// Diff store holding changes in memory.
#[derive(Debug, Default)]
pub struct MemoryDiffStore {
    /// Changes by instance.
    changes: RwLock<BTreeMap<ResourceInstanceAddress, ResourceInstanceChange>>,
}

impl MemoryDiffStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded changes in address order.
    pub async fn change_set(&self) -> ChangeSet {
        ChangeSet::new(self.changes.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl DiffStore for MemoryDiffStore {
    async fn put(&self, address: &ResourceInstanceAddress, change: ResourceInstanceChange) -> Result<()> {
        debug!("Recording change for {address}: {}", change.action);
        self.changes.write().await.insert(address.clone(), change);
        Ok(())
    }

    async fn get(&self, address: &ResourceInstanceAddress) -> Result<Option<ResourceInstanceChange>> {
        Ok(self.changes.read().await.get(address).cloned())
    }

    async fn has_pending_change(&self, resource: &ConfigResourceAddress) -> Result<bool> {
        Ok(self
            .changes
            .read()
            .await
            .iter()
            .any(|(addr, change)| addr.config_resource() == *resource && change.action != ChangeAction::NoOp))
    }
}
