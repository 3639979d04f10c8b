//! In-memory state storage backend.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::addrs::ResourceInstanceAddress;
use crate::error::Result;

use super::store::StateStore;
use super::types::{Projection, ResourceInstanceObject, StateSnapshot};

/// State store holding both projections in memory.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    /// Both projections behind one lock.
    snapshot: RwLock<StateSnapshot>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from an existing snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Records a prior object in both projections.
    #[must_use]
    pub fn with_prior(mut self, address: ResourceInstanceAddress, object: ResourceInstanceObject) -> Self {
        self.snapshot.get_mut().seed(address, object);
        self
    }

    /// Returns a copy of the current snapshot.
    pub async fn snapshot(&self) -> StateSnapshot {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(
        &self,
        address: &ResourceInstanceAddress,
        projection: Projection,
    ) -> Result<Option<ResourceInstanceObject>> {
        Ok(self.snapshot.read().await.projection(projection).get(address).cloned())
    }

    async fn put(
        &self,
        address: &ResourceInstanceAddress,
        projection: Projection,
        object: Option<ResourceInstanceObject>,
    ) -> Result<()> {
        debug!("Writing {projection} state for {address} (present: {})", object.is_some());
        self.snapshot.write().await.set(address.clone(), projection, object);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn addr() -> ResourceInstanceAddress {
        "aws_instance.web".parse().expect("parse")
    }

    #[tokio::test]
    async fn test_projections_are_independent() {
        let store = MemoryStateStore::new()
            .with_prior(addr(), ResourceInstanceObject::new(json!({"size": "small"})));

        store
            .put(&addr(), Projection::Working, Some(ResourceInstanceObject::new(json!({"size": "large"}))))
            .await
            .expect("put");

        let refresh = store.get(&addr(), Projection::Refresh).await.expect("get").expect("present");
        let working = store.get(&addr(), Projection::Working).await.expect("get").expect("present");
        assert_eq!(refresh.attributes["size"], json!("small"));
        assert_eq!(working.attributes["size"], json!("large"));
    }

    #[tokio::test]
    async fn test_put_none_removes() {
        let store = MemoryStateStore::new()
            .with_prior(addr(), ResourceInstanceObject::new(json!({})));

        store.put(&addr(), Projection::Working, None).await.expect("put");

        assert!(store.get(&addr(), Projection::Working).await.expect("get").is_none());
        assert!(store.get(&addr(), Projection::Refresh).await.expect("get").is_some());
        assert_eq!(store.backend_type(), "memory");
    }
}
