//! Local file-based state storage backend.
//!
//! Loads a JSON snapshot of both projections on open, serves reads and
//! writes from memory, and persists the snapshot on [`LocalStateStore::save`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::addrs::ResourceInstanceAddress;
use crate::error::{PlannerError, Result, StateError};

use super::store::StateStore;
use super::types::{Projection, ResourceInstanceObject, StateSnapshot, STATE_VERSION};

/// Local file-based state store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Path to the state file.
    state_path: PathBuf,
    /// Loaded snapshot.
    snapshot: RwLock<StateSnapshot>,
}

impl LocalStateStore {
    /// Opens a state file, loading it if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(state_path: impl Into<PathBuf>) -> Result<Self> {
        let state_path = state_path.into();
        let snapshot = Self::load(&state_path).await?.unwrap_or_default();

        Ok(Self {
            state_path,
            snapshot: RwLock::new(snapshot),
        })
    }

    /// Returns the path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    /// Records a prior object in both projections if the instance has none.
    pub async fn seed_missing(&self, address: ResourceInstanceAddress, object: ResourceInstanceObject) {
        let mut snapshot = self.snapshot.write().await;
        if !snapshot.refresh.contains_key(&address) && !snapshot.working.contains_key(&address) {
            snapshot.seed(address, object);
        }
    }

    /// Returns a copy of the current snapshot.
    pub async fn snapshot(&self) -> StateSnapshot {
        self.snapshot.read().await.clone()
    }

    async fn load(path: &Path) -> Result<Option<StateSnapshot>> {
        if !path.exists() {
            debug!("State file does not exist: {}", path.display());
            return Ok(None);
        }

        info!("Loading state from: {}", path.display());

        let content = fs::read_to_string(path).await.map_err(|e| {
            PlannerError::State(StateError::corrupted(format!("Failed to read state file: {e}")))
        })?;

        let snapshot: StateSnapshot = serde_json::from_str(&content).map_err(|e| {
            PlannerError::State(StateError::corrupted(format!("Failed to parse state file: {e}")))
        })?;

        if snapshot.version != STATE_VERSION {
            return Err(PlannerError::State(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: snapshot.version,
            }));
        }

        Ok(Some(snapshot))
    }

    /// Persists the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating state directory: {}", parent.display());
                fs::create_dir_all(parent).await?;
            }
        }

        info!("Saving state to: {}", self.state_path.display());

        let content = {
            let mut snapshot = self.snapshot.write().await;
            snapshot.serial += 1;
            serde_json::to_string_pretty(&*snapshot).map_err(|e| {
                PlannerError::State(StateError::serialization(format!(
                    "Failed to serialize state: {e}"
                )))
            })?
        };

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.state_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.state_path).await?;

        debug!("State saved successfully");
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
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
        self.snapshot.write().await.set(address.clone(), projection, object);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const STATE_FILE: &str = "state.json";

    fn addr() -> ResourceInstanceAddress {
        "aws_instance.web".parse().expect("parse")
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join(STATE_FILE);

        let store = LocalStateStore::open(&path).await.expect("open");
        store
            .put(&addr(), Projection::Working, Some(ResourceInstanceObject::new(json!({"size": "large"}))))
            .await
            .expect("put");
        store.save().await.expect("save");

        let reopened = LocalStateStore::open(&path).await.expect("reopen");
        let working = reopened
            .get(&addr(), Projection::Working)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(working.attributes["size"], json!("large"));
        assert!(reopened.get(&addr(), Projection::Refresh).await.expect("get").is_none());
        assert_eq!(reopened.snapshot().await.serial, 1);
    }

    #[tokio::test]
    async fn test_open_nonexistent_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::open(temp_dir.path().join(STATE_FILE)).await.expect("open");

        assert!(store.get(&addr(), Projection::Refresh).await.expect("get").is_none());
        assert_eq!(store.backend_type(), "local");
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(STATE_FILE);
        std::fs::write(&path, "not json").expect("write");

        let err = LocalStateStore::open(&path).await.expect_err("must fail");
        assert!(matches!(err, PlannerError::State(StateError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_seed_missing_keeps_existing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::open(temp_dir.path().join(STATE_FILE)).await.expect("open");

        store.seed_missing(addr(), ResourceInstanceObject::new(json!({"v": 1}))).await;
        store.seed_missing(addr(), ResourceInstanceObject::new(json!({"v": 2}))).await;

        let refresh = store.get(&addr(), Projection::Refresh).await.expect("get").expect("present");
        assert_eq!(refresh.attributes["v"], json!(1));
    }
}
