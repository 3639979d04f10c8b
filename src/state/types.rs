//! State types for recorded resource instance objects.
//!
//! These types represent the last-known attributes of real-world objects
//! and the snapshot format the local backend persists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::addrs::{ConfigResourceAddress, ResourceInstanceAddress};

/// Current version of the snapshot format.
pub const STATE_VERSION: &str = "1.0";

/// Which of the two per-instance projections an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// The object as most recently observed from the live system.
    Refresh,
    /// The object as it will look once the planned change is applied.
    Working,
}

/// Status of a recorded object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStatus {
    /// The object exists and is usable.
    #[default]
    Ready,
    /// The object exists but is known to be damaged; it must be replaced.
    Tainted,
    /// The object does not exist yet; it is a placeholder for a planned create.
    Planned,
}

/// Last-known state of a single resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstanceObject {
    /// Attribute values.
    pub attributes: Value,
    /// Object status.
    #[serde(default)]
    pub status: ObjectStatus,
    /// Provider schema version the attributes conform to.
    #[serde(default)]
    pub schema_version: u64,
    /// Provider-opaque data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
    /// Resources this object depended on when last written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ConfigResourceAddress>,
    /// Whether replacement should create the new object first.
    #[serde(default)]
    pub create_before_destroy: bool,
}

/// Both projections of every instance, as persisted by the local backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Snapshot format version.
    pub version: String,
    /// Incremented on every save.
    pub serial: u64,
    /// When the snapshot was last updated.
    pub last_updated: DateTime<Utc>,
    /// Refresh projection.
    #[serde(default)]
    pub refresh: BTreeMap<ResourceInstanceAddress, ResourceInstanceObject>,
    /// Working projection.
    #[serde(default)]
    pub working: BTreeMap<ResourceInstanceAddress, ResourceInstanceObject>,
}

impl ResourceInstanceObject {
    /// Creates a ready object with the given attributes.
    #[must_use]
    pub fn new(attributes: Value) -> Self {
        Self {
            attributes,
            status: ObjectStatus::Ready,
            schema_version: 0,
            private: None,
            dependencies: Vec::new(),
            create_before_destroy: false,
        }
    }

    /// Returns the object with the given status.
    #[must_use]
    pub const fn with_status(mut self, status: ObjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the object with the given schema version.
    #[must_use]
    pub const fn with_schema_version(mut self, version: u64) -> Self {
        self.schema_version = version;
        self
    }

    /// Returns true if the object is tainted.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        self.status == ObjectStatus::Tainted
    }
}

impl StateSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            serial: 0,
            last_updated: Utc::now(),
            refresh: BTreeMap::new(),
            working: BTreeMap::new(),
        }
    }

    /// Returns the map backing a projection.
    #[must_use]
    pub const fn projection(
        &self,
        projection: Projection,
    ) -> &BTreeMap<ResourceInstanceAddress, ResourceInstanceObject> {
        match projection {
            Projection::Refresh => &self.refresh,
            Projection::Working => &self.working,
        }
    }

    /// Returns the mutable map backing a projection.
    pub const fn projection_mut(
        &mut self,
        projection: Projection,
    ) -> &mut BTreeMap<ResourceInstanceAddress, ResourceInstanceObject> {
        match projection {
            Projection::Refresh => &mut self.refresh,
            Projection::Working => &mut self.working,
        }
    }

    /// Sets or clears the object of one instance in one projection.
    pub fn set(
        &mut self,
        address: ResourceInstanceAddress,
        projection: Projection,
        object: Option<ResourceInstanceObject>,
    ) {
        let map = self.projection_mut(projection);
        match object {
            Some(object) => {
                map.insert(address, object);
            }
            None => {
                map.remove(&address);
            }
        }
        self.last_updated = Utc::now();
    }

    /// Records a prior object in both projections, as at the start of a plan.
    pub fn seed(&mut self, address: ResourceInstanceAddress, object: ResourceInstanceObject) {
        self.refresh.insert(address.clone(), object.clone());
        self.working.insert(address, object);
    }
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Refresh => "refresh",
            Self::Working => "working",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::Tainted => "tainted",
            Self::Planned => "planned",
        };
        write!(f, "{s}")
    }
}
