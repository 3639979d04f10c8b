//! Provider collaborator interfaces.
//!
//! A provider is the out-of-process plugin that knows how to read and plan
//! a specific family of resource types. The evaluator only sees the narrow
//! [`Provider`] and [`ProviderResolver`] traits defined here; the transport
//! behind them is somebody else's concern.

mod memory;
mod registry;
mod schema;

pub use memory::InMemoryProvider;
pub use registry::ProviderRegistry;
pub use schema::{AttributeSchema, ProviderSchema, ResourceSchema};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::addrs::{ConfigResourceAddress, ResourceInstanceAddress};
use crate::error::ProviderError;
use crate::state::ResourceInstanceObject;

/// Reference to a provider configuration, e.g. `aws` or `aws.west`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderRef(String);

impl ProviderRef {
    /// Creates a provider reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider[{}]", self.0)
    }
}

/// Request to read the current value of a managed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResourceRequest {
    /// Instance being refreshed.
    pub address: ResourceInstanceAddress,
    /// Object as last recorded.
    pub prior: ResourceInstanceObject,
}

/// Live value of a managed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResourceResponse {
    /// Current attributes, or `None` if the object no longer exists.
    pub new_state: Option<Value>,
    /// Updated provider-private data.
    pub private: Option<String>,
}

/// Request to plan a change for a managed object.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResourceChangeRequest {
    /// Instance being planned.
    pub address: ResourceInstanceAddress,
    /// Prior object, absent when it does not exist yet.
    pub prior: Option<ResourceInstanceObject>,
    /// Desired attributes from configuration.
    pub proposed: Map<String, Value>,
    /// Configured attributes not known until apply.
    pub unknown: BTreeSet<String>,
    /// Effective create-before-destroy policy.
    pub create_before_destroy: bool,
}

/// Planned value of a managed object.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResourceChangeResponse {
    /// Attributes the object will have after apply.
    pub planned: Value,
    /// Attributes that will only be known after apply.
    pub unknown: BTreeSet<String>,
    /// Attribute paths whose change cannot be made in place.
    pub requires_replace: Vec<String>,
    /// Provider-private data to carry into apply.
    pub private: Option<String>,
}

/// Request to read a data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadDataSourceRequest {
    /// Data instance being read.
    pub address: ResourceInstanceAddress,
    /// Lookup arguments.
    pub config: Map<String, Value>,
    /// Upstream resources the lookup is allowed to wait on.
    pub dependencies: Vec<ConfigResourceAddress>,
}

/// Outcome of a data source read.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceRead {
    /// The lookup cannot be completed until apply.
    Deferred,
    /// The lookup completed with this result.
    Ready(Value),
}

/// A provider plugin.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Reads the live value of a managed object.
    async fn read_resource(
        &self,
        request: ReadResourceRequest,
    ) -> Result<ReadResourceResponse, ProviderError>;

    /// Computes the planned value of a managed object.
    async fn plan_resource_change(
        &self,
        request: PlanResourceChangeRequest,
    ) -> Result<PlanResourceChangeResponse, ProviderError>;

    /// Reads a data source.
    async fn read_data_source(
        &self,
        request: ReadDataSourceRequest,
    ) -> Result<DataSourceRead, ProviderError>;
}

/// A provider handle together with its schema.
#[derive(Clone)]
pub struct ResolvedProvider {
    /// The provider configuration this handle was resolved from.
    pub reference: ProviderRef,
    /// Live connection, shared with other instances.
    pub handle: Arc<dyn Provider>,
    /// Schema reported by the provider.
    pub schema: Arc<ProviderSchema>,
}

impl fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

/// Resolves provider references to live handles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderResolver: Send + Sync {
    /// Resolves a provider reference.
    async fn resolve(&self, provider: &ProviderRef) -> Result<ResolvedProvider, ProviderError>;
}
