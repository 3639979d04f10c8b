//! Workspace file types.
//!
//! A workspace file (`iplan.yaml`) declares the resources to plan, the
//! schemas of the providers that manage them, the prior state, and the live
//! objects the in-memory providers serve. It is a test harness for the
//! evaluator, not a configuration language.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::addrs::{ConfigResourceAddress, ResourceInstanceAddress};
use crate::providers::{InMemoryProvider, ProviderRegistry, ProviderSchema};
use crate::state::{ResourceInstanceObject, StateSnapshot};

use super::resource::{LifecycleFlags, ResourceConfig};
use super::source::ConfigSource;

/// The root of a workspace file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    /// Run settings.
    #[serde(default)]
    pub settings: WorkspaceSettings,
    /// Providers by reference name.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderDefinition>,
    /// Resources to plan, in declaration order.
    #[serde(default)]
    pub resources: Vec<ResourceDeclaration>,
    /// Prior state objects by instance address.
    #[serde(default)]
    pub state: BTreeMap<ResourceInstanceAddress, ResourceInstanceObject>,
}

/// Run settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceSettings {
    /// Plan against recorded state without reading live objects.
    #[serde(default)]
    pub skip_refresh: bool,
    /// Force create-before-destroy ordering for every replacement.
    #[serde(default)]
    pub force_create_before_destroy: bool,
    /// Where to persist the resulting state snapshot.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

/// A provider: its schema plus the objects it serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderDefinition {
    /// Supported resource types and data sources.
    #[serde(flatten)]
    pub schema: ProviderSchema,
    /// Live managed objects.
    #[serde(default)]
    pub live: BTreeMap<ResourceInstanceAddress, Value>,
    /// Data source results.
    #[serde(default)]
    pub data: BTreeMap<ResourceInstanceAddress, Value>,
    /// Data sources the provider can only read at apply time.
    #[serde(default)]
    pub deferred_data: Vec<ResourceInstanceAddress>,
}

/// One declared resource instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDeclaration {
    /// Instance address.
    pub address: ResourceInstanceAddress,
    /// Its configuration.
    #[serde(flatten)]
    pub config: ResourceConfig,
}

impl Workspace {
    /// Run-level lifecycle overrides from the settings.
    #[must_use]
    pub const fn flags(&self) -> LifecycleFlags {
        LifecycleFlags {
            force_create_before_destroy: self.settings.force_create_before_destroy,
        }
    }

    /// Looks up a declared instance.
    #[must_use]
    pub fn resource(&self, address: &ResourceInstanceAddress) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| r.address == *address)
    }

    /// Builds a provider registry serving the declared live objects.
    #[must_use]
    pub fn provider_registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for (name, definition) in &self.providers {
            registry.register(name.as_str(), Arc::new(definition.in_memory_provider()), definition.schema.clone());
        }
        registry
    }

    /// Builds the prior state snapshot: every object in both projections.
    #[must_use]
    pub fn prior_state(&self) -> StateSnapshot {
        let mut snapshot = StateSnapshot::new();
        for (address, object) in &self.state {
            snapshot.seed(address.clone(), object.clone());
        }
        snapshot
    }
}

impl ProviderDefinition {
    /// Builds an in-memory provider from this definition.
    #[must_use]
    pub fn in_memory_provider(&self) -> InMemoryProvider {
        let mut provider = InMemoryProvider::new(self.schema.clone());
        for (address, value) in &self.live {
            provider = provider.with_live_object(address.clone(), value.clone());
        }
        for (address, value) in &self.data {
            provider = provider.with_data(address.clone(), value.clone());
        }
        for address in &self.deferred_data {
            provider = provider.with_deferred_data(address.clone());
        }
        provider
    }
}

impl ConfigSource for Workspace {
    fn resource_config(&self, resource: &ConfigResourceAddress) -> Option<&ResourceConfig> {
        self.resources
            .iter()
            .find(|r| r.address.config_resource() == *resource)
            .map(|r| &r.config)
    }
}
