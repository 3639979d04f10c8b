//! Provider schemas.
//!
//! A schema describes the attributes of every resource type and data source
//! a provider supports. It is fetched once per provider handle and treated
//! as immutable for the rest of planning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::addrs::ResourceMode;

/// Everything a provider reports about the types it supports.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSchema {
    /// Managed resource types by name.
    #[serde(default)]
    pub resource_types: BTreeMap<String, ResourceSchema>,
    /// Data source types by name.
    #[serde(default)]
    pub data_sources: BTreeMap<String, ResourceSchema>,
}

/// Schema of one resource type or data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceSchema {
    /// Schema version; stamped on every stored object.
    #[serde(default)]
    pub version: u64,
    /// Attributes by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSchema>,
}

/// Schema of a single attribute.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeSchema {
    /// Must be set in configuration.
    #[serde(default)]
    pub required: bool,
    /// Set by the provider; may also be set in configuration.
    #[serde(default)]
    pub computed: bool,
    /// Changing this attribute forces replacement.
    #[serde(default)]
    pub force_new: bool,
}

impl ProviderSchema {
    /// Returns the schema for a resource type in the given mode.
    #[must_use]
    pub fn schema_for(&self, mode: ResourceMode, type_name: &str) -> Option<&ResourceSchema> {
        match mode {
            ResourceMode::Managed => self.resource_types.get(type_name),
            ResourceMode::Data => self.data_sources.get(type_name),
        }
    }
}

impl ResourceSchema {
    /// Checks configured attributes against the schema and returns a list
    /// of problems; empty when the configuration conforms.
    #[must_use]
    pub fn validate_config(&self, attributes: &Map<String, Value>) -> Vec<String> {
        let mut problems = Vec::new();

        for name in attributes.keys() {
            if !self.attributes.contains_key(name) {
                problems.push(format!("unsupported attribute \"{name}\""));
            }
        }

        for (name, attr) in &self.attributes {
            if attr.required && !attributes.contains_key(name) {
                problems.push(format!("missing required attribute \"{name}\""));
            }
        }

        problems
    }

    /// Returns the force-new attributes whose value differs between the
    /// prior and planned objects.
    #[must_use]
    pub fn requires_replace(&self, prior: &Value, planned: &Value) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.force_new)
            .filter(|(name, _)| prior.get(name.as_str()) != planned.get(name.as_str()))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns the names of computed attributes.
    pub fn computed_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.computed)
            .map(|(name, _)| name.as_str())
    }
}
