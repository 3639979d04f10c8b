//! Desired-state declaration of a single resource.
//!
//! A [`ResourceConfig`] is owned by whoever loaded the configuration; the
//! evaluator only ever holds a shared reference to it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::addrs::{ConfigResourceAddress, Reference, ResourceInstanceAddress};
use crate::providers::ProviderRef;

/// Lifecycle block of a resource.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lifecycle {
    /// Replace by creating the new object before destroying the old one.
    #[serde(default)]
    pub create_before_destroy: bool,
    /// Refuse any plan that would destroy this resource.
    #[serde(default)]
    pub prevent_destroy: bool,
}

/// Run-level lifecycle overrides supplied by the graph walker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleFlags {
    /// Force create-before-destroy ordering for replacements, typically
    /// because a dependent resource uses create-before-destroy.
    pub force_create_before_destroy: bool,
}

/// Desired-state declaration for one resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceConfig {
    /// Provider configuration that manages this resource.
    pub provider: ProviderRef,
    /// Desired attribute values.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Attributes whose values are not known until apply time.
    #[serde(default)]
    pub unknown: BTreeSet<String>,
    /// Lifecycle block.
    #[serde(default)]
    pub lifecycle: Lifecycle,
    /// Explicit dependencies, relative to the resource's module.
    #[serde(default)]
    pub depends_on: Vec<ConfigResourceAddress>,
    /// References to other resources found in attribute expressions.
    #[serde(default)]
    pub references: Vec<Reference>,
    /// The resource has been removed from configuration and should be destroyed.
    #[serde(default)]
    pub removed: bool,
}

impl ResourceConfig {
    /// Creates an empty configuration managed by the given provider.
    #[must_use]
    pub fn new(provider: impl Into<ProviderRef>) -> Self {
        Self {
            provider: provider.into(),
            attributes: Map::new(),
            unknown: BTreeSet::new(),
            lifecycle: Lifecycle::default(),
            depends_on: Vec::new(),
            references: Vec::new(),
            removed: false,
        }
    }

    /// Sets an attribute value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Marks an attribute as unknown until apply.
    #[must_use]
    pub fn with_unknown(mut self, name: impl Into<String>) -> Self {
        self.unknown.insert(name.into());
        self
    }

    /// Sets the lifecycle block.
    #[must_use]
    pub const fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Adds an explicit dependency.
    #[must_use]
    pub fn with_depends_on(mut self, dependency: ConfigResourceAddress) -> Self {
        self.depends_on.push(dependency);
        self
    }

    /// Adds an expression reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Marks the resource as removed from configuration.
    #[must_use]
    pub const fn removed(mut self) -> Self {
        self.removed = true;
        self
    }

    /// Returns the desired attributes as an object value.
    #[must_use]
    pub fn attributes_value(&self) -> Value {
        Value::Object(self.attributes.clone())
    }

    /// Returns true if every configured attribute is known.
    #[must_use]
    pub fn is_wholly_known(&self) -> bool {
        self.unknown.is_empty()
    }

    /// Returns the explicit `depends_on` entries of the instance at `addr`.
    /// Entries are written relative to the instance's module.
    #[must_use]
    pub fn resolved_depends_on(&self, addr: &ResourceInstanceAddress) -> Vec<ConfigResourceAddress> {
        let module = addr.module_path();
        self.depends_on.iter().map(|d| d.resolve_in(&module)).collect()
    }

    /// Returns the resources this instance depends on, sorted and
    /// deduplicated: explicit `depends_on` plus expression references,
    /// resolved within the module of `addr`.
    #[must_use]
    pub fn dependencies(&self, addr: &ResourceInstanceAddress) -> Vec<ConfigResourceAddress> {
        let module = addr.module_path();

        let mut deps: BTreeSet<ConfigResourceAddress> = self.resolved_depends_on(addr).into_iter().collect();
        deps.extend(self.references.iter().map(|r| ConfigResourceAddress {
            module: module.clone(),
            resource: r.resource.clone(),
        }));
        deps.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_merge_and_dedupe() {
        let addr: ResourceInstanceAddress = "module.app.aws_instance.web[0]".parse().expect("parse");
        let config = ResourceConfig::new("aws")
            .with_depends_on("aws_subnet.main".parse().expect("parse"))
            .with_depends_on("module.db.aws_db.main".parse().expect("parse"))
            .with_reference("aws_subnet.main".parse().expect("parse"))
            .with_reference("aws_security_group.web[\"a\"]".parse().expect("parse"));

        let deps: Vec<String> = config.dependencies(&addr).iter().map(ToString::to_string).collect();
        assert_eq!(
            deps,
            vec![
                String::from("module.app.aws_security_group.web"),
                String::from("module.app.aws_subnet.main"),
                String::from("module.app.module.db.aws_db.main"),
            ]
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let yaml = "provider: aws\nattributes:\n  ami: ami-123\n";
        let config: ResourceConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.provider.as_str(), "aws");
        assert!(!config.lifecycle.prevent_destroy);
        assert!(!config.removed);
        assert!(config.is_wholly_known());
        assert_eq!(config.attributes.get("ami"), Some(&Value::from("ami-123")));
    }
}
