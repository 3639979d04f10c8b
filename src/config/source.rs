//! Read-only lookup of resource configuration.

use crate::addrs::ConfigResourceAddress;

use super::resource::ResourceConfig;

/// Gives the evaluator read access to static resource configuration.
pub trait ConfigSource: Send + Sync {
    /// Returns the configuration of a resource, if it is declared.
    fn resource_config(&self, resource: &ConfigResourceAddress) -> Option<&ResourceConfig>;
}
