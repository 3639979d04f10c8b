//! In-process provider pool.
//!
//! Maps provider references to already-started provider handles. Handles
//! are shared across all instance runs; each run only clones the `Arc`
//! for its own duration.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::ProviderError;

use super::{Provider, ProviderRef, ProviderResolver, ProviderSchema, ResolvedProvider};

/// A fixed set of configured providers.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered providers by reference.
    providers: HashMap<ProviderRef, ResolvedProvider>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under the given reference.
    pub fn register(
        &mut self,
        reference: impl Into<ProviderRef>,
        handle: Arc<dyn Provider>,
        schema: ProviderSchema,
    ) {
        let reference = reference.into();
        debug!("Registering {reference}");
        self.providers.insert(
            reference.clone(),
            ResolvedProvider {
                reference,
                handle,
                schema: Arc::new(schema),
            },
        );
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.providers.keys().map(ProviderRef::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ProviderRegistry").field("providers", &names).finish()
    }
}

#[async_trait]
impl ProviderResolver for ProviderRegistry {
    async fn resolve(&self, provider: &ProviderRef) -> Result<ResolvedProvider, ProviderError> {
        self.providers
            .get(provider)
            .cloned()
            .ok_or_else(|| ProviderError::unreachable(format!("{provider} is not configured")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InMemoryProvider;

    #[tokio::test]
    async fn test_resolve_registered() {
        let mut registry = ProviderRegistry::new();
        let schema = ProviderSchema::default();
        registry.register("aws", Arc::new(InMemoryProvider::new(schema.clone())), schema);

        assert_eq!(registry.len(), 1);
        let resolved = registry.resolve(&ProviderRef::from("aws")).await.expect("resolve");
        assert_eq!(resolved.reference.as_str(), "aws");
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve(&ProviderRef::from("gcp")).await.is_err());
    }
}
