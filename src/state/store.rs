//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.
//! Stores are shared by many concurrent instance runs and are responsible
//! for serialising access to the same key.

use async_trait::async_trait;

use crate::addrs::ResourceInstanceAddress;
use crate::error::Result;

use super::types::{Projection, ResourceInstanceObject};

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Gets the object recorded for an instance in a projection.
    ///
    /// Returns `None` if the instance has no object there.
    async fn get(
        &self,
        address: &ResourceInstanceAddress,
        projection: Projection,
    ) -> Result<Option<ResourceInstanceObject>>;

    /// Records an object for an instance in a projection. `None` removes
    /// whatever was recorded.
    async fn put(
        &self,
        address: &ResourceInstanceAddress,
        projection: Projection,
        object: Option<ResourceInstanceObject>,
    ) -> Result<()>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
