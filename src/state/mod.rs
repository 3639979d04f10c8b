//! State management module.
//!
//! This module provides storage for the recorded state of resource
//! instances. Every instance has two projections: the refresh projection
//! (what the live system most recently looked like) and the working
//! projection (what it will look like once the plan is applied).

mod store;
mod local;
mod memory;
mod types;

pub use store::StateStore;
pub use local::LocalStateStore;
pub use memory::MemoryStateStore;
pub use types::{ObjectStatus, Projection, ResourceInstanceObject, StateSnapshot, STATE_VERSION};
