//! Planned changes and their storage.
//!
//! Each instance evaluator run produces exactly one
//! [`ResourceInstanceChange`], recorded in a [`DiffStore`] keyed by the
//! instance address.

mod change;
mod changeset;
mod store;

pub use change::{ActionReason, ChangeAction, ResourceInstanceChange};
pub use changeset::ChangeSet;
pub use store::{DiffStore, MemoryDiffStore};
