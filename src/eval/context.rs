//! Execution context shared by the steps of one evaluator run.
//!
//! The context is an explicit struct passed by `&mut` from step to step.
//! Intermediate values live in named [`Slot`]s: a step that reads a slot
//! nobody populated gets a [`PipelineError`], never a silent default.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::addrs::ResourceInstanceAddress;
use crate::config::{LifecycleFlags, ResourceConfig};
use crate::error::{PipelineError, PlannerError, Result};
use crate::plans::{DiffStore, ResourceInstanceChange};
use crate::providers::{ProviderResolver, ResolvedProvider, ResourceSchema};
use crate::state::{ResourceInstanceObject, StateStore};

/// A named, write-once output of a pipeline step.
#[derive(Debug)]
pub struct Slot<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> Slot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    /// Returns the slot name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true once a step has populated the slot.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.value.is_some()
    }

    /// Populates the slot.
    ///
    /// # Errors
    ///
    /// Fails if the slot was already populated.
    pub fn fill(&mut self, step: &'static str, value: T) -> std::result::Result<(), PipelineError> {
        if self.value.is_some() {
            return Err(PipelineError::SlotAlreadyPopulated { step, slot: self.name });
        }
        self.value = Some(value);
        Ok(())
    }

    /// Reads the slot.
    ///
    /// # Errors
    ///
    /// Fails if no earlier step populated the slot.
    pub fn get(&self, step: &'static str) -> std::result::Result<&T, PipelineError> {
        self.value
            .as_ref()
            .ok_or(PipelineError::SlotUnpopulated { step, slot: self.name })
    }

    /// Mutably borrows the slot.
    ///
    /// # Errors
    ///
    /// Fails if no earlier step populated the slot.
    pub fn get_mut(&mut self, step: &'static str) -> std::result::Result<&mut T, PipelineError> {
        let name = self.name;
        self.value
            .as_mut()
            .ok_or(PipelineError::SlotUnpopulated { step, slot: name })
    }

    /// Takes the value out of the slot, leaving it empty.
    pub const fn take(&mut self) -> Option<T> {
        self.value.take()
    }
}

/// Collaborators the evaluator borrows for one run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Provider pool.
    pub resolver: &'a dyn ProviderResolver,
    /// State store.
    pub state: &'a dyn StateStore,
    /// Diff store.
    pub diffs: &'a dyn DiffStore,
}

/// Mutable state of one evaluator run.
pub struct EvalContext<'a> {
    run_id: Uuid,
    address: ResourceInstanceAddress,
    config: &'a ResourceConfig,
    flags: LifecycleFlags,
    skip_refresh: bool,
    collaborators: Collaborators<'a>,
    cancel: CancellationToken,
    live_read: bool,

    /// Resolved provider handle and schema.
    pub provider: Slot<ResolvedProvider>,
    /// Prior object, refreshed in place when refresh runs.
    pub refresh_state: Slot<Option<ResourceInstanceObject>>,
    /// Object as it will look after apply.
    pub planned_state: Slot<Option<ResourceInstanceObject>>,
    /// The computed change.
    pub change: Slot<ResourceInstanceChange>,
}

impl<'a> EvalContext<'a> {
    /// Creates a fresh context for one instance.
    #[must_use]
    pub fn new(
        address: ResourceInstanceAddress,
        config: &'a ResourceConfig,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            address,
            config,
            flags: LifecycleFlags::default(),
            skip_refresh: false,
            collaborators,
            cancel: CancellationToken::new(),
            live_read: false,
            provider: Slot::new("provider"),
            refresh_state: Slot::new("refresh_state"),
            planned_state: Slot::new("planned_state"),
            change: Slot::new("change"),
        }
    }

    /// Sets the run-level lifecycle overrides.
    #[must_use]
    pub const fn with_flags(mut self, flags: LifecycleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Skips the refresh branch of the managed pipeline.
    #[must_use]
    pub const fn with_skip_refresh(mut self, skip_refresh: bool) -> Self {
        self.skip_refresh = skip_refresh;
        self
    }

    /// Uses the given cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Identifier of this run, for log correlation.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Address of the instance being planned.
    #[must_use]
    pub const fn address(&self) -> &ResourceInstanceAddress {
        &self.address
    }

    /// Static configuration of the instance.
    #[must_use]
    pub const fn config(&self) -> &'a ResourceConfig {
        self.config
    }

    /// Run-level lifecycle overrides.
    #[must_use]
    pub const fn flags(&self) -> LifecycleFlags {
        self.flags
    }

    /// Whether refresh was explicitly skipped for this run.
    #[must_use]
    pub const fn skip_refresh(&self) -> bool {
        self.skip_refresh
    }

    /// Effective create-before-destroy policy: configured or forced.
    #[must_use]
    pub const fn create_before_destroy(&self) -> bool {
        self.config.lifecycle.create_before_destroy || self.flags.force_create_before_destroy
    }

    /// Borrowed collaborators.
    #[must_use]
    pub const fn collaborators(&self) -> Collaborators<'a> {
        self.collaborators
    }

    /// Returns true once the caller has asked the run to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Records that a live read of the object completed.
    pub const fn mark_live_read(&mut self) {
        self.live_read = true;
    }

    /// Returns true if a live read completed during this run.
    #[must_use]
    pub const fn live_read_performed(&self) -> bool {
        self.live_read
    }

    /// Returns the schema of this instance's resource type.
    ///
    /// # Errors
    ///
    /// Fails if the provider slot is empty or the provider does not
    /// support the resource type.
    pub fn resource_schema(&self, step: &'static str) -> Result<&ResourceSchema> {
        let provider = self.provider.get(step)?;
        let resource = &self.address.resource;
        provider
            .schema
            .schema_for(resource.mode, &resource.type_name)
            .ok_or_else(|| {
                PlannerError::Config(crate::error::ConfigError::UnsupportedResourceType {
                    provider: provider.reference.to_string(),
                    mode: resource.mode.to_string(),
                    type_name: resource.type_name.clone(),
                })
            })
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("run_id", &self.run_id)
            .field("address", &self.address)
            .field("skip_refresh", &self.skip_refresh)
            .field("provider", &self.provider.is_populated())
            .field("refresh_state", &self.refresh_state.is_populated())
            .field("planned_state", &self.planned_state.is_populated())
            .field("change", &self.change.is_populated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_write_once() {
        let mut slot: Slot<u32> = Slot::new("answer");
        assert!(!slot.is_populated());
        slot.fill("First", 42).expect("fill");
        assert_eq!(*slot.get("Reader").expect("get"), 42);

        let err = slot.fill("Second", 7).expect_err("double fill");
        assert!(matches!(err, PipelineError::SlotAlreadyPopulated { step: "Second", slot: "answer" }));
    }

    #[test]
    fn test_slot_read_before_fill() {
        let slot: Slot<u32> = Slot::new("answer");
        let err = slot.get("Reader").expect_err("empty slot");
        assert!(matches!(err, PipelineError::SlotUnpopulated { step: "Reader", slot: "answer" }));
    }

    #[test]
    fn test_slot_get_mut_and_take() {
        let mut slot: Slot<Vec<u32>> = Slot::new("list");
        assert!(slot.get_mut("Writer").is_err());
        slot.fill("Writer", vec![1]).expect("fill");
        slot.get_mut("Writer").expect("get_mut").push(2);
        assert_eq!(slot.take(), Some(vec![1, 2]));
        assert!(!slot.is_populated());
    }
}
