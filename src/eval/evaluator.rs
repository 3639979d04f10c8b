//! The instance plan evaluator.
//!
//! Assembles the managed or data pipeline for one resource instance and
//! runs it against a fresh [`EvalContext`].

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::addrs::{ResourceInstanceAddress, ResourceMode};
use crate::config::{ConfigSource, LifecycleFlags, ResourceConfig};
use crate::error::{ConfigError, PipelineError, Result};
use crate::plans::{DiffStore, ResourceInstanceChange};
use crate::providers::ProviderResolver;
use crate::state::{Projection, StateStore};

use super::context::{Collaborators, EvalContext};
use super::pipeline::{Conditional, Operation, Sequence};
use super::steps::{
    CheckPreventDestroy, Diff, GetProvider, ReadDataPlan, ReadState, Refresh,
    RefreshLifecycleGuard, ValidateSelfRef, WriteDiff, WriteState,
};

/// The statically assembled pipeline for one resource mode.
#[derive(Debug)]
pub enum InstancePipeline {
    /// Pipeline for managed resources.
    Managed(Sequence),
    /// Pipeline for data resources.
    Data(Sequence),
}

impl InstancePipeline {
    /// Returns the pipeline for the given mode.
    #[must_use]
    pub fn for_mode(mode: ResourceMode) -> Self {
        match mode {
            ResourceMode::Managed => managed_pipeline(),
            ResourceMode::Data => data_pipeline(),
        }
    }

    /// The underlying sequence.
    #[must_use]
    pub const fn sequence(&self) -> &Sequence {
        match self {
            Self::Managed(seq) | Self::Data(seq) => seq,
        }
    }

    /// Flat list of the steps the pipeline may run, in order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.sequence().step_names()
    }
}

fn refresh_enabled(ctx: &EvalContext<'_>) -> bool {
    !ctx.skip_refresh()
}

/// Builds the managed-resource pipeline.
#[must_use]
pub fn managed_pipeline() -> InstancePipeline {
    let refresh = Sequence::new()
        .then(ReadState)
        .then(RefreshLifecycleGuard)
        .then(Refresh)
        .then(WriteState::refreshed());

    InstancePipeline::Managed(
        Sequence::new()
            .then(GetProvider)
            .then(ValidateSelfRef)
            .then(Conditional::new("RefreshUnlessSkipped", refresh_enabled, refresh))
            .then(Diff)
            .then(CheckPreventDestroy)
            .then(WriteState::planned(Projection::Working))
            .then(WriteDiff),
    )
}

/// Builds the data-resource pipeline.
#[must_use]
pub fn data_pipeline() -> InstancePipeline {
    InstancePipeline::Data(
        Sequence::new()
            .then(GetProvider)
            .then(ReadState)
            .then(ValidateSelfRef)
            .then(ReadDataPlan)
            .then(WriteState::planned(Projection::Refresh))
            .then(WriteState::planned(Projection::Working))
            .then(WriteDiff),
    )
}

/// Plans individual resource instances against shared collaborators.
#[derive(Clone)]
pub struct InstancePlanner {
    resolver: Arc<dyn ProviderResolver>,
    state: Arc<dyn StateStore>,
    diffs: Arc<dyn DiffStore>,
}

impl InstancePlanner {
    /// Creates a planner.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn ProviderResolver>,
        state: Arc<dyn StateStore>,
        diffs: Arc<dyn DiffStore>,
    ) -> Self {
        Self { resolver, state, diffs }
    }

    /// Plans one instance.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step. Nothing is written for
    /// the instance's working projection or diff when a run fails.
    pub async fn plan(
        &self,
        address: ResourceInstanceAddress,
        config: &ResourceConfig,
        flags: LifecycleFlags,
        skip_refresh: bool,
    ) -> Result<ResourceInstanceChange> {
        self.plan_cancellable(address, config, flags, skip_refresh, CancellationToken::new())
            .await
    }

    /// Plans one instance, stopping before the next step once `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step, or
    /// [`crate::error::PlannerError::Cancelled`].
    pub async fn plan_cancellable(
        &self,
        address: ResourceInstanceAddress,
        config: &ResourceConfig,
        flags: LifecycleFlags,
        skip_refresh: bool,
        cancel: CancellationToken,
    ) -> Result<ResourceInstanceChange> {
        let pipeline = InstancePipeline::for_mode(address.mode());
        let collaborators = Collaborators {
            resolver: self.resolver.as_ref(),
            state: self.state.as_ref(),
            diffs: self.diffs.as_ref(),
        };

        let mut ctx = EvalContext::new(address, config, collaborators)
            .with_flags(flags)
            .with_skip_refresh(skip_refresh)
            .with_cancellation(cancel);

        info!(run_id = %ctx.run_id(), "Planning {}", ctx.address());

        if let Err(e) = pipeline.sequence().execute(&mut ctx).await {
            error!(run_id = %ctx.run_id(), "Planning {} failed: {e}", ctx.address());
            return Err(e);
        }

        let change = ctx.change.take().ok_or(PipelineError::SlotUnpopulated {
            step: "InstancePlanner",
            slot: "change",
        })?;
        info!(run_id = %ctx.run_id(), "{change}");
        Ok(change)
    }

    /// Plans one instance, looking its configuration up in `source`.
    ///
    /// # Errors
    ///
    /// Fails if `source` has no configuration for the instance's resource,
    /// otherwise as [`InstancePlanner::plan`].
    pub async fn plan_from_source(
        &self,
        source: &dyn ConfigSource,
        address: ResourceInstanceAddress,
        flags: LifecycleFlags,
        skip_refresh: bool,
    ) -> Result<ResourceInstanceChange> {
        let resource = address.config_resource();
        let config = source.resource_config(&resource).ok_or_else(|| {
            ConfigError::validation(format!("no configuration for {resource}"), resource.to_string())
        })?;
        self.plan(address, config, flags, skip_refresh).await
    }
}

impl std::fmt::Debug for InstancePlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePlanner")
            .field("state", &self.state.backend_type())
            .finish_non_exhaustive()
    }
}
