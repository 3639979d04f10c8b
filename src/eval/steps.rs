//! The individual steps of the managed and data pipelines.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::addrs::ConfigResourceAddress;
use crate::error::{ConfigError, PlannerError, ProviderCall, ProviderError, Result, StateError};
use crate::plans::{ActionReason, ChangeAction, DiffStore, ResourceInstanceChange};
use crate::providers::{
    DataSourceRead, PlanResourceChangeRequest, ReadDataSourceRequest, ReadResourceRequest,
    ReadResourceResponse,
};
use crate::state::{ObjectStatus, Projection, ResourceInstanceObject};

use super::context::EvalContext;
use super::pipeline::Operation;

/// Fails if a stored object was written by a newer provider schema.
fn check_schema_version(
    ctx: &EvalContext<'_>,
    step: &'static str,
    object: Option<&ResourceInstanceObject>,
) -> Result<()> {
    let Some(object) = object else {
        return Ok(());
    };
    let supported = ctx.resource_schema(step)?.version;
    if object.schema_version > supported {
        return Err(StateError::NewerSchemaVersion {
            address: ctx.address().to_string(),
            stored: object.schema_version,
            supported,
        }
        .into());
    }
    Ok(())
}

// ============================================================================
// GetProvider
// ============================================================================

/// Resolves the provider handle and schema for the instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProvider;

#[async_trait]
impl Operation for GetProvider {
    fn name(&self) -> &'static str {
        "GetProvider"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let provider = &ctx.config().provider;
        let resolved = ctx
            .collaborators()
            .resolver
            .resolve(provider)
            .await
            .map_err(|e| PlannerError::UnresolvedProvider {
                address: ctx.address().to_string(),
                provider: provider.to_string(),
                message: e.to_string(),
            })?;

        ctx.provider.fill(self.name(), resolved)?;
        ctx.resource_schema(self.name())?;
        Ok(())
    }
}

// ============================================================================
// ValidateSelfRef
// ============================================================================

/// Rejects configurations that refer to their own instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateSelfRef;

#[async_trait]
impl Operation for ValidateSelfRef {
    fn name(&self) -> &'static str {
        "ValidateSelfRef"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let address = ctx.address();
        let config = ctx.config();

        let reference = config
            .references
            .iter()
            .find(|r| r.targets(address))
            .map(ToString::to_string)
            .or_else(|| {
                let own = address.config_resource();
                config
                    .depends_on
                    .iter()
                    .find(|d| d.resolve_in(&own.module) == own)
                    .map(|d| format!("depends_on {d}"))
            });

        match reference {
            Some(reference) => Err(ConfigError::SelfReference {
                address: address.to_string(),
                reference,
            }
            .into()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// ReadState
// ============================================================================

/// Loads the prior object from the refresh projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadState;

#[async_trait]
impl Operation for ReadState {
    fn name(&self) -> &'static str {
        "ReadState"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let prior = ctx
            .collaborators()
            .state
            .get(ctx.address(), Projection::Refresh)
            .await?;
        check_schema_version(ctx, self.name(), prior.as_ref())?;

        if prior.is_none() {
            debug!("{}: no prior object", ctx.address());
        }
        ctx.refresh_state.fill(self.name(), prior)?;
        Ok(())
    }
}

// ============================================================================
// RefreshLifecycleGuard
// ============================================================================

/// Records the effective create-before-destroy policy on the prior object.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshLifecycleGuard;

#[async_trait]
impl Operation for RefreshLifecycleGuard {
    fn name(&self) -> &'static str {
        "RefreshLifecycleGuard"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let create_before_destroy = ctx.create_before_destroy();
        let removed = ctx.config().removed;

        let prior = ctx.refresh_state.get_mut(self.name())?;
        if removed {
            return Ok(());
        }
        if let Some(object) = prior.as_mut() {
            object.create_before_destroy = create_before_destroy;
        }
        Ok(())
    }
}

// ============================================================================
// Refresh
// ============================================================================

/// Reads the live object and replaces the prior object with it.
///
/// An absent prior object is not refreshed. A live object that no longer
/// exists makes the refreshed object absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Refresh;

#[async_trait]
impl Operation for Refresh {
    fn name(&self) -> &'static str {
        "Refresh"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let Some(prior) = ctx.refresh_state.get(self.name())?.clone() else {
            debug!("{}: nothing to refresh", ctx.address());
            return Ok(());
        };
        let address = ctx.address().clone();
        let handle = ctx.provider.get(self.name())?.handle.clone();

        let ReadResourceResponse { new_state, private } = handle
            .read_resource(ReadResourceRequest {
                address: address.clone(),
                prior: prior.clone(),
            })
            .await
            .map_err(|e| PlannerError::provider(&address, ProviderCall::ReadResource, e))?;

        let refreshed = match new_state {
            Some(attributes) if !attributes.is_null() => Some(ResourceInstanceObject {
                attributes,
                private,
                ..prior
            }),
            _ => {
                info!("{address} no longer exists");
                None
            }
        };

        *ctx.refresh_state.get_mut(self.name())? = refreshed;
        ctx.mark_live_read();
        Ok(())
    }
}

// ============================================================================
// WriteState
// ============================================================================

/// Which slot a [`WriteState`] step persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    /// The refreshed prior object.
    Refreshed,
    /// The planned object.
    Planned,
}

/// Persists a slot into one projection of the state store.
#[derive(Debug, Clone, Copy)]
pub struct WriteState {
    source: StateSource,
    projection: Projection,
    record_dependencies: bool,
    after_live_read: bool,
}

impl WriteState {
    /// Writes the refreshed object to the refresh projection, only if a
    /// live read happened in this run.
    #[must_use]
    pub const fn refreshed() -> Self {
        Self {
            source: StateSource::Refreshed,
            projection: Projection::Refresh,
            record_dependencies: true,
            after_live_read: true,
        }
    }

    /// Writes the planned object to the given projection.
    #[must_use]
    pub const fn planned(projection: Projection) -> Self {
        Self {
            source: StateSource::Planned,
            projection,
            record_dependencies: false,
            after_live_read: false,
        }
    }

    /// Slot this step reads.
    #[must_use]
    pub const fn source(&self) -> StateSource {
        self.source
    }

    /// Projection this step writes.
    #[must_use]
    pub const fn projection(&self) -> Projection {
        self.projection
    }
}

#[async_trait]
impl Operation for WriteState {
    fn name(&self) -> &'static str {
        match self.projection {
            Projection::Refresh => "WriteState(refresh)",
            Projection::Working => "WriteState(working)",
        }
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        if self.after_live_read && !ctx.live_read_performed() {
            debug!("{}: no live read, leaving {} projection untouched", ctx.address(), self.projection);
            return Ok(());
        }

        let slot = match self.source {
            StateSource::Refreshed => &ctx.refresh_state,
            StateSource::Planned => &ctx.planned_state,
        };
        let mut object = slot.get(self.name())?.clone();

        if let Some(object) = object.as_mut() {
            object.schema_version = ctx.resource_schema(self.name())?.version;
            if self.record_dependencies {
                object.dependencies = ctx.config().dependencies(ctx.address());
            }
        }

        debug!(
            "{}: writing {} projection ({})",
            ctx.address(),
            self.projection,
            if object.is_some() { "present" } else { "absent" }
        );
        ctx.collaborators()
            .state
            .put(ctx.address(), self.projection, object)
            .await
    }
}

// ============================================================================
// Diff
// ============================================================================

/// Computes the change and the planned object for a managed instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diff;

impl Diff {
    fn delete_or_noop(
        ctx: &EvalContext<'_>,
        step: &'static str,
        prior: Option<ResourceInstanceObject>,
    ) -> Result<ResourceInstanceChange> {
        let provider = ctx.provider.get(step)?.reference.clone();
        let (action, reason) = if prior.is_some() {
            (ChangeAction::Delete, ActionReason::DeleteBecauseNoResourceConfig)
        } else {
            (ChangeAction::NoOp, ActionReason::None)
        };

        let mut change = ResourceInstanceChange::new(
            ctx.address().clone(),
            provider,
            action,
            prior.map(|p| p.attributes),
            None,
        )
        .with_reason(reason);
        change.create_before_destroy = ctx.create_before_destroy();
        Ok(change)
    }
}

#[async_trait]
impl Operation for Diff {
    fn name(&self) -> &'static str {
        "Diff"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let step = self.name();
        let address = ctx.address().clone();
        let config = ctx.config();

        let prior = if ctx.skip_refresh() {
            let stored = ctx.collaborators().state.get(&address, Projection::Refresh).await?;
            check_schema_version(ctx, step, stored.as_ref())?;
            stored
        } else {
            ctx.refresh_state.get(step)?.clone()
        };

        if config.removed {
            let change = Self::delete_or_noop(ctx, step, prior)?;
            debug!("{address}: {}", change.action);
            ctx.planned_state.fill(step, None)?;
            ctx.change.fill(step, change)?;
            return Ok(());
        }

        let create_before_destroy = ctx.create_before_destroy();
        let schema_version = ctx.resource_schema(step)?.version;
        let resolved = ctx.provider.get(step)?;
        let provider = resolved.reference.clone();

        let response = resolved
            .handle
            .plan_resource_change(PlanResourceChangeRequest {
                address: address.clone(),
                prior: prior.clone(),
                proposed: config.attributes.clone(),
                unknown: config.unknown.clone(),
                create_before_destroy,
            })
            .await
            .map_err(|e| PlannerError::provider(&address, ProviderCall::PlanResourceChange, e))?;

        if !response.planned.is_object() {
            return Err(PlannerError::provider(
                &address,
                ProviderCall::PlanResourceChange,
                ProviderError::invalid_response("planned value is not an object"),
            ));
        }

        let (action, reason) = match &prior {
            None => (ChangeAction::Create, ActionReason::None),
            Some(p) if p.is_tainted() => {
                (ChangeAction::replace(create_before_destroy), ActionReason::ReplaceBecauseTainted)
            }
            Some(_) if !response.requires_replace.is_empty() => (
                ChangeAction::replace(create_before_destroy),
                ActionReason::ReplaceBecauseCannotUpdate,
            ),
            Some(p) if p.attributes == response.planned && response.unknown.is_empty() => {
                (ChangeAction::NoOp, ActionReason::None)
            }
            Some(_) => (ChangeAction::Update, ActionReason::None),
        };
        debug!("{address}: {action}");

        let planned = match (&prior, action) {
            (Some(p), ChangeAction::NoOp) => p.clone(),
            _ => ResourceInstanceObject {
                attributes: response.planned.clone(),
                status: ObjectStatus::Planned,
                schema_version,
                private: response.private.clone(),
                dependencies: config.dependencies(&address),
                create_before_destroy,
            },
        };

        let change = ResourceInstanceChange {
            after_unknown: response.unknown,
            requires_replace: response.requires_replace,
            create_before_destroy,
            private: response.private,
            ..ResourceInstanceChange::new(
                address,
                provider,
                action,
                prior.map(|p| p.attributes),
                Some(response.planned),
            )
            .with_reason(reason)
        };

        ctx.planned_state.fill(step, Some(planned))?;
        ctx.change.fill(step, change)?;
        Ok(())
    }
}

// ============================================================================
// CheckPreventDestroy
// ============================================================================

/// Fails the run if the change destroys a protected instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckPreventDestroy;

#[async_trait]
impl Operation for CheckPreventDestroy {
    fn name(&self) -> &'static str {
        "CheckPreventDestroy"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let action = ctx.change.get(self.name())?.action;
        if action.is_destroy() && ctx.config().lifecycle.prevent_destroy {
            return Err(ConfigError::PreventDestroy {
                address: ctx.address().to_string(),
                action: action.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// WriteDiff
// ============================================================================

/// Records the computed change in the diff store.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteDiff;

#[async_trait]
impl Operation for WriteDiff {
    fn name(&self) -> &'static str {
        "WriteDiff"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let change = ctx.change.get(self.name())?.clone();
        ctx.collaborators().diffs.put(ctx.address(), change).await
    }
}

// ============================================================================
// ReadDataPlan
// ============================================================================

/// Reads a data source now, or defers the read to apply time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadDataPlan;

impl ReadDataPlan {
    async fn dependency_pending(diffs: &dyn DiffStore, depends_on: &[ConfigResourceAddress]) -> Result<bool> {
        for dependency in depends_on {
            if diffs.has_pending_change(dependency).await? {
                debug!("{dependency} has pending changes");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl Operation for ReadDataPlan {
    fn name(&self) -> &'static str {
        "ReadDataPlan"
    }

    async fn execute(&self, ctx: &mut EvalContext<'_>) -> Result<()> {
        let step = self.name();
        let address = ctx.address().clone();
        let config = ctx.config();
        // a placeholder left by an earlier deferred read is not a result
        let prior = ctx
            .refresh_state
            .get(step)?
            .clone()
            .filter(|p| p.status != ObjectStatus::Planned);
        let schema = ctx.resource_schema(step)?;
        let schema_version = schema.version;
        let resolved = ctx.provider.get(step)?;
        let provider = resolved.reference.clone();

        let depends_on = config.resolved_depends_on(&address);
        let mut deferred = if !config.is_wholly_known() {
            Some(ActionReason::ReadBecauseConfigUnknown)
        } else if prior.is_none()
            && Self::dependency_pending(ctx.collaborators().diffs, &depends_on).await?
        {
            Some(ActionReason::ReadBecauseDependencyPending)
        } else {
            None
        };

        let mut result = None;
        if deferred.is_none() {
            let read = resolved
                .handle
                .read_data_source(ReadDataSourceRequest {
                    address: address.clone(),
                    config: config.attributes.clone(),
                    dependencies: depends_on,
                })
                .await
                .map_err(|e| PlannerError::provider(&address, ProviderCall::ReadDataSource, e))?;

            match read {
                DataSourceRead::Deferred => deferred = Some(ActionReason::ReadBecauseProviderDeferred),
                DataSourceRead::Ready(Value::Null) => {
                    return Err(PlannerError::provider(
                        &address,
                        ProviderCall::ReadDataSource,
                        ProviderError::invalid_response("data source returned a null object"),
                    ));
                }
                DataSourceRead::Ready(value) => result = Some(value),
            }
        }

        let dependencies = config.dependencies(&address);
        let before = prior.map(|p| p.attributes);

        let (object, change) = match (deferred, result) {
            (None, Some(value)) => {
                debug!("{address}: read completed");
                let object = ResourceInstanceObject {
                    dependencies,
                    ..ResourceInstanceObject::new(value.clone()).with_schema_version(schema_version)
                };
                let change =
                    ResourceInstanceChange::new(address, provider, ChangeAction::NoOp, before, Some(value));
                (object, change)
            }
            (reason, _) => {
                let reason = reason.unwrap_or(ActionReason::ReadBecauseProviderDeferred);
                info!("{address}: read deferred to apply ({reason})");

                let proposed = config.attributes_value();
                let object = ResourceInstanceObject {
                    dependencies,
                    ..ResourceInstanceObject::new(proposed.clone())
                        .with_status(ObjectStatus::Planned)
                        .with_schema_version(schema_version)
                };
                let mut after_unknown = config.unknown.clone();
                after_unknown.extend(
                    schema
                        .computed_attributes()
                        .filter(|name| !config.attributes.contains_key(*name))
                        .map(String::from),
                );
                let change = ResourceInstanceChange {
                    after_unknown,
                    ..ResourceInstanceChange::new(address, provider, ChangeAction::Read, before, Some(proposed))
                        .with_reason(reason)
                };
                (object, change)
            }
        };

        ctx.planned_state.fill(step, Some(object))?;
        ctx.change.fill(step, change)?;
        Ok(())
    }
}
