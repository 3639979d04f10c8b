//! Proposed changes for individual resource instances.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::addrs::ResourceInstanceAddress;
use crate::providers::ProviderRef;

/// Action a change proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Nothing to do.
    NoOp,
    /// Create a new object.
    Create,
    /// Read a data source at apply time.
    Read,
    /// Update the object in place.
    Update,
    /// Destroy the old object, then create its replacement.
    DeleteThenCreate,
    /// Create the replacement, then destroy the old object.
    CreateThenDelete,
    /// Destroy the object.
    Delete,
}

/// Why a change has the action it has, when that is not self-evident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionReason {
    /// Nothing noteworthy.
    #[default]
    None,
    /// The prior object is tainted.
    ReplaceBecauseTainted,
    /// A changed attribute cannot be updated in place.
    ReplaceBecauseCannotUpdate,
    /// The resource was removed from configuration.
    DeleteBecauseNoResourceConfig,
    /// The data source configuration contains unknown values.
    ReadBecauseConfigUnknown,
    /// A dependency of the data source has pending changes.
    ReadBecauseDependencyPending,
    /// The provider asked to defer the read.
    ReadBecauseProviderDeferred,
}

/// A proposed transition for one resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInstanceChange {
    /// Instance the change applies to.
    pub address: ResourceInstanceAddress,
    /// Provider that will carry out the change.
    pub provider: ProviderRef,
    /// Proposed action.
    pub action: ChangeAction,
    /// Why the action was chosen.
    #[serde(default)]
    pub reason: ActionReason,
    /// Attributes before the change.
    pub before: Option<Value>,
    /// Attributes after the change, as far as they are known.
    pub after: Option<Value>,
    /// Attributes of `after` that are only known once applied.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub after_unknown: BTreeSet<String>,
    /// Attributes that forced replacement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_replace: Vec<String>,
    /// Create-before-destroy policy in effect when the change was planned.
    #[serde(default)]
    pub create_before_destroy: bool,
    /// Provider-private data to carry into apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
}

impl ChangeAction {
    /// Returns the replace action for the given ordering policy.
    #[must_use]
    pub const fn replace(create_before_destroy: bool) -> Self {
        if create_before_destroy {
            Self::CreateThenDelete
        } else {
            Self::DeleteThenCreate
        }
    }

    /// Returns true for either replace ordering.
    #[must_use]
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::DeleteThenCreate | Self::CreateThenDelete)
    }

    /// Returns true if applying the change destroys an existing object.
    #[must_use]
    pub const fn is_destroy(self) -> bool {
        matches!(self, Self::Delete) || self.is_replace()
    }
}

impl ResourceInstanceChange {
    /// Creates a change with no reason, unknowns or private data.
    #[must_use]
    pub fn new(
        address: ResourceInstanceAddress,
        provider: ProviderRef,
        action: ChangeAction,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Self {
        Self {
            address,
            provider,
            action,
            reason: ActionReason::None,
            before,
            after,
            after_unknown: BTreeSet::new(),
            requires_replace: Vec::new(),
            create_before_destroy: false,
            private: None,
        }
    }

    /// Sets the action reason.
    #[must_use]
    pub const fn with_reason(mut self, reason: ActionReason) -> Self {
        self.reason = reason;
        self
    }
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoOp => "no-op",
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::DeleteThenCreate => "replace (delete then create)",
            Self::CreateThenDelete => "replace (create then delete)",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ActionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "",
            Self::ReplaceBecauseTainted => "object is tainted",
            Self::ReplaceBecauseCannotUpdate => "attributes cannot be updated in place",
            Self::DeleteBecauseNoResourceConfig => "removed from configuration",
            Self::ReadBecauseConfigUnknown => "configuration depends on values not yet known",
            Self::ReadBecauseDependencyPending => "a dependency has pending changes",
            Self::ReadBecauseProviderDeferred => "provider deferred the read",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceInstanceChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.address, self.action)?;
        if self.reason != ActionReason::None {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}
