//! Error types for the instance planner.
//!
//! The hierarchy separates configuration mistakes (deterministic, never
//! retried), provider failures (attributable to external infrastructure),
//! state storage failures, and pipeline-internal contract violations that
//! indicate a bug in pipeline assembly rather than anything a user did.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the instance planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A provider call failed while planning an instance.
    #[error("Provider error during {call} for {address}: {source}")]
    Provider {
        /// Instance being planned.
        address: String,
        /// Which provider call failed.
        call: ProviderCall,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },

    /// The provider for an instance could not be resolved.
    #[error("Provider {provider} could not be resolved for {address}: {message}")]
    UnresolvedProvider {
        /// Instance being planned.
        address: String,
        /// Provider reference from configuration.
        provider: String,
        /// Description of the failure.
        message: String,
    },

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Pipeline contract violations.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The run was cancelled between steps.
    #[error("Planning of {address} cancelled before step {step}")]
    Cancelled {
        /// Instance being planned.
        address: String,
        /// Step that was not started.
        step: &'static str,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The workspace file was not found.
    #[error("Workspace file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The workspace file could not be parsed.
    #[error("Failed to parse workspace: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Workspace validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// An address could not be parsed.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending address text.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate resource address: {address}")]
    DuplicateAddress {
        /// The duplicated address.
        address: String,
    },

    /// A resource configuration refers to itself.
    #[error("Self-referential block: configuration for {address} may not refer to itself (via {reference})")]
    SelfReference {
        /// Instance whose configuration refers to itself.
        address: String,
        /// The offending reference.
        reference: String,
    },

    /// The plan would destroy an instance protected by `prevent_destroy`.
    #[error(
        "Instance cannot be destroyed: resource {address} has lifecycle.prevent_destroy set, \
         but the plan calls for this resource to be destroyed ({action}). To continue, either disable \
         lifecycle.prevent_destroy or reduce the scope of the plan"
    )]
    PreventDestroy {
        /// Protected instance.
        address: String,
        /// The destructive action that was planned.
        action: String,
    },

    /// The provider does not support the configured resource type.
    #[error("Provider {provider} does not support {mode} resource type {type_name}")]
    UnsupportedResourceType {
        /// Provider reference.
        provider: String,
        /// Resource mode.
        mode: String,
        /// Resource type name.
        type_name: String,
    },
}

/// Provider plugin failures, as reported by the provider itself.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider plugin could not be reached.
    #[error("provider unreachable: {message}")]
    Unreachable {
        /// Description of the transport failure.
        message: String,
    },

    /// The provider answered with something unusable.
    #[error("invalid provider response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The provider rejected the request.
    #[error("{summary}: {detail}")]
    Diagnostic {
        /// Short summary.
        summary: String,
        /// Longer explanation.
        detail: String,
    },
}

/// The provider call that was in flight when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCall {
    /// Refreshing the current object from the live system.
    ReadResource,
    /// Computing the proposed change.
    PlanResourceChange,
    /// Reading a data source.
    ReadDataSource,
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// The stored object was written by a newer provider schema.
    #[error(
        "State for {address} was written with schema version {stored}, \
         but the provider only supports up to {supported}"
    )]
    NewerSchemaVersion {
        /// Instance whose state is affected.
        address: String,
        /// Version recorded in state.
        stored: u64,
        /// Version the provider reports.
        supported: u64,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Pipeline contract violations. These are bugs in pipeline assembly.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step read a slot that no earlier step populated.
    #[error("step {step} read slot '{slot}' before it was populated")]
    SlotUnpopulated {
        /// Reading step.
        step: &'static str,
        /// Slot name.
        slot: &'static str,
    },

    /// A step populated a slot that was already populated.
    #[error("step {step} populated slot '{slot}' twice")]
    SlotAlreadyPopulated {
        /// Writing step.
        step: &'static str,
        /// Slot name.
        slot: &'static str,
    },
}

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Wraps a provider failure with the address and call that produced it.
    #[must_use]
    pub fn provider(address: impl ToString, call: ProviderCall, source: ProviderError) -> Self {
        Self::Provider {
            address: address.to_string(),
            call,
            source,
        }
    }

    /// Returns true if this error is retryable by whoever owns retry policy.
    ///
    /// The evaluator itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider {
                source: ProviderError::Unreachable { .. },
                ..
            }
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        if self.is_retryable() { Some(5) } else { None }
    }

    /// Returns true if the error describes something the end user should
    /// act on. Pipeline contract violations are bugs.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Pipeline(_))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an invalid address error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

impl ProviderError {
    /// Creates an unreachable error.
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates a corruption error with the given message.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadResource => "refresh (ReadResource)",
            Self::PlanResourceChange => "plan (PlanResourceChange)",
            Self::ReadDataSource => "data read (ReadDataSource)",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_names_call() {
        let err = PlannerError::provider(
            "aws_instance.web",
            ProviderCall::ReadResource,
            ProviderError::unreachable("connection reset"),
        );
        let msg = err.to_string();
        assert!(msg.contains("refresh"));
        assert!(msg.contains("aws_instance.web"));
        assert!(err.is_retryable());
        assert_eq!(err.retry_delay_secs(), Some(5));
    }

    #[test]
    fn test_config_errors_not_retryable() {
        let err = PlannerError::Config(ConfigError::PreventDestroy {
            address: String::from("aws_instance.web"),
            action: String::from("delete"),
        });
        assert!(!err.is_retryable());
        assert!(err.is_user_facing());
        assert!(err.to_string().contains("prevent_destroy"));
    }

    #[test]
    fn test_pipeline_errors_are_not_user_facing() {
        let err = PlannerError::Pipeline(PipelineError::SlotUnpopulated {
            step: "Diff",
            slot: "refresh_state",
        });
        assert!(!err.is_user_facing());
    }
}
