//! Configuration module for the instance planner.
//!
//! This module handles all configuration-related functionality:
//! - The per-resource desired state the evaluator reads
//! - Parsing and deserializing `iplan.yaml` workspace files
//! - Validation of workspaces before planning

mod parser;
mod resource;
mod source;
mod validator;
mod workspace;

pub use parser::{
    DEFAULT_WORKSPACE_FILES, ENV_FORCE_CBD, ENV_SKIP_REFRESH, ENV_STATE_PATH, WorkspaceParser,
    find_workspace_file,
};
pub use resource::{Lifecycle, LifecycleFlags, ResourceConfig};
pub use source::ConfigSource;
pub use validator::{ValidationError, ValidationResult, WorkspaceValidator};
pub use workspace::{ProviderDefinition, ResourceDeclaration, Workspace, WorkspaceSettings};
