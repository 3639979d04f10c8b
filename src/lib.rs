// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Instance Planner
//!
//! Per-instance plan evaluation for declarative infrastructure.
//!
//! ## Overview
//!
//! Given the configuration of one resource instance, its prior state and the
//! provider that manages it, the planner decides what applying the
//! configuration would do:
//!
//! - Refresh the prior object against the live one (unless skipped)
//! - Ask the provider to plan the change and classify it (create, update,
//!   replace, delete, no-op)
//! - Enforce lifecycle guards such as `prevent_destroy`
//! - Record the planned object in the working state and the change in the
//!   diff store
//!
//! Data resources are read during planning when everything they need is
//! known, and deferred to apply time otherwise.
//!
//! ## Architecture
//!
//! Each instance is planned by a **pipeline**: an ordered [`eval::Sequence`]
//! of [`eval::Operation`] steps sharing an [`eval::EvalContext`]. Steps hand
//! values to each other through named slots on the context, and reach the
//! outside world only through three collaborators:
//!
//! 1. **Providers**: [`providers::ProviderResolver`] and [`providers::Provider`]
//! 2. **State**: [`state::StateStore`], with a refresh and a working projection
//! 3. **Diffs**: [`plans::DiffStore`]
//!
//! ## Modules
//!
//! - [`addrs`]: Resource and instance addresses
//! - [`config`]: Resource configuration and workspace files
//! - [`eval`]: Evaluation context, pipeline machinery and steps
//! - [`plans`]: Proposed changes and the diff store
//! - [`providers`]: Provider traits, schemas and an in-memory provider
//! - [`state`]: State storage backends (memory, local file)
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! providers:
//!   aws:
//!     resource_types:
//!       aws_instance:
//!         attributes:
//!           ami: { required: true, force_new: true }
//!           size: {}
//!     live:
//!       aws_instance.web: { ami: ami-1, size: small }
//!
//! resources:
//!   - address: aws_instance.web
//!     provider: aws
//!     attributes: { ami: ami-1, size: large }
//!     lifecycle:
//!       prevent_destroy: true
//!
//! state:
//!   aws_instance.web:
//!     attributes: { ami: ami-1, size: small }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod addrs;
pub mod cli;
pub mod config;
pub mod error;
pub mod eval;
pub mod plans;
pub mod providers;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use addrs::{ConfigResourceAddress, ResourceInstanceAddress, ResourceMode};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{LifecycleFlags, ResourceConfig, Workspace, WorkspaceParser, WorkspaceValidator};
pub use error::{PlannerError, Result};
pub use eval::{EvalContext, InstancePipeline, InstancePlanner, Operation, Sequence};
pub use plans::{ChangeAction, ChangeSet, DiffStore, MemoryDiffStore, ResourceInstanceChange};
pub use providers::{InMemoryProvider, Provider, ProviderRegistry, ProviderResolver};
pub use state::{LocalStateStore, MemoryStateStore, Projection, ResourceInstanceObject, StateStore};
