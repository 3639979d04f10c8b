//! CLI module for the instance planner.
//!
//! This module provides the `iplan` command-line harness that plans every
//! resource of a workspace file.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, PipelineMode};
pub use output::OutputFormatter;
