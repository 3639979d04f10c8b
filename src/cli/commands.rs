//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::addrs::ResourceMode;

/// iplan - Per-instance plan evaluator.
#[derive(Parser, Debug)]
#[command(name = "iplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the workspace file.
    #[arg(short, long, global = true, env = "IPLAN_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the workspace file.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Plan every declared resource instance.
    Plan {
        /// Plan against recorded state without reading live objects.
        #[arg(long)]
        skip_refresh: bool,

        /// Force create-before-destroy ordering for every replacement.
        #[arg(long)]
        force_create_before_destroy: bool,

        /// Load and save state at this path instead of keeping it in memory.
        #[arg(long)]
        state: Option<PathBuf>,

        /// Only plan these instance addresses.
        #[arg(short, long)]
        target: Vec<String>,

        /// Show before/after values for each change.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Show the steps a pipeline runs, in order.
    Pipeline {
        /// Resource mode.
        #[arg(default_value = "managed")]
        mode: PipelineMode,
    },
}

/// Resource mode selector for `iplan pipeline`.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum PipelineMode {
    /// Managed resources.
    #[default]
    Managed,
    /// Data resources.
    Data,
}

impl From<PipelineMode> for ResourceMode {
    fn from(mode: PipelineMode) -> Self {
        match mode {
            PipelineMode::Managed => Self::Managed,
            PipelineMode::Data => Self::Data,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
