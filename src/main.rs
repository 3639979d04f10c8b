//! iplan CLI entrypoint.
//!
//! This is the main entrypoint for the iplan command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use instance_planner::addrs::{ResourceInstanceAddress, ResourceMode};
use instance_planner::cli::{Cli, Commands, OutputFormatter, PipelineMode};
use instance_planner::config::{
    find_workspace_file, Workspace, WorkspaceParser, WorkspaceValidator,
};
use instance_planner::error::Result;
use instance_planner::eval::{InstancePipeline, InstancePlanner};
use instance_planner::plans::MemoryDiffStore;
use instance_planner::state::{LocalStateStore, MemoryStateStore, StateStore};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.output);

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.workspace.as_ref(), warnings, formatter),
        Commands::Plan {
            skip_refresh,
            force_create_before_destroy,
            state,
            target,
            detailed,
        } => {
            let options = PlanOptions {
                skip_refresh,
                force_create_before_destroy,
                state,
                target,
                detailed,
            };
            cmd_plan(cli.workspace.as_ref(), options, formatter).await
        }
        Commands::Pipeline { mode } => {
            cmd_pipeline(mode, formatter);
            Ok(())
        }
    }
}

/// Resolves the workspace file path.
fn resolve_workspace_path(workspace_path: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = workspace_path {
        return Ok(path.clone());
    }

    let cwd = std::env::current_dir()?;
    find_workspace_file(&cwd)
}

/// Loads the workspace file, the `.env` next to it, and environment overrides.
fn load_workspace(workspace_path: Option<&PathBuf>) -> Result<Workspace> {
    let path = resolve_workspace_path(workspace_path)?;
    let base_path = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = WorkspaceParser::new().with_base_path(&base_path);
    parser.load_dotenv()?;
    parser.load_with_env(&path)
}

/// Validate the workspace.
fn cmd_validate(workspace_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let workspace = load_workspace(workspace_path)?;

    let result = WorkspaceValidator::new().validate(&workspace)?;
    eprintln!("{}", formatter.format_validation(&result, show_warnings));

    Ok(())
}

/// Options for `iplan plan`.
struct PlanOptions {
    skip_refresh: bool,
    force_create_before_destroy: bool,
    state: Option<PathBuf>,
    target: Vec<String>,
    detailed: bool,
}

/// Plan every declared instance.
async fn cmd_plan(workspace_path: Option<&PathBuf>, options: PlanOptions, formatter: &OutputFormatter) -> Result<()> {
    let workspace = load_workspace(workspace_path)?;

    let validation = WorkspaceValidator::new().validate(&workspace)?;
    for warning in &validation.warnings {
        eprintln!("{}", formatter.warning(warning));
    }

    let mut flags = workspace.flags();
    flags.force_create_before_destroy |= options.force_create_before_destroy;
    let skip_refresh = options.skip_refresh || workspace.settings.skip_refresh;

    let targets = options
        .target
        .iter()
        .map(|t| t.parse::<ResourceInstanceAddress>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Persisted state when a path is configured, otherwise the workspace's prior state in memory
    let state_path = options.state.or_else(|| workspace.settings.state_path.clone());
    let local = match &state_path {
        Some(path) => {
            let store = LocalStateStore::open(path).await?;
            for (address, object) in &workspace.state {
                store.seed_missing(address.clone(), object.clone()).await;
            }
            Some(Arc::new(store))
        }
        None => None,
    };
    let state: Arc<dyn StateStore> = match &local {
        Some(store) => Arc::clone(store) as Arc<dyn StateStore>,
        None => Arc::new(MemoryStateStore::from_snapshot(workspace.prior_state())),
    };

    let diffs = Arc::new(MemoryDiffStore::new());
    let planner = InstancePlanner::new(Arc::new(workspace.provider_registry()), state, diffs.clone());

    info!(
        "Planning {} resource instances (refresh: {})",
        workspace.resources.len(),
        if skip_refresh { "skipped" } else { "enabled" }
    );

    // Declaration order: data sources see the changes of resources declared before them
    for declaration in &workspace.resources {
        if !targets.is_empty() && !targets.contains(&declaration.address) {
            debug!("Skipping {} (not targeted)", declaration.address);
            continue;
        }
        planner
            .plan_from_source(&workspace, declaration.address.clone(), flags, skip_refresh)
            .await?;
    }

    let changes = diffs.change_set().await;
    eprintln!("{}", formatter.format_change_set(&changes, options.detailed));

    if let Some(store) = local {
        store.save().await?;
        eprintln!("{}", formatter.success(&format!("State saved to {}", store.path().display())));
    }

    Ok(())
}

/// Show the steps of a pipeline.
fn cmd_pipeline(mode: PipelineMode, formatter: &OutputFormatter) {
    let mode: ResourceMode = mode.into();
    let steps = InstancePipeline::for_mode(mode).step_names();
    eprintln!("{}", formatter.format_pipeline(mode, &steps));
}
