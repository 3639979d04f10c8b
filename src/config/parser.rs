//! Workspace parser for loading workspace files.
//!
//! This module handles loading workspaces from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, PlannerError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::workspace::Workspace;

/// Environment variable overriding `settings.skip_refresh`.
pub const ENV_SKIP_REFRESH: &str = "IPLAN_SKIP_REFRESH";

/// Environment variable overriding `settings.force_create_before_destroy`.
pub const ENV_FORCE_CBD: &str = "IPLAN_FORCE_CBD";

/// Environment variable overriding `settings.state_path`.
pub const ENV_STATE_PATH: &str = "IPLAN_STATE_PATH";

/// Parser for workspace files.
#[derive(Debug, Default)]
pub struct WorkspaceParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl WorkspaceParser {
    /// Creates a new workspace parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a workspace from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Workspace> {
        let path = path.as_ref();
        info!("Loading workspace from: {}", path.display());

        if !path.exists() {
            return Err(PlannerError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PlannerError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a workspace from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Workspace> {
        debug!("Parsing YAML workspace");

        let mut workspace: Workspace = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            PlannerError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        if let (Some(base), Some(state_path)) = (&self.base_path, &workspace.settings.state_path) {
            if state_path.is_relative() {
                workspace.settings.state_path = Some(base.join(state_path));
            }
        }

        debug!(
            "Parsed workspace with {} resources and {} providers",
            workspace.resources.len(),
            workspace.providers.len()
        );
        Ok(workspace)
    }

    /// Loads a workspace with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// override holds something other than a boolean.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Workspace> {
        let mut workspace = self.load_file(path)?;
        Self::apply_env_overrides(&mut workspace)?;
        Ok(workspace)
    }

    /// Applies environment variable overrides to the workspace settings.
    fn apply_env_overrides(workspace: &mut Workspace) -> Result<()> {
        if let Ok(value) = std::env::var(ENV_SKIP_REFRESH) {
            debug!("Overriding settings.skip_refresh from environment");
            workspace.settings.skip_refresh = parse_bool(ENV_SKIP_REFRESH, &value)?;
        }

        if let Ok(value) = std::env::var(ENV_FORCE_CBD) {
            debug!("Overriding settings.force_create_before_destroy from environment");
            workspace.settings.force_create_before_destroy = parse_bool(ENV_FORCE_CBD, &value)?;
        }

        if let Ok(path) = std::env::var(ENV_STATE_PATH) {
            debug!("Overriding settings.state_path from environment");
            workspace.settings.state_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                PlannerError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(PlannerError::Config(ConfigError::validation(
            format!("expected a boolean, got '{other}'"),
            name,
        ))),
    }
}

/// Default workspace file names to search for.
pub const DEFAULT_WORKSPACE_FILES: &[&str] = &["iplan.yaml", "iplan.yml", "workspace.yaml"];

/// Finds the workspace file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no workspace file is found.
pub fn find_workspace_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_WORKSPACE_FILES {
            let candidate = current.join(filename);
            if candidate.exists() {
                info!("Found workspace file: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(PlannerError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_WORKSPACE_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addrs::ResourceMode;
    use crate::state::ObjectStatus;
    use tempfile::TempDir;

    const WORKSPACE: &str = r#"
settings:
  force_create_before_destroy: true
  state_path: state/iplan.json

providers:
  aws:
    resource_types:
      aws_instance:
        version: 1
        attributes:
          ami: { required: true, force_new: true }
          size: {}
          id: { computed: true }
    data_sources:
      aws_ami:
        attributes:
          name: { required: true }
    live:
      aws_instance.web: { ami: ami-1, size: small, id: i-1 }
    data:
      data.aws_ami.ubuntu: { name: ubuntu }

resources:
  - address: data.aws_ami.ubuntu
    provider: aws
    attributes:
      name: ubuntu
  - address: aws_instance.web
    provider: aws
    attributes:
      ami: ami-1
      size: large
    lifecycle:
      prevent_destroy: true
    depends_on: [aws_security_group.web]

state:
  aws_instance.web:
    attributes: { ami: ami-1, size: small, id: i-1 }
    schema_version: 1
    status: tainted
"#;

    #[test]
    fn test_parse_workspace() {
        let workspace = WorkspaceParser::new().parse_yaml(WORKSPACE, None).expect("parse");

        assert!(workspace.settings.force_create_before_destroy);
        assert!(!workspace.settings.skip_refresh);
        assert!(workspace.flags().force_create_before_destroy);

        assert_eq!(workspace.resources.len(), 2);
        assert_eq!(workspace.resources[0].address.mode(), ResourceMode::Data);

        let web = &workspace.resources[1];
        assert_eq!(web.address.to_string(), "aws_instance.web");
        assert!(web.config.lifecycle.prevent_destroy);
        assert_eq!(web.config.depends_on.len(), 1);

        let aws = &workspace.providers["aws"];
        assert!(aws.schema.resource_types["aws_instance"].attributes["ami"].force_new);
        assert_eq!(aws.live.len(), 1);

        let prior = workspace.prior_state();
        let object = &prior.refresh[&web.address];
        assert_eq!(object.status, ObjectStatus::Tainted);
        assert_eq!(prior.working[&web.address], *object);
    }

    #[test]
    fn test_base_path_resolves_state_path() {
        let workspace = WorkspaceParser::new()
            .with_base_path("/srv/infra")
            .parse_yaml(WORKSPACE, None)
            .expect("parse");
        assert_eq!(
            workspace.settings.state_path,
            Some(PathBuf::from("/srv/infra/state/iplan.json"))
        );
    }

    #[test]
    fn test_parse_invalid_address() {
        let yaml = "resources:\n  - address: not-an-address\n    provider: aws\n";
        let err = WorkspaceParser::new().parse_yaml(yaml, None).expect_err("must fail");
        assert!(matches!(err, PlannerError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = WorkspaceParser::new()
            .load_file(temp_dir.path().join("iplan.yaml"))
            .expect_err("missing");
        assert!(matches!(err, PlannerError::Config(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_find_workspace_in_parent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("iplan.yaml"), WORKSPACE).expect("write");
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");

        let found = find_workspace_file(&nested).expect("found");
        assert_eq!(found, temp_dir.path().join("iplan.yaml"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool(ENV_SKIP_REFRESH, "TRUE").expect("bool"));
        assert!(parse_bool(ENV_SKIP_REFRESH, "1").expect("bool"));
        assert!(!parse_bool(ENV_SKIP_REFRESH, "off").expect("bool"));
        assert!(parse_bool(ENV_SKIP_REFRESH, "maybe").is_err());
    }
}
