//! Workspace validation.
//!
//! Catches mistakes that would otherwise surface one instance at a time
//! during planning: duplicate addresses, unknown providers, resource types
//! the provider does not support, and attributes the schema rejects.

use crate::error::{ConfigError, PlannerError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::workspace::{ResourceDeclaration, Workspace};

/// Validator for workspaces.
#[derive(Debug, Default)]
pub struct WorkspaceValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl WorkspaceValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a workspace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateAddress`] if two resources share an
    /// address, otherwise the first validation error found.
    pub fn validate(&self, workspace: &Workspace) -> Result<ValidationResult> {
        Self::check_duplicates(&workspace.resources)?;

        let mut result = ValidationResult::default();

        if workspace.resources.is_empty() {
            result.warnings.push(String::from("No resources declared in workspace"));
        }

        for (i, resource) in workspace.resources.iter().enumerate() {
            Self::validate_resource(workspace, resource, &format!("resources[{i}]"), &mut result);
        }

        Self::validate_state(workspace, &mut result);

        if result.errors.is_empty() {
            debug!("Workspace validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(PlannerError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    fn check_duplicates(resources: &[ResourceDeclaration]) -> Result<()> {
        let mut seen = HashSet::new();
        for resource in resources {
            if !seen.insert(&resource.address) {
                return Err(PlannerError::Config(ConfigError::DuplicateAddress {
                    address: resource.address.to_string(),
                }));
            }
        }
        Ok(())
    }

    /// Validates one resource declaration.
    fn validate_resource(
        workspace: &Workspace,
        resource: &ResourceDeclaration,
        prefix: &str,
        result: &mut ValidationResult,
    ) {
        let address = &resource.address;
        let config = &resource.config;

        let Some(provider) = workspace.providers.get(config.provider.as_str()) else {
            result.errors.push(ValidationError {
                field: format!("{prefix}.provider"),
                message: format!("{address} uses undeclared provider '{}'", config.provider.as_str()),
            });
            return;
        };

        let resource_mode = address.mode();
        let Some(schema) = provider.schema.schema_for(resource_mode, &address.resource.type_name) else {
            result.errors.push(ValidationError {
                field: format!("{prefix}.address"),
                message: ConfigError::UnsupportedResourceType {
                    provider: config.provider.to_string(),
                    mode: resource_mode.to_string(),
                    type_name: address.resource.type_name.clone(),
                }
                .to_string(),
            });
            return;
        };

        if !config.removed {
            for problem in schema.validate_config(&config.attributes) {
                // an attribute that is only known at apply time still counts as set
                if config.unknown.iter().any(|name| problem.contains(&format!("\"{name}\""))) {
                    continue;
                }
                result.errors.push(ValidationError {
                    field: format!("{prefix}.attributes"),
                    message: format!("{address}: {problem}"),
                });
            }
        }

        for name in &config.unknown {
            if config.attributes.contains_key(name) {
                result.warnings.push(format!(
                    "{prefix}.unknown: '{name}' is both set and marked unknown; it will be treated as unknown"
                ));
            }
        }

        for dependency in config.resolved_depends_on(address) {
            let declared = workspace
                .resources
                .iter()
                .any(|r| r.address.config_resource() == dependency);
            if !declared {
                result.warnings.push(format!(
                    "{prefix}.depends_on: {dependency} is not declared in this workspace"
                ));
            }
        }
    }

    /// Flags recorded objects nothing in the workspace will plan.
    fn validate_state(workspace: &Workspace, result: &mut ValidationResult) {
        for address in workspace.state.keys() {
            if workspace.resource(address).is_none() {
                result.warnings.push(format!(
                    "state.{address}: no resource declared for this object; it will be left untouched"
                ));
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspaceParser;

    fn workspace(resources: &str) -> Workspace {
        let yaml = format!(
            r#"
providers:
  aws:
    resource_types:
      aws_instance:
        attributes:
          ami: {{ required: true }}
          size: {{}}
resources:
{resources}
state:
  aws_instance.old:
    attributes: {{ ami: ami-0 }}
"#
        );
        WorkspaceParser::new().parse_yaml(&yaml, None).expect("parse")
    }

    #[test]
    fn test_valid_workspace_with_warnings() {
        let ws = workspace(
            "  - address: aws_instance.web\n    provider: aws\n    attributes: { ami: ami-1 }\n    depends_on: [aws_vpc.main]\n",
        );
        let result = WorkspaceValidator::new().validate(&ws).expect("valid");

        assert!(result.is_valid());
        assert_eq!(result.error_count(), 0);
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn test_depends_on_resolved_within_module() {
        let ws = workspace(
            "  - address: module.net.aws_instance.web\n    provider: aws\n    attributes: { ami: ami-1 }\n    depends_on: [aws_instance.db]\n  - address: module.net.aws_instance.db\n    provider: aws\n    attributes: { ami: ami-2 }\n  - address: aws_instance.api\n    provider: aws\n    attributes: { ami: ami-3 }\n    depends_on: [aws_instance.db]\n",
        );
        let result = WorkspaceValidator::new().validate(&ws).expect("valid");

        // only the root-module dependency dangles; the orphan state entry is the other warning
        assert_eq!(result.warning_count(), 2);
        assert!(result.warnings.iter().any(|w| w.starts_with("resources[2].depends_on: aws_instance.db")));
        assert!(!result.warnings.iter().any(|w| w.starts_with("resources[0].depends_on")));
    }

    #[test]
    fn test_duplicate_address() {
        let ws = workspace(
            "  - address: aws_instance.web\n    provider: aws\n    attributes: { ami: a }\n  - address: aws_instance.web\n    provider: aws\n    attributes: { ami: b }\n",
        );
        let err = WorkspaceValidator::new().validate(&ws).expect_err("duplicate");
        assert!(matches!(err, PlannerError::Config(ConfigError::DuplicateAddress { .. })));
    }

    #[test]
    fn test_unknown_provider() {
        let ws = workspace("  - address: aws_instance.web\n    provider: gcp\n");
        let err = WorkspaceValidator::new().validate(&ws).expect_err("unknown provider");
        assert!(err.to_string().contains("undeclared provider 'gcp'"));
    }

    #[test]
    fn test_unsupported_type() {
        let ws = workspace("  - address: data.aws_instance.web\n    provider: aws\n");
        let err = WorkspaceValidator::new().validate(&ws).expect_err("unsupported");
        assert!(err.to_string().contains("does not support data resource type aws_instance"));
    }

    #[test]
    fn test_missing_required_attribute() {
        let ws = workspace("  - address: aws_instance.web\n    provider: aws\n    attributes: { size: large }\n");
        let err = WorkspaceValidator::new().validate(&ws).expect_err("missing ami");
        assert!(err.to_string().contains("missing required attribute \"ami\""));
    }

    #[test]
    fn test_unknown_attribute_counts_as_set() {
        let ws = workspace("  - address: aws_instance.web\n    provider: aws\n    unknown: [ami]\n");
        assert!(WorkspaceValidator::new().validate(&ws).is_ok());
    }

    #[test]
    fn test_removed_resource_skips_attribute_checks() {
        let ws = workspace("  - address: aws_instance.web\n    provider: aws\n    removed: true\n");
        assert!(WorkspaceValidator::new().validate(&ws).is_ok());
    }
}
