//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::addrs::ResourceMode;
use crate::config::ValidationResult;
use crate::plans::{ChangeAction, ChangeSet, ResourceInstanceChange};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Instance")]
    address: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a change set for display.
    #[must_use]
    pub fn format_change_set(&self, changes: &ChangeSet, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ChangeSetJson::from(changes))
                .unwrap_or_default(),
            OutputFormat::Text => Self::format_change_set_text(changes, detailed),
        }
    }

    /// Formats a change set as text.
    fn format_change_set_text(changes: &ChangeSet, detailed: bool) -> String {
        if !changes.has_changes() {
            return format!(
                "{} No changes. Infrastructure matches the configuration.\n",
                "✓".green()
            );
        }

        let mut output = String::from("\nPlanned changes\n\n");

        let actionable = changes.actionable();
        let rows: Vec<ChangeRow> = actionable
            .iter()
            .enumerate()
            .map(|(i, c)| ChangeRow {
                index: i + 1,
                action: Self::format_action(c.action),
                address: c.address.to_string(),
                provider: c.provider.as_str().to_string(),
                reason: Self::truncate(&c.reason.to_string(), 48),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            output.push_str("\nDetails:\n");
            for change in &actionable {
                Self::write_details(&mut output, change);
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} to add, {} to change, {} to replace, {} to destroy",
            changes.create_count().to_string().green(),
            changes.update_count().to_string().yellow(),
            changes.replace_count().to_string().yellow(),
            changes.delete_count().to_string().red()
        );
        if changes.read_count() > 0 {
            let _ = write!(output, " ({} data reads deferred)", changes.read_count());
        }
        output.push('\n');

        output
    }

    fn write_details(output: &mut String, change: &ResourceInstanceChange) {
        let _ = writeln!(output, "  {} {}", Self::format_action(change.action), change.address);
        let render = |v: Option<&serde_json::Value>| {
            v.map_or_else(|| String::from("(absent)"), ToString::to_string)
        };
        let _ = writeln!(output, "    before: {}", render(change.before.as_ref()));
        let _ = writeln!(output, "    after:  {}", render(change.after.as_ref()));
        if !change.after_unknown.is_empty() {
            let names: Vec<&str> = change.after_unknown.iter().map(String::as_str).collect();
            let _ = writeln!(output, "    known after apply: {}", names.join(", "));
        }
        if !change.requires_replace.is_empty() {
            let _ = writeln!(output, "    forces replacement: {}", change.requires_replace.join(", "));
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Workspace is valid\n", "✓".green())
                } else {
                    format!("{} Workspace has {} errors\n", "✗".red(), result.error_count())
                };
                for error in &result.errors {
                    let _ = writeln!(output, "   - {error}");
                }
                if show_warnings && result.warning_count() > 0 {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats the step list of a pipeline.
    #[must_use]
    pub fn format_pipeline(&self, mode: ResourceMode, steps: &[&'static str]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "mode": mode,
                "steps": steps,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{mode} resource pipeline:\n");
                for (i, step) in steps.iter().enumerate() {
                    let _ = writeln!(output, "  {:>2}. {step}", i + 1);
                }
                output
            }
        }
    }

    /// Formats an action with color.
    fn format_action(action: ChangeAction) -> String {
        match action {
            ChangeAction::Create => "+create".green().to_string(),
            ChangeAction::Update => "~update".yellow().to_string(),
            ChangeAction::Delete => "-delete".red().to_string(),
            ChangeAction::DeleteThenCreate => "-/+replace".red().to_string(),
            ChangeAction::CreateThenDelete => "+/-replace".yellow().to_string(),
            ChangeAction::Read => "<=read".cyan().to_string(),
            ChangeAction::NoOp => "noop".dimmed().to_string(),
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.status_line("success", &"✓".green().to_string(), message)
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        self.status_line("error", &"✗".red().to_string(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.status_line("warning", &"⚠".yellow().to_string(), message)
    }

    fn status_line(&self, status: &str, symbol: &str, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": status, "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{symbol} {message}"),
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct ChangeSetJson<'a> {
    has_changes: bool,
    creates: usize,
    updates: usize,
    replaces: usize,
    deletes: usize,
    deferred_reads: usize,
    changes: &'a [ResourceInstanceChange],
}

impl<'a> From<&'a ChangeSet> for ChangeSetJson<'a> {
    fn from(changes: &'a ChangeSet) -> Self {
        Self {
            has_changes: changes.has_changes(),
            creates: changes.create_count(),
            updates: changes.update_count(),
            replaces: changes.replace_count(),
            deletes: changes.delete_count(),
            deferred_reads: changes.read_count(),
            changes: &changes.changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::ActionReason;
    use crate::providers::ProviderRef;
    use serde_json::json;

    fn change_set() -> ChangeSet {
        let web = ResourceInstanceChange::new(
            "aws_instance.web".parse().expect("parse"),
            ProviderRef::from("aws"),
            ChangeAction::DeleteThenCreate,
            Some(json!({"ami": "a"})),
            Some(json!({"ami": "b"})),
        )
        .with_reason(ActionReason::ReplaceBecauseCannotUpdate);
        let db = ResourceInstanceChange::new(
            "aws_db.main".parse().expect("parse"),
            ProviderRef::from("aws"),
            ChangeAction::NoOp,
            None,
            None,
        );
        ChangeSet::new(vec![db, web])
    }

    #[test]
    fn test_text_lists_only_actionable() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_change_set(&change_set(), true);

        assert!(output.contains("aws_instance.web"));
        assert!(!output.contains("aws_db.main"));
        assert!(output.contains("before: {\"ami\":\"a\"}"));
        assert!(output.contains("Plan: 0 to add, 0 to change, 1 to replace, 0 to destroy"));
    }

    #[test]
    fn test_json_change_set() {
        let output = OutputFormatter::new(OutputFormat::Json).format_change_set(&change_set(), false);
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");

        assert_eq!(value["replaces"], json!(1));
        assert_eq!(value["changes"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["changes"][1]["action"], json!("delete_then_create"));
    }

    #[test]
    fn test_no_changes() {
        colored::control::set_override(false);
        let empty = ChangeSet::default();
        let output = OutputFormatter::new(OutputFormat::Text).format_change_set(&empty, false);
        assert!(output.contains("No changes"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a much longer reason", 10), "a much ...");
    }
}
