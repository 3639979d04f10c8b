//! Summary of the changes recorded during a plan.

use serde::Serialize;

use super::change::{ChangeAction, ResourceInstanceChange};

/// All changes recorded during a plan, in address order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    /// Individual changes.
    pub changes: Vec<ResourceInstanceChange>,
}

impl ChangeSet {
    /// Creates a change set.
    #[must_use]
    pub const fn new(changes: Vec<ResourceInstanceChange>) -> Self {
        Self { changes }
    }

    /// Returns the number of recorded changes, no-ops included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn count(&self, pred: impl Fn(ChangeAction) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c.action)).count()
    }

    /// Returns the number of creates.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.count(|a| a == ChangeAction::Create)
    }

    /// Returns the number of in-place updates.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.count(|a| a == ChangeAction::Update)
    }

    /// Returns the number of replacements, either ordering.
    #[must_use]
    pub fn replace_count(&self) -> usize {
        self.count(ChangeAction::is_replace)
    }

    /// Returns the number of deletes.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.count(|a| a == ChangeAction::Delete)
    }

    /// Returns the number of deferred data reads.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.count(|a| a == ChangeAction::Read)
    }

    /// Returns true if anything other than no-ops was recorded.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != ChangeAction::NoOp)
    }

    /// Returns the changes that require action.
    #[must_use]
    pub fn actionable(&self) -> Vec<&ResourceInstanceChange> {
        self.changes
            .iter()
            .filter(|c| c.action != ChangeAction::NoOp)
            .collect()
    }
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_changes() {
            return write!(f, "No changes. Infrastructure matches the configuration.");
        }

        writeln!(f, "Planned changes:")?;
        for change in self.actionable() {
            writeln!(f, "  {change}")?;
        }
        write!(
            f,
            "Plan: {} to add, {} to change, {} to replace, {} to destroy",
            self.create_count(),
            self.update_count(),
            self.replace_count(),
            self.delete_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderRef;

    fn change(addr: &str, action: ChangeAction) -> ResourceInstanceChange {
        ResourceInstanceChange::new(addr.parse().expect("parse"), ProviderRef::from("aws"), action, None, None)
    }

    #[test]
    fn test_counts() {
        let set = ChangeSet::new(vec![
            change("aws_instance.a", ChangeAction::Create),
            change("aws_instance.b", ChangeAction::CreateThenDelete),
            change("aws_instance.c", ChangeAction::DeleteThenCreate),
            change("aws_instance.d", ChangeAction::NoOp),
            change("data.aws_ami.e", ChangeAction::Read),
        ]);

        assert_eq!(set.create_count(), 1);
        assert_eq!(set.replace_count(), 2);
        assert_eq!(set.delete_count(), 0);
        assert_eq!(set.read_count(), 1);
        assert_eq!(set.actionable().len(), 4);
        assert!(set.to_string().contains("1 to add, 0 to change, 2 to replace, 0 to destroy"));
    }

    #[test]
    fn test_no_changes_display() {
        let set = ChangeSet::new(vec![change("aws_instance.a", ChangeAction::NoOp)]);
        assert!(!set.has_changes());
        assert!(set.to_string().starts_with("No changes"));
    }
}
