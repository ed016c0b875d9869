//! Action outcomes surfaced to the view

use crate::model::ExpenseId;

use super::form::FormError;

/// Result of a user action, as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The service accepted the create; the item appears with the next snapshot
    Created { id: Option<ExpenseId> },
    /// The service accepted the delete; the item disappears with the next snapshot
    Deleted { id: ExpenseId },
    /// Input was rejected before any request was issued
    Rejected(FormError),
    /// Nothing to do (e.g. deleting an item that has no id yet)
    Skipped,
    /// The request was issued and failed
    Failed {
        action: &'static str,
        message: String,
    },
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Created { .. } | ActionOutcome::Deleted { .. })
    }

    /// One-line notice for the user
    pub fn notice(&self) -> String {
        match self {
            ActionOutcome::Created { .. } => "Expense created".to_string(),
            ActionOutcome::Deleted { .. } => "Expense deleted".to_string(),
            ActionOutcome::Rejected(e) => format!("Not submitted: {}", e),
            ActionOutcome::Skipped => "Nothing to delete yet".to_string(),
            ActionOutcome::Failed { action, message } => {
                format!("Could not {} expense: {}", action, message)
            }
        }
    }
}
