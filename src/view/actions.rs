//! Per-item actions

use super::outcome::ActionOutcome;
use crate::client::ExpenseClient;
use crate::model::Expense;

/// Delete an expense by id
///
/// An expense without an id has not round-tripped through the service yet;
/// deleting it is a no-op and issues no request.
pub async fn delete_expense(client: &dyn ExpenseClient, expense: &Expense) -> ActionOutcome {
    let Some(id) = expense.id.as_ref() else {
        tracing::debug!(name = %expense.name, "Skipping delete of expense without id");
        return ActionOutcome::Skipped;
    };

    match client.delete(id).await {
        Ok(()) => ActionOutcome::Deleted { id: id.clone() },
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "Delete request failed");
            ActionOutcome::Failed {
                action: "delete",
                message: e.to_string(),
            }
        }
    }
}
