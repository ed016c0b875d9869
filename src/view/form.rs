//! Create form controller
//!
//! Holds the two text inputs of the create form. Blank inputs and amounts that
//! are not finite decimal numbers are rejected before any request goes out,
//! and the form keeps what the user typed. Once a request is issued the form
//! is cleared whatever the outcome.

use thiserror::Error;

use super::outcome::ActionOutcome;
use crate::client::ExpenseClient;
use crate::model::NewExpense;

/// Why a form submission was rejected locally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("expense name is required")]
    MissingName,

    #[error("expense amount is required")]
    MissingAmount,

    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),
}

/// Text inputs of the create form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub name: String,
    pub amount: String,
}

impl CreateForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.amount.is_empty()
    }

    pub fn reset(&mut self) {
        self.name.clear();
        self.amount.clear();
    }

    /// Check the inputs and build the create payload
    pub fn validate(&self) -> Result<NewExpense, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingName);
        }

        let amount_text = self.amount.trim();
        if amount_text.is_empty() {
            return Err(FormError::MissingAmount);
        }

        let amount = parse_amount(amount_text)
            .ok_or_else(|| FormError::InvalidAmount(amount_text.to_string()))?;

        Ok(NewExpense::new(name, amount))
    }

    /// Submit the form: validate, issue one create, clear
    pub async fn submit(&mut self, client: &dyn ExpenseClient) -> ActionOutcome {
        let expense = match self.validate() {
            Ok(expense) => expense,
            Err(e) => {
                tracing::debug!(error = %e, "Create form rejected");
                return ActionOutcome::Rejected(e);
            }
        };

        tracing::debug!(name = %expense.name, amount = expense.amount, "Submitting expense");
        let result = client.create(expense).await;
        self.reset();

        match result {
            Ok(record) => ActionOutcome::Created { id: record.id },
            Err(e) => {
                tracing::warn!(error = %e, "Create request failed");
                ActionOutcome::Failed {
                    action: "create",
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Parse a decimal amount, rejecting `NaN`, infinities and trailing junk
fn parse_amount(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryExpenseService;

    fn filled(name: &str, amount: &str) -> CreateForm {
        CreateForm {
            name: name.to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn test_validate_parses_amount() {
        let expense = filled(" Coffee ", "4.50").validate().unwrap();
        assert_eq!(expense, NewExpense::new("Coffee", 4.5));

        let expense = filled("Refund", "-12").validate().unwrap();
        assert_eq!(expense.amount, -12.0);
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        assert_eq!(filled("  ", "1").validate(), Err(FormError::MissingName));
        assert_eq!(filled("Tea", " ").validate(), Err(FormError::MissingAmount));
    }

    #[test]
    fn test_validate_rejects_non_numeric_amounts() {
        for bad in ["abc", "NaN", "inf", "4.50abc", "1,5"] {
            assert_eq!(
                filled("Tea", bad).validate(),
                Err(FormError::InvalidAmount(bad.to_string())),
                "amount {:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_submit_issues_one_create_and_clears() {
        let service = InMemoryExpenseService::new();
        let client = service.client_for("alice");
        let mut form = filled("Coffee", "4.50");

        let outcome = form.submit(&client).await;

        assert!(matches!(outcome, ActionOutcome::Created { id: Some(_) }));
        assert_eq!(service.stats().creates, 1);
        assert!(form.is_empty());

        let items = service.snapshot_for("alice").items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name.as_deref(), Some("Coffee"));
        assert_eq!(items[0].amount, Some(4.5));
    }

    #[tokio::test]
    async fn test_submit_rejects_non_numeric_without_request() {
        let service = InMemoryExpenseService::new();
        let client = service.client_for("alice");
        let mut form = filled("Coffee", "abc");

        let outcome = form.submit(&client).await;

        assert_eq!(
            outcome,
            ActionOutcome::Rejected(FormError::InvalidAmount("abc".to_string()))
        );
        assert_eq!(service.stats().creates, 0);
        // Kept so the user can correct it
        assert_eq!(form, filled("Coffee", "abc"));
    }

    #[tokio::test]
    async fn test_submit_failure_is_surfaced_and_form_cleared() {
        let service = InMemoryExpenseService::new();
        let client = service.client_for("alice");
        service.fail_next_request("backend down");
        let mut form = filled("Coffee", "4.50");

        let outcome = form.submit(&client).await;

        match outcome {
            ActionOutcome::Failed { action, message } => {
                assert_eq!(action, "create");
                assert!(message.contains("backend down"));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert_eq!(service.stats().creates, 1);
        assert!(form.is_empty());
    }
}
