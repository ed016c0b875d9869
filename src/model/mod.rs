//! Expense data model
//!
//! Wire records from the data service and the normalized form the view holds.

mod types;

pub use types::{normalize, Expense, ExpenseId, ExpenseRecord, NewExpense, Snapshot};
