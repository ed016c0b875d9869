//! View layer
//!
//! - **ExpenseListView**: local state fed by the live query
//! - **CreateForm**: the create form controller
//! - **delete_expense**: the per-item delete action
//! - **ActionOutcome**: what happened to a user action, for display
//!
//! No action changes local state itself; every visible change comes from the
//! next snapshot.

mod actions;
mod form;
mod list;
mod outcome;

pub use actions::delete_expense;
pub use form::{CreateForm, FormError};
pub use list::ExpenseListView;
pub use outcome::ActionOutcome;
