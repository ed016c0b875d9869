//! Data Client
//!
//! Typed access to the remote "Expense" collection.
//!
//! ## Architecture
//!
//! - **ExpenseClient**: the capability the view depends on (create, delete, live query)
//! - **Subscription**: handle to one live query, released exactly once
//! - **RemoteExpenseClient**: hosted service over HTTP + WebSocket
//! - **InMemoryExpenseService**: in-process service for offline use and tests
//!
//! The client is constructed once per signed-in principal and passed to the
//! view explicitly; there is no process-wide handle.

mod error;
mod memory;
mod messages;
mod remote;
mod subscription;

pub use error::{ClientError, ClientResult};
pub use memory::{InMemoryExpenseService, LocalExpenseClient, ServiceStats};
pub use messages::{ClientMessage, ServerMessage};
pub use remote::{RemoteClientConfig, RemoteExpenseClient};
pub use subscription::Subscription;

use async_trait::async_trait;

use crate::model::{ExpenseId, ExpenseRecord, NewExpense};

/// Access to the expense collection of the current principal
#[async_trait]
pub trait ExpenseClient: Send + Sync {
    /// Open a live query over all expenses visible to the principal
    ///
    /// Every item of the returned subscription is a complete listing.
    async fn observe_query(&self) -> ClientResult<Subscription>;

    /// Create an expense; the service assigns id and owner
    async fn create(&self, expense: NewExpense) -> ClientResult<ExpenseRecord>;

    /// Delete an expense by id
    async fn delete(&self, id: &ExpenseId) -> ClientResult<()>;
}
