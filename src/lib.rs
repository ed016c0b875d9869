//! # Expense Tracker
//!
//! A small expense list backed by a hosted, authenticated data service with
//! live updates.
//!
//! ## Features
//!
//! - **Session gate**: nothing is shown until a principal is signed in
//! - **Live list**: every snapshot the service pushes replaces local state
//! - **Create and delete**: issued straight to the service, reflected by the next push
//! - **Outcomes**: failed requests and rejected input are reported, never dropped
//!
//! ## Modules
//!
//! - [`model`]: expense records and their normalized form
//! - [`client`]: the data client seam, hosted and in-process implementations
//! - [`session`]: identity providers and the session gate
//! - [`view`]: list view-model, create form, delete action
//! - [`render`]: declarative render tree
//! - [`app`]: command handling and backend wiring
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use expense_tracker::client::InMemoryExpenseService;
//! use expense_tracker::view::{CreateForm, ExpenseListView};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = InMemoryExpenseService::new();
//!     let client = service.client_for("alice");
//!
//!     // Mount the list; it fills from the live query
//!     let mut view = ExpenseListView::mount(&client).await?;
//!
//!     let mut form = CreateForm::new();
//!     form.set_name("Coffee");
//!     form.set_amount("4.50");
//!     let outcome = form.submit(&client).await;
//!     println!("{}", outcome.notice());
//!
//!     view.drain_updates();
//!     println!("{} expenses", view.len());
//!
//!     view.unmount();
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod logging;
pub mod model;
pub mod render;
pub mod session;
pub mod view;

// Re-export top-level types for convenience
pub use model::{normalize, Expense, ExpenseId, ExpenseRecord, NewExpense, Snapshot};

pub use client::{
    ClientError, ClientResult, ExpenseClient, InMemoryExpenseService, LocalExpenseClient,
    RemoteClientConfig, RemoteExpenseClient, Subscription,
};

pub use session::{
    AuthError, Credentials, HttpIdentityProvider, IdentityProvider, LocalIdentityProvider,
    Principal, SessionGate, SessionState,
};

pub use view::{delete_expense, ActionOutcome, CreateForm, ExpenseListView, FormError};

pub use render::{render, Node, UiAction};

pub use app::{Backend, Command, CommandError, ExpenseApp, Flow};

pub use config::{Config, ConfigError, LoggingConfig, Mode};
