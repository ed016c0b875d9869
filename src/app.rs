//! Application wiring
//!
//! Ties one signed-in principal's data client to the view, the create form and
//! the render tree, and turns terminal commands into actions. Everything runs
//! on one task; the only concurrent input is the live query.

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::client::{
    ClientResult, ExpenseClient, InMemoryExpenseService, RemoteClientConfig, RemoteExpenseClient,
};
use crate::config::{Config, Mode};
use crate::render::{render, Node};
use crate::session::{
    AuthError, HttpIdentityProvider, IdentityConfig, IdentityProvider, LocalIdentityProvider,
    Principal,
};
use crate::view::{delete_expense, ActionOutcome, CreateForm, ExpenseListView};

/// A terminal command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fill both form fields and submit
    Add { name: String, amount: String },
    /// Set the name field
    Name(String),
    /// Set the amount field
    Amount(String),
    Submit,
    /// Delete the card with this 1-based number
    Delete(usize),
    List,
    SignOut,
    Help,
    Quit,
}

/// Errors from parsing or applying a command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type 'help' for commands)")]
    Unknown(String),

    #[error("Missing {0}")]
    MissingArgument(&'static str),

    #[error("'{0}' is not an expense number")]
    InvalidIndex(String),

    #[error("No expense #{0}")]
    NoSuchExpense(usize),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "add" => {
                let (name, amount) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or(CommandError::MissingArgument("name and amount"))?;
                Ok(Command::Add {
                    name: name.trim().to_string(),
                    amount: amount.to_string(),
                })
            }
            "name" => Ok(Command::Name(rest.to_string())),
            "amount" => Ok(Command::Amount(rest.to_string())),
            "submit" => Ok(Command::Submit),
            "delete" | "rm" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument("expense number"));
                }
                match rest.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Command::Delete(n)),
                    _ => Err(CommandError::InvalidIndex(rest.to_string())),
                }
            }
            "list" | "ls" => Ok(Command::List),
            "signout" | "logout" => Ok(Command::SignOut),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

/// Help text for the terminal
pub const HELP: &str = "\
Commands:
  add <name> <amount>   create an expense (amount is the last word)
  name <text>           set the name field
  amount <text>         set the amount field
  submit                submit the form
  delete <n>            delete expense number n
  list                  redraw the list
  signout               sign out and return to sign-in
  help                  show this help
  quit                  exit";

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Render,
    Help,
    SignOut,
    Quit,
}

/// The signed-in application
pub struct ExpenseApp {
    client: Arc<dyn ExpenseClient>,
    view: ExpenseListView,
    form: CreateForm,
    notice: Option<ActionOutcome>,
}

impl ExpenseApp {
    /// Mount the list view over the given client
    pub async fn mount(client: Arc<dyn ExpenseClient>) -> ClientResult<Self> {
        let view = ExpenseListView::mount(client.as_ref()).await?;
        Ok(Self {
            client,
            view,
            form: CreateForm::new(),
            notice: None,
        })
    }

    pub fn view(&self) -> &ExpenseListView {
        &self.view
    }

    pub fn form(&self) -> &CreateForm {
        &self.form
    }

    /// Outcome of the last action
    pub fn notice(&self) -> Option<&ActionOutcome> {
        self.notice.as_ref()
    }

    pub fn render(&self) -> Node {
        render(&self.view, &self.form, self.notice.as_ref())
    }

    /// Wait for the next live query snapshot; `false` once it has ended
    pub async fn next_update(&mut self) -> bool {
        self.view.next_update().await
    }

    /// Apply snapshots that already arrived
    pub fn drain_updates(&mut self) -> usize {
        self.view.drain_updates()
    }

    /// Apply one command
    pub async fn handle(&mut self, command: Command) -> Result<Flow, CommandError> {
        match command {
            Command::Add { name, amount } => {
                self.form.set_name(name);
                self.form.set_amount(amount);
                self.submit().await;
            }
            Command::Name(name) => self.form.set_name(name),
            Command::Amount(amount) => self.form.set_amount(amount),
            Command::Submit => self.submit().await,
            Command::Delete(number) => self.delete(number).await?,
            Command::List => {}
            Command::Help => return Ok(Flow::Help),
            Command::SignOut => {
                self.unmount();
                return Ok(Flow::SignOut);
            }
            Command::Quit => {
                self.unmount();
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Render)
    }

    async fn submit(&mut self) {
        let outcome = self.form.submit(self.client.as_ref()).await;
        self.notice = Some(outcome);
    }

    async fn delete(&mut self, number: usize) -> Result<(), CommandError> {
        let expense = number
            .checked_sub(1)
            .and_then(|index| self.view.get(index))
            .cloned()
            .ok_or(CommandError::NoSuchExpense(number))?;

        if let Some(id) = &expense.id {
            self.view.mark_pending_delete(id.clone());
        }

        let outcome = delete_expense(self.client.as_ref(), &expense).await;
        if let (ActionOutcome::Failed { .. }, Some(id)) = (&outcome, &expense.id) {
            self.view.clear_pending_delete(id);
        }

        self.notice = Some(outcome);
        Ok(())
    }

    /// Release the live query; idempotent
    pub fn unmount(&mut self) -> bool {
        self.view.unmount()
    }
}

/// Where identities and expenses come from
pub enum Backend {
    /// In-process service shared by every session of this run
    Local(InMemoryExpenseService),
    /// Hosted identity provider and data service
    Remote {
        identity: IdentityConfig,
        service: RemoteClientConfig,
    },
}

impl Backend {
    pub fn from_config(config: &Config, force_local: bool) -> Self {
        if force_local || config.mode == Mode::Local {
            Backend::Local(InMemoryExpenseService::new())
        } else {
            Backend::Remote {
                identity: config.identity_config(),
                service: config.remote_client_config(),
            }
        }
    }

    pub fn identity_provider(&self) -> Result<Arc<dyn IdentityProvider>, AuthError> {
        match self {
            Backend::Local(_) => Ok(Arc::new(LocalIdentityProvider::new())),
            Backend::Remote { identity, .. } => {
                Ok(Arc::new(HttpIdentityProvider::new(identity.clone())?))
            }
        }
    }

    /// Build the data client for a signed-in principal
    pub fn connect(&self, principal: &Principal) -> ClientResult<Arc<dyn ExpenseClient>> {
        match self {
            Backend::Local(service) => Ok(Arc::new(service.client_for(&principal.user_id))),
            Backend::Remote { service, .. } => Ok(Arc::new(RemoteExpenseClient::new(
                service.clone(),
                principal.access_token.clone(),
            )?)),
        }
    }
}
