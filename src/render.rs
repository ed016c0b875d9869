//! Render Tree
//!
//! Declarative view of the application, composed from the list view-model,
//! the create form and the last action outcome. The tree is plain data so it
//! can be inspected in tests and drawn by any front end; [`Node::to_text`]
//! draws it for a terminal.

use std::fmt::Write;

use crate::model::Expense;
use crate::view::{ActionOutcome, CreateForm, ExpenseListView};

/// User action a button triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Submit,
    /// Delete the card at this 0-based index
    Delete(usize),
    SignOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Success,
    /// Nothing happened, nothing went wrong
    Info,
    Error,
}

/// One node of the render tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Column(Vec<Node>),
    Heading {
        level: u8,
        text: String,
    },
    Text {
        text: String,
        italic: bool,
    },
    Field {
        label: &'static str,
        placeholder: &'static str,
        value: String,
    },
    Button {
        label: String,
        action: UiAction,
    },
    Divider,
    Card(Vec<Node>),
    Grid(Vec<Node>),
    Toast {
        message: String,
        variant: ToastVariant,
    },
}

/// Compose the whole application view
pub fn render(view: &ExpenseListView, form: &CreateForm, notice: Option<&ActionOutcome>) -> Node {
    let mut children = vec![
        heading(1, "Expense Tracker"),
        render_form(form),
        Node::Divider,
        heading(2, "Expenses"),
    ];

    // Listing is shown before the service finishes its initial sync
    if view.is_loaded() && !view.is_synced() {
        children.push(text("Syncing...", true));
    }

    children.push(render_list(view));
    children.push(Node::Button {
        label: "Sign Out".to_string(),
        action: UiAction::SignOut,
    });

    if let Some(outcome) = notice {
        children.push(render_toast(outcome));
    }

    Node::Column(children)
}

fn render_form(form: &CreateForm) -> Node {
    Node::Column(vec![
        Node::Field {
            label: "Expense Name",
            placeholder: "Expense Name",
            value: form.name.clone(),
        },
        Node::Field {
            label: "Expense Amount",
            placeholder: "Expense Amount",
            value: form.amount.clone(),
        },
        Node::Button {
            label: "Create Expense".to_string(),
            action: UiAction::Submit,
        },
    ])
}

fn render_list(view: &ExpenseListView) -> Node {
    if !view.is_loaded() {
        return text("Loading expenses...", true);
    }
    if view.is_empty() {
        return text("No expenses yet", true);
    }

    Node::Grid(
        view.expenses()
            .iter()
            .enumerate()
            .map(|(index, expense)| render_card(index, expense, view.is_pending_delete(expense)))
            .collect(),
    )
}

fn render_card(index: usize, expense: &Expense, pending_delete: bool) -> Node {
    let mut children = vec![
        heading(3, &expense.name),
        text(&format_amount(expense.amount), true),
    ];

    if pending_delete {
        children.push(text("deleting...", false));
    }

    children.push(Node::Button {
        label: format!("Delete {}", index + 1),
        action: UiAction::Delete(index),
    });

    Node::Card(children)
}

fn render_toast(outcome: &ActionOutcome) -> Node {
    let variant = match outcome {
        ActionOutcome::Created { .. } | ActionOutcome::Deleted { .. } => ToastVariant::Success,
        ActionOutcome::Skipped => ToastVariant::Info,
        ActionOutcome::Rejected(_) | ActionOutcome::Failed { .. } => ToastVariant::Error,
    };

    Node::Toast {
        message: outcome.notice(),
        variant,
    }
}

fn heading(level: u8, text: &str) -> Node {
    Node::Heading {
        level,
        text: text.to_string(),
    }
}

fn text(text: &str, italic: bool) -> Node {
    Node::Text {
        text: text.to_string(),
        italic,
    }
}

/// Dollar amount in shortest form: `$4.5`, `$12`
pub fn format_amount(amount: f64) -> String {
    format!("${}", amount)
}

impl Node {
    /// Draw the tree as terminal text
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out, 0);
        out
    }

    /// Every button in the tree, in document order
    pub fn actions(&self) -> Vec<UiAction> {
        let mut actions = Vec::new();
        self.collect_actions(&mut actions);
        actions
    }

    fn collect_actions(&self, actions: &mut Vec<UiAction>) {
        match self {
            Node::Button { action, .. } => actions.push(*action),
            Node::Column(children) | Node::Card(children) | Node::Grid(children) => {
                for child in children {
                    child.collect_actions(actions);
                }
            }
            _ => {}
        }
    }

    fn write_text(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        // Writing to a String cannot fail
        let _ = match self {
            Node::Column(children) => {
                for child in children {
                    child.write_text(out, indent);
                }
                Ok(())
            }
            Node::Heading { level, text } => {
                writeln!(out, "{}{} {}", pad, "#".repeat(*level as usize), text)
            }
            Node::Text { text, italic: true } => writeln!(out, "{}_{}_", pad, text),
            Node::Text { text, italic: false } => writeln!(out, "{}{}", pad, text),
            Node::Field {
                label,
                placeholder,
                value,
            } => {
                if value.is_empty() {
                    writeln!(out, "{}{}: ({})", pad, label, placeholder)
                } else {
                    writeln!(out, "{}{}: {}", pad, label, value)
                }
            }
            Node::Button { label, .. } => writeln!(out, "{}[{}]", pad, label),
            Node::Divider => writeln!(out, "{}{}", pad, "-".repeat(40)),
            Node::Card(children) => {
                for child in children {
                    child.write_text(out, indent + 2);
                }
                writeln!(out)
            }
            Node::Grid(children) => {
                for child in children {
                    child.write_text(out, indent);
                }
                Ok(())
            }
            Node::Toast { message, variant } => {
                let icon = match variant {
                    ToastVariant::Success => "✓",
                    ToastVariant::Info => "•",
                    ToastVariant::Error => "✕",
                };
                writeln!(out, "{}{} {}", pad, icon, message)
            }
        };
    }
}
