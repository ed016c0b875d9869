//! Core data types for expenses
//!
//! This module defines the types that flow between the data service and the view:
//! - `ExpenseRecord`: a record as pushed by the service, every field nullable
//! - `Expense`: the normalized form held in view state
//! - `NewExpense`: the payload of a create request
//! - `Snapshot`: one full listing delivered by a live query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned expense identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(String);

impl ExpenseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An expense as the data service sends it
///
/// The service schema marks every field optional, so nothing here can be
/// trusted to be present. Use [`normalize`] before putting it in view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    #[serde(default)]
    pub id: Option<ExpenseId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// An expense as held in view state
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// Absent until the record has round-tripped through the service
    pub id: Option<ExpenseId>,
    pub name: String,
    pub amount: f64,
    pub owner: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Create an expense that has not been assigned an id yet
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            amount,
            owner: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder method: set the id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(ExpenseId::new(id));
        self
    }

    /// Builder method: set the owner
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Normalize a service record into view state
///
/// Missing name becomes `""`, missing amount becomes `0`, missing owner stays
/// `None`. Timestamps that are not RFC 3339 are dropped.
pub fn normalize(record: ExpenseRecord) -> Expense {
    Expense {
        id: record.id,
        name: record.name.unwrap_or_default(),
        amount: record.amount.unwrap_or(0.0),
        owner: record.owner,
        created_at: record.created_at.as_deref().and_then(parse_timestamp),
        updated_at: record.updated_at.as_deref().and_then(parse_timestamp),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(timestamp = %raw, error = %e, "Ignoring unparseable timestamp");
            None
        }
    }
}

/// Fields sent with a create request
///
/// Id and owner are assigned by the service and never sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub name: String,
    pub amount: f64,
}

impl NewExpense {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// One full listing of the expenses visible to the current principal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Records in the order the service sent them
    pub items: Vec<ExpenseRecord>,
    /// Whether the service reports its initial sync as complete
    #[serde(default)]
    pub is_synced: bool,
}

impl Snapshot {
    pub fn new(items: Vec<ExpenseRecord>) -> Self {
        Self {
            items,
            is_synced: true,
        }
    }

    /// Normalize every record, keeping order
    pub fn normalized(self) -> Vec<Expense> {
        self.items.into_iter().map(normalize).collect()
    }
}
