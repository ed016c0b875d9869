//! Expense list view-model
//!
//! Local state is always the normalized form of the last snapshot the live
//! query delivered. Mutations never touch it directly; they show up when the
//! service pushes the next snapshot.

use std::collections::HashSet;

use crate::client::{ClientResult, ExpenseClient, Subscription};
use crate::model::{Expense, ExpenseId, Snapshot};

/// Live list of the principal's expenses
#[derive(Debug)]
pub struct ExpenseListView {
    expenses: Vec<Expense>,
    /// Deletes issued since the last snapshot, for display only
    pending_deletes: HashSet<ExpenseId>,
    /// Whether any snapshot has arrived yet
    loaded: bool,
    synced: bool,
    subscription: Option<Subscription>,
}

impl ExpenseListView {
    /// Open the live query and start with an empty list
    pub async fn mount(client: &dyn ExpenseClient) -> ClientResult<Self> {
        let subscription = client.observe_query().await?;
        tracing::debug!("Expense list mounted");

        Ok(Self {
            expenses: Vec::new(),
            pending_deletes: HashSet::new(),
            loaded: false,
            synced: false,
            subscription: Some(subscription),
        })
    }

    /// Replace all local state with a snapshot
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.synced = snapshot.is_synced;
        self.expenses = snapshot.normalized();
        self.pending_deletes.clear();
        self.loaded = true;

        tracing::debug!(count = self.expenses.len(), synced = self.synced, "Applied snapshot");
    }

    /// Wait for the next snapshot and apply it
    ///
    /// Returns `false` once the live query has ended or the view is unmounted.
    /// Cancel safe.
    pub async fn next_update(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        match subscription.next_snapshot().await {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => {
                tracing::warn!("Live query ended");
                false
            }
        }
    }

    /// Apply every snapshot that is already buffered; returns how many
    pub fn drain_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Some(snapshot) = self
            .subscription
            .as_mut()
            .and_then(|s| s.try_next_snapshot())
        {
            self.apply_snapshot(snapshot);
            applied += 1;
        }
        applied
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn get(&self, index: usize) -> Option<&Expense> {
        self.expenses.get(index)
    }

    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Record that a delete is in flight; the item stays listed
    pub fn mark_pending_delete(&mut self, id: ExpenseId) {
        self.pending_deletes.insert(id);
    }

    /// Forget a pending delete, e.g. after the request failed
    pub fn clear_pending_delete(&mut self, id: &ExpenseId) {
        self.pending_deletes.remove(id);
    }

    pub fn is_pending_delete(&self, expense: &Expense) -> bool {
        expense
            .id
            .as_ref()
            .map(|id| self.pending_deletes.contains(id))
            .unwrap_or(false)
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.as_ref().map(Subscription::is_active).unwrap_or(false)
    }

    /// Release the live query
    ///
    /// Returns `true` if this call released it. Later calls are no-ops.
    pub fn unmount(&mut self) -> bool {
        match self.subscription.take() {
            Some(mut subscription) => {
                let released = subscription.unsubscribe();
                tracing::debug!("Expense list unmounted");
                released
            }
            None => false,
        }
    }
}
