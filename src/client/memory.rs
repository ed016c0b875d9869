//! In-process expense service
//!
//! Behaves like the hosted data service as far as the view can tell:
//! owner-scoped visibility, server-assigned ids and timestamps, and a full
//! snapshot pushed to every live observer after each write. Used for offline
//! mode and as the substitute implementation in tests.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::{ClientError, ClientResult};
use super::subscription::Subscription;
use super::ExpenseClient;
use crate::model::{ExpenseId, ExpenseRecord, NewExpense, Snapshot};

type ObserverId = u64;

/// Shared in-process expense collection
#[derive(Clone, Default)]
pub struct InMemoryExpenseService {
    state: Arc<Mutex<ServiceState>>,
}

#[derive(Default)]
struct ServiceState {
    /// All records in creation order
    records: Vec<ExpenseRecord>,
    /// Live observers: ObserverId → Observer
    observers: HashMap<ObserverId, Observer>,
    next_observer: ObserverId,
    stats: ServiceStats,
    /// Message for the next create or delete to fail with
    fail_next: Option<String>,
}

struct Observer {
    owner: String,
    sender: mpsc::UnboundedSender<Snapshot>,
}

/// Request counters, for status output and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    /// Create requests received, including failed ones
    pub creates: usize,
    /// Delete requests received, including failed ones
    pub deletes: usize,
    /// Live queries opened
    pub subscriptions: usize,
    /// Live queries released
    pub releases: usize,
}

impl InMemoryExpenseService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client scoped to one principal
    pub fn client_for(&self, owner: impl Into<String>) -> LocalExpenseClient {
        LocalExpenseClient {
            service: self.clone(),
            owner: owner.into(),
        }
    }

    pub fn stats(&self) -> ServiceStats {
        self.lock().stats
    }

    /// Number of live queries not yet released
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Make the next create or delete fail with an API error
    pub fn fail_next_request(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Current listing for an owner
    pub fn snapshot_for(&self, owner: &str) -> Snapshot {
        self.lock().snapshot_for(owner)
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe(&self, owner: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut state = self.lock();
            let id = state.next_observer;
            state.next_observer += 1;
            state.stats.subscriptions += 1;

            // Initial listing, as the hosted service sends on subscribe
            let _ = tx.send(state.snapshot_for(owner));
            state.observers.insert(
                id,
                Observer {
                    owner: owner.to_string(),
                    sender: tx,
                },
            );
            id
        };

        tracing::debug!(observer = id, owner = %owner, "Live query opened");

        let service = self.clone();
        Subscription::new(rx, move || {
            let mut state = service.lock();
            if state.observers.remove(&id).is_some() {
                state.stats.releases += 1;
            }
            tracing::debug!(observer = id, "Live query released");
        })
    }

    fn create(&self, owner: &str, expense: NewExpense) -> ClientResult<ExpenseRecord> {
        let mut state = self.lock();
        state.stats.creates += 1;
        state.take_injected_failure()?;

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = ExpenseRecord {
            id: Some(ExpenseId::new(Uuid::new_v4().to_string())),
            name: Some(expense.name),
            amount: Some(expense.amount),
            owner: Some(owner.to_string()),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };

        state.records.push(record.clone());
        state.broadcast(owner);

        tracing::info!(id = ?record.id, owner = %owner, "Expense created");
        Ok(record)
    }

    fn delete(&self, owner: &str, id: &ExpenseId) -> ClientResult<()> {
        let mut state = self.lock();
        state.stats.deletes += 1;
        state.take_injected_failure()?;

        let position = state
            .records
            .iter()
            .position(|r| r.id.as_ref() == Some(id) && r.owner.as_deref() == Some(owner))
            .ok_or_else(|| ClientError::NotFound(id.clone()))?;

        state.records.remove(position);
        state.broadcast(owner);

        tracing::info!(id = %id, owner = %owner, "Expense deleted");
        Ok(())
    }
}

impl ServiceState {
    fn snapshot_for(&self, owner: &str) -> Snapshot {
        let items = self
            .records
            .iter()
            .filter(|r| r.owner.as_deref() == Some(owner))
            .cloned()
            .collect();
        Snapshot::new(items)
    }

    fn take_injected_failure(&mut self) -> ClientResult<()> {
        match self.fail_next.take() {
            Some(message) => Err(ClientError::ApiError {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Push a fresh listing to every observer of this owner
    fn broadcast(&mut self, owner: &str) {
        let snapshot = self.snapshot_for(owner);

        let mut sent_count = 0;
        for observer in self.observers.values() {
            if observer.owner == owner && observer.sender.send(snapshot.clone()).is_ok() {
                sent_count += 1;
            }
        }

        if sent_count > 0 {
            tracing::trace!(owner = %owner, observers = sent_count, "Broadcast snapshot");
        }
    }
}

/// `ExpenseClient` bound to one owner of an [`InMemoryExpenseService`]
#[derive(Clone)]
pub struct LocalExpenseClient {
    service: InMemoryExpenseService,
    owner: String,
}

#[async_trait]
impl ExpenseClient for LocalExpenseClient {
    async fn observe_query(&self) -> ClientResult<Subscription> {
        Ok(self.service.observe(&self.owner))
    }

    async fn create(&self, expense: NewExpense) -> ClientResult<ExpenseRecord> {
        self.service.create(&self.owner, expense)
    }

    async fn delete(&self, id: &ExpenseId) -> ClientResult<()> {
        self.service.delete(&self.owner, id)
    }
}
