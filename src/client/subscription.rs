//! Live query subscription handle
//!
//! A `Subscription` couples the snapshot channel with a release hook. The hook
//! runs at most once: on an explicit `unsubscribe()` or, failing that, on drop.

use tokio::sync::mpsc;

use crate::model::Snapshot;

type ReleaseHook = Box<dyn FnOnce() + Send + 'static>;

/// Handle to one live query
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    release: Option<ReleaseHook>,
}

impl Subscription {
    /// Create a subscription from a snapshot receiver and the hook that tears
    /// down the producing side
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Snapshot>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next snapshot
    ///
    /// Returns `None` once the subscription is released or the producer has
    /// gone away. Cancel safe.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        if self.release.is_none() {
            return None;
        }
        self.receiver.recv().await
    }

    /// Take a snapshot that is already buffered, without waiting
    pub fn try_next_snapshot(&mut self) -> Option<Snapshot> {
        if self.release.is_none() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Release the subscription
    ///
    /// Returns `true` if this call released it, `false` if it was already
    /// released.
    pub fn unsubscribe(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                self.receiver.close();
                release();
                tracing::debug!("Subscription released");
                true
            }
            None => false,
        }
    }

    /// Whether the subscription has not been released yet
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
