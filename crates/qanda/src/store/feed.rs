//! Fan-out of record snapshots to every live subscription.

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::trace;

use super::{Change, Subscription};
use crate::record::Record;

/// Delivers each published snapshot to every attached subscriber.
///
/// Subscribers whose [`Subscription`] has been dropped are pruned on the next
/// publish. Callers publish while holding their own commit lock, so every
/// subscriber sees snapshots in commit order.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Change>>>,
}

impl ChangeFeed {
    /// Create a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber, seeding it with the current collection.
    pub fn attach(&self, current: Vec<Record>) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive right here, so this cannot fail
        let _ = tx.send(Change::Snapshot(current));
        self.lock().push(tx);
        Subscription::new(rx)
    }

    /// Send a snapshot to every live subscriber.
    pub fn publish(&self, records: &[Record]) {
        self.broadcast(&Change::Snapshot(records.to_vec()));
    }

    /// Tell every live subscriber the connection was lost.
    pub fn interrupt(&self, reason: &str) {
        self.broadcast(&Change::Interrupted {
            reason: reason.to_string(),
        });
    }

    /// Number of subscribers that have not been pruned yet.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn broadcast(&self, change: &Change) {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        trace!(subscribers = subscribers.len(), "Published change");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<Change>>> {
        // A poisoned list of senders is still a valid list of senders
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
