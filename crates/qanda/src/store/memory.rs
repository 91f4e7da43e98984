//! Process-local store.
//!
//! Holds the collection in a sorted map keyed by id. Ids come from
//! [`IdGenerator`], so key order is insertion order. The store can be switched
//! to an unreachable mode in which every call fails like a dropped connection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{ChangeFeed, IdGenerator, StoreClient, Subscription};
use crate::error::{Error, Result};
use crate::record::{Record, RecordBody};

/// An in-memory [`StoreClient`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, RecordBody>>,
    feed: ChangeFeed,
    ids: IdGenerator,
    unreachable: AtomicBool,
    calls: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given question/answer pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if id generation fails.
    pub fn with_records<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let store = Self::new();
        {
            let mut records = store.lock()?;
            for (question, answer) in pairs {
                records.insert(
                    store.ids.next_id()?,
                    RecordBody {
                        question: question.to_string(),
                        answer: answer.to_string(),
                    },
                );
            }
        }
        Ok(store)
    }

    /// Make every subsequent call fail (or succeed again) as if the
    /// connection dropped.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of write and remove calls that reached the store.
    #[must_use]
    pub fn mutation_calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Current collection in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn records(&self) -> Result<Vec<Record>> {
        let records = self.lock()?;
        Ok(Self::collect(&records))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(Error::transport("memory store is unreachable"))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, RecordBody>>> {
        self.records
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }

    fn collect(records: &BTreeMap<String, RecordBody>) -> Vec<Record> {
        records
            .iter()
            .map(|(id, body)| body.clone().into_record(id.clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl StoreClient for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn subscribe(&self) -> Result<Subscription> {
        self.check_reachable()?;
        let records = self.lock()?;
        Ok(self.feed.attach(Self::collect(&records)))
    }

    async fn write(&self, id: Option<&str>, question: &str, answer: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut records = self.lock()?;
        let id = match id {
            Some(id) => id.to_string(),
            None => self.ids.next_id()?,
        };
        records.insert(
            id.clone(),
            RecordBody {
                question: question.to_string(),
                answer: answer.to_string(),
            },
        );
        debug!(%id, "Wrote record");

        self.feed.publish(&Self::collect(&records));
        Ok(id)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut records = self.lock()?;
        let existed = records.remove(id).is_some();
        debug!(%id, existed, "Removed record");

        self.feed.publish(&Self::collect(&records));
        Ok(())
    }
}
