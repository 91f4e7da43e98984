//! Store clients for the record collection.
//!
//! Every backend implements [`StoreClient`]: a live feed of the full record
//! collection plus write and remove primitives keyed by record id. The views
//! never touch a backend directly; they receive an `Arc<dyn StoreClient>` from
//! the application entry point.
//!
//! Backends:
//! - [`MemoryStore`]: process-local, used by tests and `--store memory`.
//! - [`SqliteStore`]: a durable local database file.
//! - [`FirebaseStore`]: a hosted realtime database over its REST API.

mod feed;
pub mod firebase;
mod ids;
mod memory;
pub mod sqlite;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::record::Record;

pub use feed::ChangeFeed;
pub use firebase::FirebaseStore;
pub use ids::IdGenerator;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// One item delivered by a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The complete record collection, in store insertion order.
    Snapshot(Vec<Record>),

    /// The live connection dropped. The store keeps trying to reconnect and
    /// delivers a fresh snapshot once it succeeds.
    Interrupted {
        /// Why the connection was lost.
        reason: String,
    },
}

/// A live feed of [`Change`]s from a store.
///
/// The first item is the current collection; every later write or remove
/// committed by any client produces exactly one further item. Dropping the
/// subscription releases the listener and stops any task it owns.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Change>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a receiving channel.
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<Change>) -> Self {
        Self { rx, task: None }
    }

    /// Tie a background task to this subscription's lifetime.
    #[must_use]
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the store has shut the feed down.
    pub async fn next(&mut self) -> Option<Change> {
        self.rx.recv().await
    }

    /// Take a change if one is already queued.
    pub fn try_next(&mut self) -> Option<Change> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A connection to a realtime key-value store holding the records.
#[async_trait::async_trait]
pub trait StoreClient: Send + Sync + std::fmt::Debug {
    /// Name of the backend, for logging.
    fn name(&self) -> &'static str;

    /// Open a live feed of the full record collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be established.
    async fn subscribe(&self) -> Result<Subscription>;

    /// Create or replace a record.
    ///
    /// With `id == None` the store assigns a fresh id and creates the record;
    /// otherwise the value at `id` is replaced in full. Resolves once the store
    /// acknowledges the write and returns the record's id. Other subscribers
    /// may not have observed the change yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write or cannot be reached.
    async fn write(&self, id: Option<&str>, question: &str, answer: &str) -> Result<String>;

    /// Delete the record at `id`. Deleting a missing id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete or cannot be reached.
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Construct the store selected by the configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be opened.
pub fn open_store(config: &Config) -> Result<Arc<dyn StoreClient>> {
    let store: Arc<dyn StoreClient> = match config.store.backend {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::Sqlite => Arc::new(
            SqliteStore::open(config.database_path())?.with_poll_interval(config.poll_interval()),
        ),
        Backend::Firebase => Arc::new(FirebaseStore::new(
            &config.firebase,
            config.reconnect_delay(),
        )?),
    };
    tracing::info!(backend = store.name(), "Store opened");
    Ok(store)
}
