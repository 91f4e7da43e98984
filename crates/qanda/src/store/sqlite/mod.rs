//! `SQLite`-backed store.
//!
//! Records live in a single table in a local database file. Writes made
//! through this store are published to its subscribers as soon as they commit.
//! Commits made by other processes on the same file are picked up by a
//! watcher that polls `PRAGMA data_version`, which changes only when another
//! connection has committed.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{ChangeFeed, IdGenerator, StoreClient, Subscription};
use crate::error::{Error, Result};
use crate::record::Record;

use schema::{DELETE_RECORD, SELECT_ALL_RECORDS, UPSERT_RECORD};

/// A [`StoreClient`] over a local `SQLite` database.
#[derive(Debug)]
pub struct SqliteStore {
    shared: Arc<Shared>,
    poll_interval: Option<Duration>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    db: Mutex<Db>,
    feed: ChangeFeed,
    ids: IdGenerator,
}

#[derive(Debug)]
struct Db {
    conn: Connection,
    /// Last `data_version` observed by the watcher.
    data_version: i64,
    /// Set after a failed poll so the next good poll republishes.
    interrupted: bool,
}

impl SqliteStore {
    /// Open or create a store database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets the watcher read while another process writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Self::from_connection(path, conn)
    }

    /// Create an in-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        migrations::initialize_schema(&conn)?;
        Self::from_connection(path, conn)
    }

    fn from_connection(path: PathBuf, conn: Connection) -> Result<Self> {
        let data_version = data_version(&conn)?;
        Ok(Self {
            shared: Arc::new(Shared {
                path,
                db: Mutex::new(Db {
                    conn,
                    data_version,
                    interrupted: false,
                }),
                feed: ChangeFeed::new(),
                ids: IdGenerator::new(),
            }),
            poll_interval: None,
            watcher: Mutex::new(None),
        })
    }

    /// Watch for commits from other processes at the given interval.
    ///
    /// The watcher starts with the first subscription and stops when the
    /// store is dropped.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Count records in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let db = self.shared.lock()?;
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Load the whole collection in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn records(&self) -> Result<Vec<Record>> {
        let db = self.shared.lock()?;
        load_records(&db.conn)
    }

    fn ensure_watcher(&self) -> Result<()> {
        let Some(interval) = self.poll_interval else {
            return Ok(());
        };
        let mut watcher = self
            .watcher
            .lock()
            .map_err(|_| Error::internal("watcher lock poisoned"))?;
        if watcher.is_none() {
            debug!(?interval, "Starting external change watcher");
            *watcher = Some(tokio::spawn(watch(
                Arc::downgrade(&self.shared),
                interval,
            )));
        }
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Ok(mut watcher) = self.watcher.lock() {
            if let Some(task) = watcher.take() {
                task.abort();
            }
        }
    }
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Db>> {
        self.db
            .lock()
            .map_err(|_| Error::internal("database lock poisoned"))
    }

    /// Republish if another connection committed since the last poll.
    fn poll_external(&self) {
        let Ok(mut db) = self.lock() else {
            return;
        };

        match data_version(&db.conn).and_then(|version| {
            let changed = version != db.data_version || db.interrupted;
            let records = if changed {
                Some(load_records(&db.conn)?)
            } else {
                None
            };
            Ok((version, records))
        }) {
            Ok((version, records)) => {
                db.data_version = version;
                db.interrupted = false;
                if let Some(records) = records {
                    debug!(count = records.len(), "Picked up external change");
                    self.feed.publish(&records);
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll database for changes");
                if !db.interrupted {
                    db.interrupted = true;
                    self.feed.interrupt(&e.to_string());
                }
            }
        }
    }
}

async fn watch(shared: Weak<Shared>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.poll_external();
    }
}

fn data_version(conn: &Connection) -> Result<i64> {
    let version: i64 = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
    Ok(version)
}

fn load_records(conn: &Connection) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare_cached(SELECT_ALL_RECORDS)?;
    let records = stmt
        .query_map([], |row| {
            Ok(Record {
                id: row.get(0)?,
                question: row.get(1)?,
                answer: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

#[async_trait::async_trait]
impl StoreClient for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let subscription = {
            let db = self.shared.lock()?;
            self.shared.feed.attach(load_records(&db.conn)?)
        };
        self.ensure_watcher()?;
        Ok(subscription)
    }

    async fn write(&self, id: Option<&str>, question: &str, answer: &str) -> Result<String> {
        let db = self.shared.lock()?;
        let id = match id {
            Some(id) => id.to_string(),
            None => self.shared.ids.next_id()?,
        };
        let now = Utc::now().to_rfc3339();

        db.conn
            .execute(UPSERT_RECORD, params![id, question, answer, now])?;
        debug!(%id, "Wrote record");

        self.shared.feed.publish(&load_records(&db.conn)?);
        Ok(id)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let db = self.shared.lock()?;
        let affected = db.conn.execute(DELETE_RECORD, [id])?;
        debug!(%id, affected, "Removed record");

        self.shared.feed.publish(&load_records(&db.conn)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Change;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qanda_test_{tag}_{}.db", std::process::id()))
    }

    fn cleanup(path: &Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }

    fn snapshot(change: Option<Change>) -> Vec<Record> {
        match change {
            Some(Change::Snapshot(records)) => records,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        assert_eq!(store.path(), Path::new(":memory:"));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let store = create_test_store();
        let id = store.write(None, "Q2", "A2").await.unwrap();

        assert_eq!(store.records().unwrap(), vec![Record::new(id, "Q2", "A2")]);
    }

    #[tokio::test]
    async fn test_replace_keeps_single_row() {
        let store = create_test_store();
        let id = store.write(None, "Q1", "A1").await.unwrap();
        store.write(Some(&id), "Q1b", "A1b").await.unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            store.records().unwrap(),
            vec![Record::new(id, "Q1b", "A1b")]
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let store = create_test_store();
        let keep = store.write(None, "Q1", "A1").await.unwrap();
        let gone = store.write(None, "Q2", "A2").await.unwrap();

        store.remove(&gone).await.unwrap();
        store.remove("missing").await.unwrap();

        let ids: Vec<String> = store.records().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![keep]);
    }

    #[tokio::test]
    async fn test_subscription_sees_own_writes_once() {
        let store = create_test_store();
        let mut sub = store.subscribe().await.unwrap();
        assert!(snapshot(sub.next().await).is_empty());

        let id = store.write(None, "Q", "A").await.unwrap();
        assert_eq!(snapshot(sub.next().await), vec![Record::new(&id, "Q", "A")]);

        store.remove(&id).await.unwrap();
        assert!(snapshot(sub.next().await).is_empty());
        assert!(sub.try_next().is_none());
    }

    #[tokio::test]
    async fn test_insertion_order() {
        let store = create_test_store();
        for q in ["zeta", "alpha", "mid"] {
            store.write(None, q, "x").await.unwrap();
        }
        let questions: Vec<String> = store
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.question)
            .collect();
        assert_eq!(questions, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_unicode_content() {
        let store = create_test_store();
        let id = store.write(None, "¿Qué es 日本語?", "🦀\nmultiline").await.unwrap();
        let records = store.records().unwrap();
        assert_eq!(records[0], Record::new(id, "¿Qué es 日本語?", "🦀\nmultiline"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested = std::env::temp_dir().join(format!(
            "qanda_test_{}/nested/records.db",
            std::process::id()
        ));
        if let Some(parent) = nested.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let store = SqliteStore::open(&nested).unwrap();
        assert!(nested.exists());

        drop(store);
        if let Some(root) = nested.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(root);
        }
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let path = temp_db_path("reopen");
        cleanup(&path);

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store.write(None, "Persisted?", "Yes").await.unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.records().unwrap(),
            vec![Record::new(id, "Persisted?", "Yes")]
        );

        drop(store);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_failed_poll_interrupts_then_republishes() {
        let store = create_test_store();
        let id = store.write(None, "Q", "A").await.unwrap();
        let mut sub = store.subscribe().await.unwrap();
        assert_eq!(snapshot(sub.next().await).len(), 1);

        {
            let mut db = store.shared.lock().unwrap();
            db.conn
                .execute_batch("ALTER TABLE records RENAME TO records_hidden")
                .unwrap();
            // Pretend another connection committed
            db.data_version -= 1;
        }
        store.shared.poll_external();
        store.shared.poll_external();

        assert!(matches!(sub.try_next(), Some(Change::Interrupted { .. })));
        assert!(sub.try_next().is_none(), "a second failure is not reported again");
        assert!(store.shared.lock().unwrap().interrupted);

        store
            .shared
            .lock()
            .unwrap()
            .conn
            .execute_batch("ALTER TABLE records_hidden RENAME TO records")
            .unwrap();
        store.shared.poll_external();

        assert_eq!(snapshot(sub.try_next()), vec![Record::new(id, "Q", "A")]);
        assert!(!store.shared.lock().unwrap().interrupted);
    }

    #[tokio::test]
    async fn test_watcher_picks_up_other_connection() {
        let path = temp_db_path("watch");
        cleanup(&path);

        let reader = SqliteStore::open(&path)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        let writer = SqliteStore::open(&path).unwrap();

        let mut sub = reader.subscribe().await.unwrap();
        assert!(snapshot(sub.next().await).is_empty());

        let id = writer.write(None, "From elsewhere", "A").await.unwrap();

        let expected = vec![Record::new(id, "From elsewhere", "A")];
        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if snapshot(sub.next().await) == expected {
                    break;
                }
            }
        })
        .await;
        assert!(seen.is_ok(), "watcher did not report the external write");

        drop(sub);
        drop(reader);
        drop(writer);
        cleanup(&path);
    }
}
