//! redb-backed store
//!
//! Single-file persistent backend. Each write (and each atomic update) is
//! one redb write transaction; redb serializes write transactions, so the
//! read-modify-write inside `atomic_update` cannot interleave with another
//! writer. Changes are broadcast after commit.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | entries | store key | JSON bytes |
//! | meta | "revision" | u64 |

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{
    CHANGE_CHANNEL_CAPACITY, StoreAdapter, StoreChange, StoreError, StoreResult,
    StoreSubscription, TxDecision, UpdateOutcome, keys,
};

const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");
const REVISION_KEY: &str = "revision";

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::Unavailable(format!("database: {e}"))
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Unavailable(format!("transaction: {e}"))
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::Unavailable(format!("table: {e}"))
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::Unavailable(format!("storage: {e}"))
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::Unavailable(format!("commit: {e}"))
    }
}

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    changes: broadcast::Sender<StoreChange>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create the database file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTRIES_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;
            if meta.get(REVISION_KEY)?.is_none() {
                meta.insert(REVISION_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            db: Arc::new(db),
            changes,
        })
    }

    /// Current store revision
    pub fn revision(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META_TABLE)?;
        Ok(meta.get(REVISION_KEY)?.map(|g| g.value()).unwrap_or(0))
    }

    fn bump_revision(txn: &WriteTransaction) -> StoreResult<u64> {
        let mut meta = txn.open_table(META_TABLE)?;
        let next = meta.get(REVISION_KEY)?.map(|g| g.value()).unwrap_or(0) + 1;
        meta.insert(REVISION_KEY, next)?;
        Ok(next)
    }

    fn read_in_txn(txn: &WriteTransaction, key: &str) -> StoreResult<Option<Value>> {
        let table = txn.open_table(ENTRIES_TABLE)?;
        match table.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Store `value` (or delete) inside `txn`, returning the new revision
    fn put_in_txn(txn: &WriteTransaction, key: &str, value: Option<&Value>) -> StoreResult<u64> {
        {
            let mut table = txn.open_table(ENTRIES_TABLE)?;
            match value {
                Some(v) => {
                    let bytes = serde_json::to_vec(v)?;
                    table.insert(key, bytes.as_slice())?;
                }
                None => {
                    table.remove(key)?;
                }
            }
        }
        Self::bump_revision(txn)
    }

    fn publish(&self, key: &str, value: Option<Value>, revision: u64) {
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
            revision,
        });
    }

    fn write_sync(&self, key: &str, value: Option<Value>) -> StoreResult<u64> {
        let txn = self.db.begin_write()?;
        let revision = Self::put_in_txn(&txn, key, value.as_ref())?;
        txn.commit()?;
        self.publish(key, value, revision);
        Ok(revision)
    }
}

#[async_trait]
impl StoreAdapter for RedbStore {
    async fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;
        match table.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range(prefix..)? {
            let (key, value) = result?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            if keys::has_prefix(key, prefix) {
                entries.push((key.to_string(), serde_json::from_slice(value.value())?));
            }
        }
        Ok(entries)
    }

    fn subscribe(&self, prefix: &str) -> StoreSubscription {
        StoreSubscription::new(prefix, self.changes.subscribe())
    }

    async fn write(&self, key: &str, value: Option<Value>) -> StoreResult<u64> {
        self.write_sync(key, value)
    }

    async fn atomic_update(
        &self,
        key: &str,
        f: &mut (dyn FnMut(Option<Value>) -> TxDecision + Send),
    ) -> StoreResult<UpdateOutcome> {
        let txn = self.db.begin_write()?;
        let current = Self::read_in_txn(&txn, key)?;

        let (value, revision) = match f(current.clone()) {
            TxDecision::Set(value) => {
                let revision = Self::put_in_txn(&txn, key, Some(&value))?;
                (Some(value), revision)
            }
            TxDecision::Delete => (None, Self::put_in_txn(&txn, key, None)?),
            TxDecision::Abort => {
                txn.abort()?;
                return Ok(UpdateOutcome {
                    committed: false,
                    value: current,
                    revision: self.revision()?,
                });
            }
        };

        txn.commit()?;
        self.publish(key, value.clone(), revision);
        Ok(UpdateOutcome {
            committed: true,
            value,
            revision,
        })
    }

    async fn append(&self, list_key: &str, value: Value) -> StoreResult<String> {
        let txn = self.db.begin_write()?;
        let revision = Self::bump_revision(&txn)?;
        let id = format!("{revision:016x}");
        let key = format!("{}/{}", list_key.trim_end_matches('/'), id);
        {
            let mut table = txn.open_table(ENTRIES_TABLE)?;
            let bytes = serde_json::to_vec(&value)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        self.publish(&key, Some(value), revision);
        Ok(id)
    }
}
