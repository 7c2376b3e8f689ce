//! Real-time store adapters
//!
//! The store is the authoritative shared owner of shelves, positions,
//! settings and the audit log. Every client talks to it through
//! [`StoreAdapter`]; the engine never assumes which backend sits behind it.
//!
//! # Key layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `shelves/{id}` | [`shared::Shelf`] |
//! | `positions/{shelf}/{row}/{col}` | [`shared::Product`] |
//! | `settings` | [`shared::InventorySettings`] |
//! | `audit_log/{id}` | [`shared::AuditEvent`] |

pub mod keys;
pub mod listener;
pub mod memory;
pub mod redb_store;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub use keys::StoreKey;
pub use listener::StoreListener;
pub use memory::MemoryStore;
pub use redb_store::RedbStore;

/// Capacity of the change-stream broadcast channel
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of the closure passed to [`StoreAdapter::atomic_update`]
#[derive(Debug, Clone, PartialEq)]
pub enum TxDecision {
    /// Replace the value
    Set(Value),
    /// Remove the key
    Delete,
    /// Leave the key untouched
    Abort,
}

/// What an atomic update left behind
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// False when the closure aborted
    pub committed: bool,
    /// Value stored at the key after the update
    pub value: Option<Value>,
    /// Store revision of the write (current revision when aborted)
    pub revision: u64,
}

/// One entry of the change stream
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    /// `None` when the key was deleted
    pub value: Option<Value>,
    /// Monotonic per store; later writes carry larger revisions
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The subscriber fell behind and missed `n` changes
    #[error("change stream lagged by {0} events")]
    Lagged(u64),

    #[error("change stream closed")]
    Closed,
}

/// Live subscription to every change under a key prefix
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// ends it.
pub struct StoreSubscription {
    prefix: String,
    rx: broadcast::Receiver<StoreChange>,
}

impl StoreSubscription {
    pub(crate) fn new(prefix: &str, rx: broadcast::Receiver<StoreChange>) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            rx,
        }
    }

    /// Wait for the next change under the prefix
    pub async fn recv(&mut self) -> Result<StoreChange, SubscriptionError> {
        loop {
            match self.rx.recv().await {
                Ok(change) if keys::has_prefix(&change.key, &self.prefix) => return Ok(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(SubscriptionError::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn unsubscribe(self) {}
}

/// Adapter over the shared real-time store
///
/// Transport failures surface as [`StoreError::Unavailable`].
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Read one key
    async fn read(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Every key under `prefix`, in key order (`""` lists everything)
    async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>>;

    /// Change stream for keys under `prefix`
    fn subscribe(&self, prefix: &str) -> StoreSubscription;

    /// Unconditional write (`None` deletes); returns the new revision
    async fn write(&self, key: &str, value: Option<Value>) -> StoreResult<u64>;

    /// Read-modify-write of one key, serialized against every other write
    ///
    /// `f` receives the latest stored value and decides what to store. It
    /// may run more than once on backends that retry on contention, so it
    /// must not have side effects beyond the captured state it overwrites.
    async fn atomic_update(
        &self,
        key: &str,
        f: &mut (dyn FnMut(Option<Value>) -> TxDecision + Send),
    ) -> StoreResult<UpdateOutcome>;

    /// Append to a list and return the generated child id
    async fn append(&self, list_key: &str, value: Value) -> StoreResult<String>;
}

/// Read and decode one key
pub async fn read_typed<T: DeserializeOwned>(
    store: &dyn StoreAdapter,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.read(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and write one key
pub async fn write_typed<T: Serialize>(
    store: &dyn StoreAdapter,
    key: &str,
    value: Option<&T>,
) -> StoreResult<u64> {
    let value = value.map(serde_json::to_value).transpose()?;
    store.write(key, value).await
}
