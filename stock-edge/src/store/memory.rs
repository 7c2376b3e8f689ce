//! In-process store
//!
//! Backs tests and single-node deployments. All writes go through one lock,
//! which makes `atomic_update` trivially serializable.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

use super::{
    CHANGE_CHANNEL_CAPACITY, StoreAdapter, StoreChange, StoreResult, StoreSubscription,
    TxDecision, UpdateOutcome, keys,
};

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, Value>,
    revision: u64,
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    changes: broadcast::Sender<StoreChange>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStore")
            .field("keys", &inner.data.len())
            .field("revision", &inner.revision)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(Inner::default()),
            changes,
        }
    }

    /// Apply a write under the lock and publish it
    fn apply(&self, inner: &mut Inner, key: &str, value: Option<Value>) -> u64 {
        inner.revision += 1;
        match &value {
            Some(v) => {
                inner.data.insert(key.to_string(), v.clone());
            }
            None => {
                inner.data.remove(key);
            }
        }
        // No subscribers is fine
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
            revision: inner.revision,
        });
        inner.revision
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.inner.read().data.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        let inner = self.inner.read();
        Ok(inner
            .data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| keys::has_prefix(k, prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn subscribe(&self, prefix: &str) -> StoreSubscription {
        StoreSubscription::new(prefix, self.changes.subscribe())
    }

    async fn write(&self, key: &str, value: Option<Value>) -> StoreResult<u64> {
        let mut inner = self.inner.write();
        Ok(self.apply(&mut inner, key, value))
    }

    async fn atomic_update(
        &self,
        key: &str,
        f: &mut (dyn FnMut(Option<Value>) -> TxDecision + Send),
    ) -> StoreResult<UpdateOutcome> {
        let mut inner = self.inner.write();
        let current = inner.data.get(key).cloned();
        match f(current.clone()) {
            TxDecision::Set(value) => {
                let revision = self.apply(&mut inner, key, Some(value.clone()));
                Ok(UpdateOutcome {
                    committed: true,
                    value: Some(value),
                    revision,
                })
            }
            TxDecision::Delete => {
                let revision = self.apply(&mut inner, key, None);
                Ok(UpdateOutcome {
                    committed: true,
                    value: None,
                    revision,
                })
            }
            TxDecision::Abort => Ok(UpdateOutcome {
                committed: false,
                value: current,
                revision: inner.revision,
            }),
        }
    }

    async fn append(&self, list_key: &str, value: Value) -> StoreResult<String> {
        let mut inner = self.inner.write();
        let id = format!("{:016x}", inner.revision + 1);
        let key = format!("{}/{}", list_key.trim_end_matches('/'), id);
        self.apply(&mut inner, &key, Some(value));
        Ok(id)
    }
}
