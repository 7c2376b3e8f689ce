//! Position writes
//!
//! Every product change goes through [`PositionWriter::update`]: the new
//! value is staged in the replica, computed against the latest stored value
//! inside the store's atomic update, then acknowledged (or discarded).
//!
//! Cell writes hold a shared lock on their shelf; structural shelf changes
//! (resize, removal) hold it exclusively from their checks until the shelf
//! record is written, so a cell can never land outside its shelf.

use dashmap::DashMap;
use shared::{PositionKey, Product};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::error::{InventoryError, InventoryResult};
use crate::grid::SharedReplica;
use crate::store::{StoreAdapter, TxDecision, keys};

/// Stored value before and after one position update
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub before: Option<Product>,
    pub after: Option<Product>,
}

/// Exclusive hold on one shelf's structure
pub struct ShelfLock {
    _guard: OwnedRwLockWriteGuard<()>,
}

/// Shared hold on the shelves whose cells are being written
pub struct ShelfAccess {
    _guards: Vec<OwnedRwLockReadGuard<()>>,
}

pub struct PositionWriter {
    replica: SharedReplica,
    store: Arc<dyn StoreAdapter>,
    shelf_locks: DashMap<i64, Arc<RwLock<()>>>,
}

impl PositionWriter {
    pub fn new(replica: SharedReplica, store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            replica,
            store,
            shelf_locks: DashMap::new(),
        }
    }

    pub fn replica(&self) -> &SharedReplica {
        &self.replica
    }

    pub fn store(&self) -> &Arc<dyn StoreAdapter> {
        &self.store
    }

    fn shelf_lock(&self, shelf_id: i64) -> Arc<RwLock<()>> {
        let lock = self.shelf_locks.entry(shelf_id).or_default();
        Arc::clone(lock.value())
    }

    /// Wait until no cell of `shelf_id` is being written, then block new writes
    pub async fn lock_shelf(&self, shelf_id: i64) -> ShelfLock {
        ShelfLock {
            _guard: self.shelf_lock(shelf_id).write_owned().await,
        }
    }

    /// Shared hold on every shelf in `shelf_ids`, taken in id order
    pub async fn access_shelves(&self, shelf_ids: impl IntoIterator<Item = i64>) -> ShelfAccess {
        let ids: BTreeSet<i64> = shelf_ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.shelf_lock(id).read_owned().await);
        }
        ShelfAccess { _guards: guards }
    }

    /// Atomically transform the product at `key`
    ///
    /// `f` maps the current product to the new one (`None` clears the
    /// slot) or rejects the change. It runs once against the local view to
    /// stage an optimistic value and again against the stored value, which
    /// is the one that counts. Results are normalized, so a product without
    /// units is never written.
    pub async fn update<F>(&self, key: PositionKey, f: F) -> InventoryResult<PositionUpdate>
    where
        F: FnMut(Option<Product>) -> InventoryResult<Option<Product>> + Send,
    {
        let _access = self.access_shelves([key.shelf_id]).await;
        self.update_held(key, f).await
    }

    /// [`update`](Self::update) for a caller already holding a
    /// [`ShelfAccess`] or [`ShelfLock`] on `key.shelf_id`
    ///
    /// Bounds are checked here, after the hold was taken, against the
    /// latest confirmed shelf.
    pub async fn update_held<F>(&self, key: PositionKey, mut f: F) -> InventoryResult<PositionUpdate>
    where
        F: FnMut(Option<Product>) -> InventoryResult<Option<Product>> + Send,
    {
        self.replica.read().confirmed().check_position(&key)?;

        let local = self.replica.read().product(&key);
        let pending = match f(local) {
            Ok(guess) => Some(self.replica.write().stage(key, guess)),
            Err(_) => None,
        };

        let mut before: Option<Product> = None;
        let mut after: Option<Product> = None;
        let mut rejection: Option<InventoryError> = None;

        let mut decide = |current: Option<serde_json::Value>| {
            rejection = None;
            let current: Option<Product> = match current.map(serde_json::from_value).transpose() {
                Ok(p) => p,
                Err(e) => {
                    rejection = Some(InventoryError::StoreUnavailable(format!(
                        "unreadable product at {key}: {e}"
                    )));
                    return TxDecision::Abort;
                }
            };
            before = current.clone();

            match f(current).map(|next| next.and_then(Product::normalized)) {
                Ok(Some(product)) => match serde_json::to_value(&product) {
                    Ok(value) => {
                        after = Some(product);
                        TxDecision::Set(value)
                    }
                    Err(e) => {
                        rejection = Some(InventoryError::StoreUnavailable(e.to_string()));
                        TxDecision::Abort
                    }
                },
                Ok(None) => {
                    after = None;
                    TxDecision::Delete
                }
                Err(e) => {
                    rejection = Some(e);
                    TxDecision::Abort
                }
            }
        };

        let result = self.store.atomic_update(&keys::position(&key), &mut decide).await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Some(id) = pending {
                    self.replica.write().discard(id, key);
                }
                tracing::warn!(key = %key, "Position write failed: {e}");
                return Err(e.into());
            }
        };

        if let Some(err) = rejection {
            if let Some(id) = pending {
                self.replica.write().discard(id, key);
            }
            return Err(err);
        }

        {
            let mut replica = self.replica.write();
            match pending {
                Some(id) => replica.acknowledge(id, key, after.clone(), outcome.revision),
                None => {
                    replica.apply_position(key, after.clone(), outcome.revision);
                }
            }
        }

        Ok(PositionUpdate { before, after })
    }

    /// Put back a value read earlier (caller holds the shelf, as for
    /// [`update_held`](Self::update_held))
    pub async fn restore(&self, key: PositionKey, value: Option<Product>) -> InventoryResult<()> {
        self.update_held(key, |_| Ok(value.clone())).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridReplica;
    use crate::store::MemoryStore;
    use crate::store::testing::FlakyStore;
    use shared::{ColorEntry, Shelf};

    fn red(qty: u64) -> Product {
        Product::new("X1", "un", vec![ColorEntry::new("RED", qty)])
    }

    fn writer(store: Arc<dyn StoreAdapter>) -> PositionWriter {
        let mut replica = GridReplica::new();
        replica.apply_shelf(1, Some(Shelf::new(1, "S1", "C1", 2, 2)), 0);
        PositionWriter::new(replica.shared(), store)
    }

    #[tokio::test]
    async fn update_writes_store_and_confirms_replica() {
        let store = Arc::new(MemoryStore::new());
        let writer = writer(store.clone());
        let key = PositionKey::new(1, 0, 0);

        let update = writer.update(key, |_| Ok(Some(red(5)))).await.unwrap();
        assert!(update.before.is_none());
        assert_eq!(update.after.as_ref().unwrap().quantity_of("RED"), 5);

        let stored = crate::store::read_typed::<Product>(store.as_ref(), "positions/1/0/0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.quantity_of("RED"), 5);

        let replica = writer.replica().read();
        assert!(!replica.has_pending(&key));
        assert_eq!(replica.confirmed().get_product(&key).unwrap().quantity_of("RED"), 5);
    }

    #[tokio::test]
    async fn husk_results_delete_the_key() {
        let store = Arc::new(MemoryStore::new());
        let writer = writer(store.clone());
        let key = PositionKey::new(1, 0, 0);

        writer.update(key, |_| Ok(Some(red(5)))).await.unwrap();
        let update = writer.update(key, |_| Ok(Some(red(0)))).await.unwrap();
        assert!(update.after.is_none());
        assert_eq!(store.read("positions/1/0/0").await.unwrap(), None);
        assert!(writer.replica().read().product(&key).is_none());
    }

    #[tokio::test]
    async fn closure_sees_stored_value_not_stale_replica() {
        let store = Arc::new(MemoryStore::new());
        let writer = writer(store.clone());
        let key = PositionKey::new(1, 0, 0);

        // Another client wrote 9 units; the replica has not heard about it
        crate::store::write_typed(store.as_ref(), "positions/1/0/0", Some(&red(9)))
            .await
            .unwrap();

        let update = writer
            .update(key, |current| {
                let mut p = current.unwrap_or_else(|| red(0));
                p.add_quantity("RED", 1).unwrap();
                Ok(Some(p))
            })
            .await
            .unwrap();
        assert_eq!(update.before.unwrap().quantity_of("RED"), 9);
        assert_eq!(update.after.unwrap().quantity_of("RED"), 10);
    }

    #[tokio::test]
    async fn store_failure_discards_staged_value() {
        let flaky = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        let writer = writer(flaky.clone());
        let key = PositionKey::new(1, 0, 0);

        flaky.set_offline(true);
        let err = writer.update(key, |_| Ok(Some(red(5)))).await.unwrap_err();
        assert!(matches!(err, InventoryError::StoreUnavailable(_)));

        let replica = writer.replica().read();
        assert_eq!(replica.pending_count(), 0);
        assert!(replica.product(&key).is_none());
    }

    #[tokio::test]
    async fn rejection_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::new());
        let writer = writer(store.clone());
        let key = PositionKey::new(1, 0, 0);

        let err = writer
            .update(key, |current| match current {
                Some(p) => Ok(Some(p)),
                None => Err(InventoryError::SourceEmpty(key)),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::SourceEmpty(_)));
        assert_eq!(store.list("positions").await.unwrap().len(), 0);
    }
}
