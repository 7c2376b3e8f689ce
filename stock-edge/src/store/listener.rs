//! Store change listener
//!
//! Keeps the replica's confirmed layer in step with the store. On start
//! (and after falling behind the change stream) it reloads the whole
//! keyspace; otherwise it applies each change as it arrives. Remote values
//! win over local pending writes for the same key.

use shared::{InventorySettings, PositionKey, Product, Shelf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::keys::{self, StoreKey};
use super::{StoreAdapter, StoreChange, StoreResult, StoreSubscription, SubscriptionError};
use crate::grid::SharedReplica;
use crate::settings::SharedSettings;

pub struct StoreListener {
    store: Arc<dyn StoreAdapter>,
    replica: SharedReplica,
    settings: SharedSettings,
    shutdown: CancellationToken,
}

impl StoreListener {
    pub fn new(
        store: Arc<dyn StoreAdapter>,
        replica: SharedReplica,
        settings: SharedSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            replica,
            settings,
            shutdown,
        }
    }

    /// Replace the confirmed layer with the store's current contents
    pub async fn reload(&self) -> StoreResult<()> {
        let mut shelves = Vec::new();
        for (key, value) in self.store.list(keys::SHELVES).await? {
            match serde_json::from_value::<Shelf>(value) {
                Ok(shelf) => shelves.push(shelf),
                Err(e) => tracing::warn!(key = %key, "Skipping unreadable shelf: {e}"),
            }
        }

        let mut positions = Vec::new();
        for (key, value) in self.store.list(keys::POSITIONS).await? {
            let Some(StoreKey::Position(position)) = StoreKey::parse(&key) else {
                tracing::warn!(key = %key, "Skipping malformed position key");
                continue;
            };
            match serde_json::from_value::<Product>(value) {
                Ok(product) => positions.push((position, product)),
                Err(e) => tracing::warn!(key = %key, "Skipping unreadable product: {e}"),
            }
        }

        let settings = match self.store.read(keys::SETTINGS).await? {
            Some(value) => serde_json::from_value::<InventorySettings>(value).unwrap_or_else(|e| {
                tracing::warn!("Unreadable settings document, using defaults: {e}");
                InventorySettings::default()
            }),
            None => InventorySettings::default(),
        };

        tracing::info!(
            shelves = shelves.len(),
            positions = positions.len(),
            "Replica loaded from store"
        );
        self.replica.write().load(shelves, positions);
        *self.settings.write() = settings;
        Ok(())
    }

    /// Apply one change-stream event
    ///
    /// Unreadable values are skipped; only a real deletion clears a key.
    pub fn apply(&self, change: StoreChange) {
        match StoreKey::parse(&change.key) {
            Some(StoreKey::Shelf(id)) => {
                let Some(shelf) = decode::<Shelf>(&change) else {
                    return;
                };
                if self.replica.write().apply_shelf(id, shelf, change.revision) {
                    tracing::debug!(shelf_id = id, revision = change.revision, "Shelf changed remotely");
                }
            }
            Some(StoreKey::Position(key)) => self.apply_position(key, &change),
            Some(StoreKey::Settings) => {
                let Some(settings) = decode::<InventorySettings>(&change) else {
                    return;
                };
                *self.settings.write() = settings.unwrap_or_default();
                tracing::debug!(revision = change.revision, "Settings changed");
            }
            Some(StoreKey::AuditEntry) => {}
            None => tracing::trace!(key = %change.key, "Ignoring unknown store key"),
        }
    }

    fn apply_position(&self, key: PositionKey, change: &StoreChange) {
        let Some(product) = decode::<Product>(change) else {
            return;
        };
        if self.replica.write().apply_position(key, product, change.revision) {
            tracing::trace!(key = %key, revision = change.revision, "Position changed");
        }
    }

    /// Subscribe, load, then follow the change stream until shutdown
    pub async fn run(self) {
        // Subscribe before loading so nothing written in between is missed
        let subscription = self.store.subscribe("");
        if let Err(e) = self.reload().await {
            tracing::error!("Initial replica load failed: {e}");
        }
        self.follow(subscription).await;
    }

    /// Apply changes from an existing subscription until shutdown
    pub async fn follow(self, mut subscription: StoreSubscription) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Store listener received shutdown signal");
                    break;
                }
                change = subscription.recv() => match change {
                    Ok(change) => self.apply(change),
                    Err(SubscriptionError::Lagged(missed)) => {
                        tracing::warn!(missed, "Change stream lagged, reloading replica");
                        if let Err(e) = self.reload().await {
                            tracing::error!("Replica reload failed: {e}");
                        }
                    }
                    Err(SubscriptionError::Closed) => {
                        tracing::info!("Change stream closed, store listener stopping");
                        break;
                    }
                },
            }
        }
        subscription.unsubscribe();
    }
}

/// `Some(None)` for a deletion, `None` when the value cannot be read
fn decode<T: serde::de::DeserializeOwned>(change: &StoreChange) -> Option<Option<T>> {
    match change.value.clone().map(serde_json::from_value::<T>).transpose() {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!(
                key = %change.key,
                revision = change.revision,
                "Skipping unreadable value in change stream: {e}"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridReplica;
    use crate::settings::shared_settings;
    use crate::store::{MemoryStore, write_typed};
    use shared::ColorEntry;
    use std::time::Duration;

    fn listener(store: Arc<dyn StoreAdapter>) -> (StoreListener, SharedReplica, SharedSettings) {
        let replica = GridReplica::new().shared();
        let settings = shared_settings(InventorySettings::default());
        let listener = StoreListener::new(store, replica.clone(), settings.clone(), CancellationToken::new());
        (listener, replica, settings)
    }

    #[tokio::test]
    async fn reload_reads_whole_keyspace() {
        let store: Arc<dyn StoreAdapter> = Arc::new(MemoryStore::new());
        let shelf = Shelf::new(1, "S1", "C1", 2, 2);
        let product = Product::new("X1", "un", vec![ColorEntry::new("RED", 4)]);
        write_typed(store.as_ref(), &keys::shelf(1), Some(&shelf)).await.unwrap();
        write_typed(store.as_ref(), &keys::position(&PositionKey::new(1, 1, 1)), Some(&product))
            .await
            .unwrap();
        write_typed(
            store.as_ref(),
            keys::SETTINGS,
            Some(&InventorySettings {
                mirror_enabled: false,
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let (listener, replica, settings) = listener(store);
        listener.reload().await.unwrap();

        let replica = replica.read();
        assert_eq!(replica.shelf(1), Some(&shelf));
        assert_eq!(replica.product(&PositionKey::new(1, 1, 1)).unwrap().quantity_of("RED"), 4);
        assert!(!settings.read().mirror_enabled);
    }

    #[test]
    fn unreadable_changes_are_skipped_not_treated_as_deletions() {
        let (listener, replica, settings) = listener(Arc::new(MemoryStore::new()));
        let key = PositionKey::new(1, 0, 0);
        let change = |key: String, value: Option<serde_json::Value>, revision| StoreChange {
            key,
            value,
            revision,
        };

        listener.apply(change(
            keys::shelf(1),
            Some(serde_json::to_value(Shelf::new(1, "S1", "C1", 2, 2)).unwrap()),
            1,
        ));
        listener.apply(change(
            keys::position(&key),
            Some(serde_json::json!({"sku": "X1", "colors": [{"code": "RED", "quantity": 3}]})),
            2,
        ));
        listener.apply(change(
            keys::SETTINGS.to_string(),
            Some(serde_json::json!({"mirror_enabled": false})),
            3,
        ));
        assert!(!settings.read().mirror_enabled);

        // Garbage for every key kind leaves the replica as it was
        listener.apply(change(keys::shelf(1), Some(serde_json::json!("garbage")), 4));
        listener.apply(change(keys::position(&key), Some(serde_json::json!({"colors": 7})), 5));
        listener.apply(change(keys::SETTINGS.to_string(), Some(serde_json::json!([1, 2])), 6));

        assert!(replica.read().shelf(1).is_some());
        assert_eq!(replica.read().product(&key).unwrap().quantity_of("RED"), 3);
        // Defaults would turn the mirror back on
        assert!(!settings.read().mirror_enabled);

        // A real deletion still clears the position
        listener.apply(change(keys::position(&key), None, 7));
        assert!(replica.read().product(&key).is_none());
    }

    #[tokio::test]
    async fn run_follows_remote_changes_until_shutdown() {
        let store: Arc<dyn StoreAdapter> = Arc::new(MemoryStore::new());
        let (listener, replica, _) = listener(store.clone());
        let shutdown = listener.shutdown.clone();
        let handle = tokio::spawn(listener.run());

        let key = PositionKey::new(1, 0, 0);
        write_typed(store.as_ref(), &keys::shelf(1), Some(&Shelf::new(1, "S1", "C1", 1, 1)))
            .await
            .unwrap();
        write_typed(
            store.as_ref(),
            &keys::position(&key),
            Some(&Product::new("X1", "un", vec![ColorEntry::new("RED", 2)])),
        )
        .await
        .unwrap();

        // Remote writes reach the replica through the change stream
        let mut seen = false;
        for _ in 0..50 {
            if replica.read().product(&key).is_some() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen);

        store.write(&keys::position(&key), None).await.unwrap();
        for _ in 0..50 {
            if replica.read().product(&key).is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(replica.read().product(&key).is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
