//! Local replica of the shared grid
//!
//! Two layers:
//! - **confirmed**: what the store has acknowledged or pushed through its
//!   change stream
//! - **pending**: local writes staged before the store answered
//!
//! Readers see pending over confirmed. A pending write leaves the overlay
//! when its store call finishes (acknowledged or discarded); from then on
//! the confirmed layer holds whatever the store says, so a later remote
//! write wins over an earlier local one.

use parking_lot::RwLock;
use shared::{PositionKey, Product, Shelf};
use std::collections::HashMap;
use std::sync::Arc;

use super::model::GridState;
use crate::store::keys;

pub type SharedReplica = Arc<RwLock<GridReplica>>;

/// Handle to one staged write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(u64);

#[derive(Debug, Clone)]
struct PendingWrite {
    id: PendingId,
    value: Option<Product>,
}

#[derive(Debug, Default)]
pub struct GridReplica {
    confirmed: GridState,
    pending: HashMap<PositionKey, PendingWrite>,
    /// Last applied store revision per store key
    revisions: HashMap<String, u64>,
    next_pending: u64,
}

impl GridReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedReplica {
        Arc::new(RwLock::new(self))
    }

    pub fn confirmed(&self) -> &GridState {
        &self.confirmed
    }

    /// Snapshot of what local readers should see
    pub fn view(&self) -> GridState {
        let mut view = self.confirmed.clone();
        for (key, write) in &self.pending {
            view.put(*key, write.value.clone());
        }
        view
    }

    pub fn shelf(&self, id: i64) -> Option<&Shelf> {
        self.confirmed.shelf(id)
    }

    /// Product at `key`, pending value first
    pub fn product(&self, key: &PositionKey) -> Option<Product> {
        match self.pending.get(key) {
            Some(write) => write.value.clone(),
            None => self.confirmed.get_product(key).cloned(),
        }
    }

    pub fn has_pending(&self, key: &PositionKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ========== Local writes ==========

    /// Overlay a provisional value; replaces any older staged value
    pub fn stage(&mut self, key: PositionKey, value: Option<Product>) -> PendingId {
        self.next_pending += 1;
        let id = PendingId(self.next_pending);
        self.pending.insert(
            key,
            PendingWrite {
                id,
                value: value.and_then(Product::normalized),
            },
        );
        id
    }

    /// The store accepted the write as `value` at `revision`
    pub fn acknowledge(
        &mut self,
        id: PendingId,
        key: PositionKey,
        value: Option<Product>,
        revision: u64,
    ) {
        self.clear_pending(id, key);
        self.apply_position(key, value, revision);
    }

    /// The write never reached the store
    pub fn discard(&mut self, id: PendingId, key: PositionKey) {
        self.clear_pending(id, key);
    }

    fn clear_pending(&mut self, id: PendingId, key: PositionKey) {
        if self.pending.get(&key).is_some_and(|w| w.id == id) {
            self.pending.remove(&key);
        }
    }

    // ========== Store state ==========

    /// Returns false when `revision` is older than what is already applied
    fn advance(&mut self, store_key: String, revision: u64) -> bool {
        let last = self.revisions.entry(store_key).or_insert(0);
        if revision < *last {
            return false;
        }
        *last = revision;
        true
    }

    pub fn apply_position(&mut self, key: PositionKey, value: Option<Product>, revision: u64) -> bool {
        if !self.advance(keys::position(&key), revision) {
            return false;
        }
        self.confirmed.put(key, value);
        true
    }

    pub fn apply_shelf(&mut self, id: i64, shelf: Option<Shelf>, revision: u64) -> bool {
        if !self.advance(keys::shelf(id), revision) {
            return false;
        }
        match shelf {
            Some(shelf) => self.confirmed.put_shelf(shelf),
            None => {
                self.confirmed.drop_shelf(id);
            }
        }
        true
    }

    /// Replace the confirmed layer wholesale (startup, or after the change
    /// stream lagged). Staged writes are kept.
    pub fn load(&mut self, shelves: Vec<Shelf>, positions: Vec<(PositionKey, Product)>) {
        let mut confirmed = GridState::new();
        for shelf in shelves {
            confirmed.put_shelf(shelf);
        }
        for (key, product) in positions {
            confirmed.put(key, Some(product));
        }
        self.confirmed = confirmed;
        self.revisions.clear();
    }
}
