use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use shared::{Actor, AuditAction, ColorEntry, PositionKey, Product, SyncAction};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::plan::{self, MoveKind};
use super::{MoveMode, MoveReceipt, MoveRequest, MoveState};
use crate::audit::AuditRecorder;
use crate::inventory::{InventoryError, InventoryResult, PositionWriter};
use crate::report::aggregate_for;
use crate::sync::SyncDispatcher;

/// Reservation of position keys for one transaction
///
/// Released on drop, whichever way the transaction ends.
struct KeyClaim {
    in_flight: Arc<DashMap<PositionKey, u64>>,
    id: u64,
    keys: Vec<PositionKey>,
}

impl Drop for KeyClaim {
    fn drop(&mut self) {
        for key in &self.keys {
            self.in_flight.remove_if(key, |_, owner| *owner == self.id);
        }
    }
}

/// A move between `begin_move` and `commit`/`abort`
pub struct MoveTransaction {
    id: u64,
    request: MoveRequest,
    kind: MoveKind,
    state: MoveState,
    started_at: i64,
    source_before: Product,
    destination_before: Option<Product>,
    _claim: KeyClaim,
}

impl std::fmt::Debug for MoveTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveTransaction")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl MoveTransaction {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &MoveRequest {
        &self.request
    }

    pub fn kind(&self) -> &MoveKind {
        &self.kind
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }
}

/// Store-side effect of a commit
struct Applied {
    sku: String,
    moved: Vec<ColorEntry>,
    returned: Vec<ColorEntry>,
    source_after: Option<Product>,
    destination_after: Option<Product>,
}

fn stamped(mut product: Product, now: i64) -> Product {
    product.last_modified = now;
    product
}

/// Move transaction manager
///
/// Owns the per-process reservation table. Cross-client races are settled
/// by the store (last write wins); the reservation only keeps this process
/// from running two moves over the same key.
pub struct MoveManager {
    writer: Arc<PositionWriter>,
    audit: Arc<dyn AuditRecorder>,
    sync: SyncDispatcher,
    in_flight: Arc<DashMap<PositionKey, u64>>,
    next_id: AtomicU64,
}

impl MoveManager {
    pub fn new(writer: Arc<PositionWriter>, audit: Arc<dyn AuditRecorder>, sync: SyncDispatcher) -> Self {
        Self {
            writer,
            audit,
            sync,
            in_flight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Whether a pending move holds `key`
    pub fn is_busy(&self, key: &PositionKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn claim(&self, id: u64, keys: [PositionKey; 2]) -> InventoryResult<KeyClaim> {
        let mut claim = KeyClaim {
            in_flight: self.in_flight.clone(),
            id,
            keys: Vec::with_capacity(2),
        };
        for key in keys {
            let busy = match self.in_flight.entry(key) {
                Entry::Occupied(_) => true,
                Entry::Vacant(slot) => {
                    slot.insert(id);
                    false
                }
            };
            if busy {
                return Err(InventoryError::LocationBusy(key));
            }
            claim.keys.push(key);
        }
        Ok(claim)
    }

    /// Validate a move and reserve both keys
    pub fn begin_move(&self, request: MoveRequest) -> InventoryResult<MoveTransaction> {
        let source = request.source;
        let destination = request.destination;

        if source == destination {
            return Err(InventoryError::SameLocation(source));
        }
        if request.quantity.as_ref().is_some_and(|q| q.quantity == 0) {
            return Err(InventoryError::InvalidQuantity);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let claim = self.claim(id, [source, destination])?;

        let (source_before, destination_before) = {
            let replica = self.writer.replica().read();
            replica.confirmed().check_position(&source)?;
            replica.confirmed().check_position(&destination)?;
            let source_before = replica
                .product(&source)
                .ok_or(InventoryError::SourceEmpty(source))?;
            (source_before, replica.product(&destination))
        };

        let kind = plan::resolve_kind(source, &source_before, request.quantity.as_ref(), request.mode)?;

        if request.mode == MoveMode::Standard
            && let Some(dest) = &destination_before
            && dest.sku != source_before.sku
        {
            return Err(InventoryError::DestinationOccupied {
                key: destination,
                sku: dest.sku.clone(),
            });
        }

        tracing::debug!(
            move_id = id,
            source = %source,
            destination = %destination,
            kind = ?kind,
            mode = ?request.mode,
            "Move pending"
        );

        Ok(MoveTransaction {
            id,
            request,
            kind,
            state: MoveState::Pending,
            started_at: shared::util::now_millis(),
            source_before,
            destination_before,
            _claim: claim,
        })
    }

    /// Drop a pending transaction without writing anything
    pub fn abort(&self, mut tx: MoveTransaction) {
        tx.state = MoveState::Aborted;
        tracing::debug!(move_id = tx.id, "Move aborted before commit");
    }

    /// Write source then destination; undo the source write if the
    /// destination write fails
    ///
    /// Both shelves are held for the whole commit, so neither can be
    /// resized or removed between the writes and a rollback.
    pub async fn commit(&self, mut tx: MoveTransaction, actor: &Actor) -> InventoryResult<MoveReceipt> {
        let now = shared::util::now_millis();
        let _access = self
            .writer
            .access_shelves([tx.request.source.shelf_id, tx.request.destination.shelf_id])
            .await;
        let result = match tx.request.mode {
            MoveMode::Standard => self.commit_standard(&tx, now).await,
            MoveMode::Swap => self.commit_swap(&tx, now).await,
        };

        let applied = match result {
            Ok(applied) => applied,
            Err(e) => {
                tx.state = MoveState::Aborted;
                tracing::warn!(
                    move_id = tx.id,
                    source = %tx.request.source,
                    destination = %tx.request.destination,
                    "Move aborted: {e}"
                );
                return Err(e);
            }
        };

        tx.state = MoveState::Committed;
        let receipt = MoveReceipt {
            id: tx.id,
            state: tx.state,
            mode: tx.request.mode,
            source: tx.request.source,
            destination: tx.request.destination,
            sku: applied.sku,
            moved: applied.moved,
            returned: applied.returned,
            source_after: applied.source_after,
            destination_after: applied.destination_after,
            started_at: tx.started_at,
            committed_at: now,
        };

        tracing::info!(
            move_id = receipt.id,
            sku = %receipt.sku,
            source = %receipt.source,
            destination = %receipt.destination,
            "Move committed"
        );
        self.record_move(actor, &receipt);
        self.notify_move(actor, &receipt);
        Ok(receipt)
    }

    /// `begin_move` + `commit`
    pub async fn move_product(&self, actor: &Actor, request: MoveRequest) -> InventoryResult<MoveReceipt> {
        let tx = self.begin_move(request)?;
        self.commit(tx, actor).await
    }

    async fn commit_standard(&self, tx: &MoveTransaction, now: i64) -> InventoryResult<Applied> {
        let source = tx.request.source;
        let destination = tx.request.destination;
        let kind = tx.kind.clone();

        let source_update = self
            .writer
            .update_held(source, |current| {
                plan::take_from_source(source, current, &kind)
                    .map(|(left, _)| left.map(|p| stamped(p, now)))
            })
            .await?;
        let (_, taken) = plan::take_from_source(source, source_update.before.clone(), &kind)?;
        let incoming = stamped(taken.clone(), now);

        let destination_update = match self
            .writer
            .update_held(destination, |current| {
                plan::place_at_destination(destination, current, &incoming)
                    .map(|p| Some(stamped(p, now)))
            })
            .await
        {
            Ok(update) => update,
            Err(e) => return Err(self.roll_back(tx.id, source, source_update.before, e).await),
        };

        Ok(Applied {
            sku: taken.sku,
            moved: taken.colors,
            returned: Vec::new(),
            source_after: source_update.after,
            destination_after: destination_update.after,
        })
    }

    async fn commit_swap(&self, tx: &MoveTransaction, now: i64) -> InventoryResult<Applied> {
        let source = tx.request.source;
        let destination = tx.request.destination;
        let expected_source = tx.source_before.clone();
        let expected_destination = tx.destination_before.clone();

        let source_update = self
            .writer
            .update_held(source, |current| {
                if !plan::same_content(current.as_ref(), Some(&expected_source)) {
                    return Err(InventoryError::LocationBusy(source));
                }
                Ok(expected_destination.clone().map(|p| stamped(p, now)))
            })
            .await?;

        let destination_update = match self
            .writer
            .update_held(destination, |current| {
                if !plan::same_content(current.as_ref(), expected_destination.as_ref()) {
                    return Err(InventoryError::LocationBusy(destination));
                }
                Ok(Some(stamped(expected_source.clone(), now)))
            })
            .await
        {
            Ok(update) => update,
            Err(e) => return Err(self.roll_back(tx.id, source, source_update.before, e).await),
        };

        Ok(Applied {
            sku: expected_source.sku,
            moved: expected_source.colors,
            returned: expected_destination.map(|p| p.colors).unwrap_or_default(),
            source_after: source_update.after,
            destination_after: destination_update.after,
        })
    }

    /// Put the source back to its pre-transaction value
    ///
    /// Store failures on the destination surface as `PartialCommitFailure`;
    /// a destination that rejected the write keeps its own error once the
    /// source is restored.
    async fn roll_back(
        &self,
        move_id: u64,
        source: PositionKey,
        before: Option<Product>,
        cause: InventoryError,
    ) -> InventoryError {
        let write_failed = matches!(cause, InventoryError::StoreUnavailable(_));
        match self.writer.restore(source, before).await {
            Ok(()) => {
                tracing::warn!(move_id, source = %source, "Destination write failed, source restored: {cause}");
                if write_failed {
                    InventoryError::PartialCommitFailure {
                        reason: cause.to_string(),
                        rolled_back: true,
                    }
                } else {
                    cause
                }
            }
            Err(rollback_err) => {
                tracing::error!(
                    move_id,
                    source = %source,
                    "Source rollback failed, units may be missing: {rollback_err}"
                );
                InventoryError::PartialCommitFailure {
                    reason: format!("{cause}; rollback failed: {rollback_err}"),
                    rolled_back: false,
                }
            }
        }
    }

    fn record_move(&self, actor: &Actor, receipt: &MoveReceipt) {
        let color = receipt
            .moved
            .iter()
            .map(|c| c.code.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let quantity: u64 = receipt.moved.iter().map(|c| c.quantity).sum();
        self.audit.record(
            actor,
            AuditAction::ProductMoved,
            json!({
                "from": receipt.source.to_string(),
                "to": receipt.destination.to_string(),
                "sku": receipt.sku,
                "color": color,
                "quantity": quantity,
                "colors": receipt.moved,
                "mode": receipt.mode,
            }),
            &receipt.source.to_string(),
        );
    }

    /// One sync task per moved SKU+color; totals are unchanged by a move
    fn notify_move(&self, actor: &Actor, receipt: &MoveReceipt) {
        let view = self.writer.replica().read().view();

        let mut touched: Vec<(String, &ColorEntry)> = receipt
            .moved
            .iter()
            .map(|c| (receipt.sku.clone(), c))
            .collect();
        if let Some(returned) = receipt.source_after.as_ref().filter(|_| receipt.mode == MoveMode::Swap) {
            touched.extend(receipt.returned.iter().map(|c| (returned.sku.clone(), c)));
        }

        for (sku, entry) in touched {
            let snapshot = aggregate_for(&view, &sku, &entry.code);
            self.sync.notify(
                &sku,
                &entry.code,
                snapshot,
                &actor.display_name,
                SyncAction::Update,
                entry.quantity,
                entry.quantity,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::RecordingAudit;
    use crate::grid::GridReplica;
    use crate::settings::shared_settings;
    use crate::store::testing::FlakyStore;
    use crate::store::{MemoryStore, StoreAdapter};
    use shared::{InventorySettings, Shelf};

    const A1: PositionKey = PositionKey::new(1, 0, 0);
    const A2: PositionKey = PositionKey::new(1, 0, 1);
    const A3: PositionKey = PositionKey::new(1, 0, 2);
    const A4: PositionKey = PositionKey::new(1, 0, 3);

    struct Fixture {
        manager: MoveManager,
        writer: Arc<PositionWriter>,
        store: Arc<FlakyStore>,
        audit: Arc<RecordingAudit>,
    }

    fn create_test_manager() -> Fixture {
        let store = Arc::new(FlakyStore::new(Arc::new(MemoryStore::new())));
        let mut replica = GridReplica::new();
        replica.apply_shelf(1, Some(Shelf::new(1, "S1", "C1", 4, 6)), 0);
        let writer = Arc::new(PositionWriter::new(replica.shared(), store.clone()));
        let audit = Arc::new(RecordingAudit::default());
        let sync = SyncDispatcher::disabled(shared_settings(InventorySettings::default()));
        let manager = MoveManager::new(writer.clone(), audit.clone(), sync);
        Fixture {
            manager,
            writer,
            store,
            audit,
        }
    }

    fn product(sku: &str, colors: &[(&str, u64)]) -> Product {
        Product::new(
            sku,
            "un",
            colors.iter().map(|(c, q)| ColorEntry::new(*c, *q)).collect(),
        )
    }

    impl Fixture {
        async fn put(&self, key: PositionKey, p: Product) {
            self.writer.update(key, |_| Ok(Some(p.clone()))).await.unwrap();
        }

        fn qty(&self, key: PositionKey, color: &str) -> u64 {
            self.writer
                .replica()
                .read()
                .product(&key)
                .map(|p| p.quantity_of(color))
                .unwrap_or(0)
        }

        async fn stored(&self, key: PositionKey) -> Option<Product> {
            crate::store::read_typed(self.store.as_ref() as &dyn StoreAdapter, &crate::store::keys::position(&key))
                .await
                .unwrap()
        }
    }

    // ========================================================================
    // Partial and full moves
    // ========================================================================

    #[tokio::test]
    async fn partial_move_to_empty_destination() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;

        let receipt = f
            .manager
            .move_product(&Actor::system(), MoveRequest::partial(A1, A2, "RED", 3))
            .await
            .unwrap();

        assert_eq!(receipt.state, MoveState::Committed);
        assert_eq!(f.qty(A1, "RED"), 2);
        assert_eq!(f.qty(A2, "RED"), 3);
        assert_eq!(f.stored(A1).await.unwrap().quantity_of("RED"), 2);
        assert_eq!(f.stored(A2).await.unwrap().quantity_of("RED"), 3);
        assert_eq!(f.manager.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn moving_the_remainder_leaves_no_husk() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 2)])).await;
        f.put(A2, product("X1", &[("RED", 3)])).await;

        f.manager
            .move_product(&Actor::system(), MoveRequest::partial(A1, A2, "RED", 2))
            .await
            .unwrap();

        assert!(f.stored(A1).await.is_none());
        assert!(f.writer.replica().read().product(&A1).is_none());
        assert_eq!(f.qty(A2, "RED"), 5);
    }

    #[tokio::test]
    async fn full_move_carries_every_color() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 2), ("BLUE", 4)])).await;

        let receipt = f
            .manager
            .move_product(&Actor::system(), MoveRequest::full(A1, A2))
            .await
            .unwrap();

        assert_eq!(receipt.moved.len(), 2);
        assert!(receipt.source_after.is_none());
        assert_eq!(f.qty(A2, "RED"), 2);
        assert_eq!(f.qty(A2, "BLUE"), 4);
    }

    #[tokio::test]
    async fn same_sku_destination_is_merged() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 2)])).await;
        f.put(A2, product("X1", &[("RED", 1), ("BLUE", 1)])).await;

        f.manager
            .move_product(&Actor::system(), MoveRequest::full(A1, A2))
            .await
            .unwrap();
        assert_eq!(f.qty(A2, "RED"), 3);
        assert_eq!(f.qty(A2, "BLUE"), 1);
    }

    #[tokio::test]
    async fn swap_exchanges_cells() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 2)])).await;
        f.put(A2, product("Y2", &[("BLUE", 7)])).await;

        let receipt = f
            .manager
            .move_product(&Actor::system(), MoveRequest::swap(A1, A2))
            .await
            .unwrap();

        assert_eq!(receipt.returned, vec![ColorEntry::new("BLUE", 7)]);
        assert_eq!(f.stored(A1).await.unwrap().sku, "Y2");
        assert_eq!(f.stored(A2).await.unwrap().sku, "X1");
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_reserving() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;
        f.put(A3, product("Y9", &[("RED", 1)])).await;

        assert!(matches!(
            f.manager.begin_move(MoveRequest::full(A1, A1)),
            Err(InventoryError::SameLocation(_))
        ));
        assert!(matches!(
            f.manager.begin_move(MoveRequest::full(A2, A1)),
            Err(InventoryError::SourceEmpty(_))
        ));
        assert!(matches!(
            f.manager.begin_move(MoveRequest::partial(A1, A2, "RED", 6)),
            Err(InventoryError::InsufficientQuantity { .. })
        ));
        assert!(matches!(
            f.manager.begin_move(MoveRequest::partial(A1, A2, "RED", 0)),
            Err(InventoryError::InvalidQuantity)
        ));
        assert!(matches!(
            f.manager.begin_move(MoveRequest::full(A1, A3)),
            Err(InventoryError::DestinationOccupied { .. })
        ));
        assert!(matches!(
            f.manager.begin_move(MoveRequest::full(A1, PositionKey::new(1, 9, 9))),
            Err(InventoryError::InvalidPosition(_))
        ));
        assert_eq!(f.manager.in_flight_count(), 0);
    }

    // ========================================================================
    // Exclusivity
    // ========================================================================

    #[tokio::test]
    async fn overlapping_moves_fail_with_location_busy() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;
        f.put(A3, product("X1", &[("RED", 1)])).await;

        let first = f.manager.begin_move(MoveRequest::partial(A1, A2, "RED", 1)).unwrap();
        assert!(f.manager.is_busy(&A1));
        assert!(f.manager.is_busy(&A2));

        // Shares the source
        assert!(matches!(
            f.manager.begin_move(MoveRequest::partial(A1, A4, "RED", 1)),
            Err(InventoryError::LocationBusy(k)) if k == A1
        ));
        // Shares the destination
        assert!(matches!(
            f.manager.begin_move(MoveRequest::full(A3, A2)),
            Err(InventoryError::LocationBusy(k)) if k == A2
        ));
        // A failed claim releases what it took
        assert!(!f.manager.is_busy(&A3));

        f.manager.commit(first, &Actor::system()).await.unwrap();
        assert_eq!(f.manager.in_flight_count(), 0);
        f.manager.begin_move(MoveRequest::full(A3, A2)).unwrap();
    }

    #[tokio::test]
    async fn abort_releases_keys_without_writing() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;

        let tx = f.manager.begin_move(MoveRequest::full(A1, A2)).unwrap();
        assert_eq!(tx.state(), MoveState::Pending);
        f.manager.abort(tx);

        assert_eq!(f.manager.in_flight_count(), 0);
        assert_eq!(f.qty(A1, "RED"), 5);
        assert!(f.audit.events().is_empty());
    }

    // ========================================================================
    // Failure and rollback
    // ========================================================================

    #[tokio::test]
    async fn destination_failure_rolls_back_source() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;

        // Source write passes, destination write fails, rollback passes
        f.store.fail_after(1);
        let err = f
            .manager
            .move_product(&Actor::system(), MoveRequest::partial(A1, A2, "RED", 3))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::PartialCommitFailure { rolled_back: true, .. }
        ));
        assert_eq!(f.stored(A1).await.unwrap().quantity_of("RED"), 5);
        assert!(f.stored(A2).await.is_none());
        assert_eq!(f.qty(A1, "RED") + f.qty(A2, "RED"), 5);
        assert_eq!(f.manager.in_flight_count(), 0);
        assert!(f.audit.events().is_empty());
    }

    #[tokio::test]
    async fn failed_rollback_reports_units_missing() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;

        // Source write passes; destination write and rollback both fail
        f.store.fail_from(1);
        let err = f
            .manager
            .move_product(&Actor::system(), MoveRequest::partial(A1, A2, "RED", 3))
            .await
            .unwrap_err();
        f.store.fail_after(usize::MAX);

        assert!(matches!(
            err,
            InventoryError::PartialCommitFailure { rolled_back: false, ref reason }
                if reason.contains("rollback failed")
        ));
        // The replica mirrors the store: the source write landed, nothing else did
        assert_eq!(f.stored(A1).await.unwrap().quantity_of("RED"), 2);
        assert!(f.stored(A2).await.is_none());
        assert_eq!(f.qty(A1, "RED"), 2);
        assert_eq!(f.qty(A2, "RED"), 0);
        assert_eq!(f.manager.in_flight_count(), 0);
        assert!(f.audit.events().is_empty());
    }

    #[tokio::test]
    async fn swap_destination_failure_restores_source() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 2)])).await;
        f.put(A2, product("Y2", &[("BLUE", 7)])).await;

        f.store.fail_after(1);
        let err = f
            .manager
            .move_product(&Actor::system(), MoveRequest::swap(A1, A2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::PartialCommitFailure { rolled_back: true, .. }
        ));
        let source = f.stored(A1).await.unwrap();
        assert_eq!((source.sku.as_str(), source.quantity_of("RED")), ("X1", 2));
        let destination = f.stored(A2).await.unwrap();
        assert_eq!((destination.sku.as_str(), destination.quantity_of("BLUE")), ("Y2", 7));
        assert_eq!(f.qty(A1, "RED"), 2);
        assert_eq!(f.qty(A2, "BLUE"), 7);
        assert_eq!(f.manager.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn swap_with_changed_destination_keeps_its_own_error() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 2)])).await;
        f.put(A2, product("Y2", &[("BLUE", 7)])).await;

        let tx = f.manager.begin_move(MoveRequest::swap(A1, A2)).unwrap();
        // Another writer changes the destination after the move was planned
        f.put(A2, product("Y2", &[("BLUE", 6)])).await;

        let err = f.manager.commit(tx, &Actor::system()).await.unwrap_err();
        assert!(matches!(err, InventoryError::LocationBusy(k) if k == A2));
        assert_eq!(f.stored(A1).await.unwrap().sku, "X1");
        assert_eq!(f.stored(A2).await.unwrap().quantity_of("BLUE"), 6);
        assert_eq!(f.manager.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn source_failure_writes_nothing() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;

        f.store.set_offline(true);
        let err = f
            .manager
            .move_product(&Actor::system(), MoveRequest::full(A1, A2))
            .await
            .unwrap_err();
        f.store.set_offline(false);

        assert!(matches!(err, InventoryError::StoreUnavailable(_)));
        assert_eq!(f.stored(A1).await.unwrap().quantity_of("RED"), 5);
        assert_eq!(f.qty(A1, "RED"), 5);
        assert_eq!(f.manager.in_flight_count(), 0);
    }

    // ========================================================================
    // Side effects
    // ========================================================================

    #[tokio::test]
    async fn commit_records_one_product_moved_event() {
        let f = create_test_manager();
        f.put(A1, product("X1", &[("RED", 5)])).await;
        let actor = Actor::new("u1", "Ana", "ana@example.com");

        f.manager
            .move_product(&actor, MoveRequest::partial(A1, A2, "RED", 3))
            .await
            .unwrap();

        let events = f.audit.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::ProductMoved);
        assert_eq!(events[0].actor, actor);
        assert_eq!(events[0].details["from"], "1/0/0");
        assert_eq!(events[0].details["to"], "1/0/1");
        assert_eq!(events[0].details["sku"], "X1");
        assert_eq!(events[0].details["color"], "RED");
        assert_eq!(events[0].details["quantity"], 3);
    }
}
