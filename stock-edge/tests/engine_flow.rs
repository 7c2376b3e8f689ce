//! End-to-end flows through a fully assembled engine
//!
//! Each test builds its own in-memory store, a recording mirror and a
//! running set of background tasks, then drives the public services.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{
    Actor, AuditAction, AuditEvent, ColorEntry, MirrorPayload, PositionKey, Product,
    ReportFilter, ReportSortKey, Shelf, SyncAction,
};
use std::sync::Arc;
use std::time::Duration;
use stock_edge::core::BackgroundTasks;
use stock_edge::{
    Config, EngineState, InventoryError, MemoryStore, MirrorClient, MirrorError, MoveRequest,
    StoreAdapter,
};

const A: PositionKey = PositionKey::new(1, 0, 0);
const B: PositionKey = PositionKey::new(1, 0, 1);
const C: PositionKey = PositionKey::new(1, 0, 2);

#[derive(Default)]
struct RecordingMirror {
    calls: Mutex<Vec<MirrorPayload>>,
}

impl RecordingMirror {
    fn calls(&self) -> Vec<MirrorPayload> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MirrorClient for RecordingMirror {
    async fn deliver(&self, payload: &MirrorPayload) -> Result<(), MirrorError> {
        self.calls.lock().push(payload.clone());
        Ok(())
    }
}

struct Engine {
    state: EngineState,
    tasks: BackgroundTasks,
    mirror: Arc<RecordingMirror>,
}

async fn engine_on(store: Arc<dyn StoreAdapter>, window_ms: u64) -> Engine {
    let mut config = Config::with_overrides("/tmp/stock-edge-flow-test", 0);
    config.sync_window_ms = window_ms;
    let mirror = Arc::new(RecordingMirror::default());
    let state = EngineState::assemble(&config, store, Some(mirror.clone() as Arc<dyn MirrorClient>));
    let tasks = state.start_background_tasks().await.unwrap();
    Engine { state, tasks, mirror }
}

async fn engine() -> Engine {
    engine_on(Arc::new(MemoryStore::new()), 100).await
}

fn ana() -> Actor {
    Actor::new("u1", "Ana", "ana@example.com")
}

fn red(quantity: u64) -> Product {
    Product::new("X1", "un", vec![ColorEntry::new("RED", quantity)])
}

async fn with_shelf(engine: &Engine) {
    engine
        .state
        .inventory
        .add_shelf(&ana(), Shelf::new(1, "Shelf 1", "C1", 4, 6))
        .await
        .unwrap();
}

fn total(engine: &Engine) -> u64 {
    engine.state.inventory.aggregate("X1", "RED").total_quantity
}

/// Poll until `check` holds or two seconds pass
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

async fn audit_log(store: &dyn StoreAdapter) -> Vec<AuditEvent> {
    store
        .list("audit_log")
        .await
        .unwrap()
        .into_iter()
        .map(|(_, value)| serde_json::from_value(value).unwrap())
        .collect()
}

#[tokio::test]
async fn single_position_shows_up_in_report() {
    let engine = engine().await;
    with_shelf(&engine).await;
    engine.state.inventory.set_product(&ana(), A, Some(red(5))).await.unwrap();

    let report = engine
        .state
        .inventory
        .report(&ReportFilter::default(), ReportSortKey::Location);
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].sku, "X1");
    assert_eq!(report[0].color, "RED");
    assert_eq!(report[0].quantity, 5);
}

#[tokio::test]
async fn partial_then_full_move_conserves_quantity_without_husks() {
    let engine = engine().await;
    with_shelf(&engine).await;
    let inventory = &engine.state.inventory;
    inventory.set_product(&ana(), A, Some(red(5))).await.unwrap();

    let receipt = engine
        .state
        .moves
        .move_product(&ana(), MoveRequest::partial(A, B, "RED", 3))
        .await
        .unwrap();
    assert_eq!(receipt.source_after.as_ref().map(Product::total_quantity), Some(2));
    assert_eq!(inventory.get_product(&A).unwrap().unwrap().quantity_of("RED"), 2);
    assert_eq!(inventory.get_product(&B).unwrap().unwrap().quantity_of("RED"), 3);
    assert_eq!(total(&engine), 5);

    engine
        .state
        .moves
        .move_product(&ana(), MoveRequest::partial(A, B, "RED", 2))
        .await
        .unwrap();
    assert_eq!(inventory.get_product(&A).unwrap(), None);
    assert_eq!(inventory.get_product(&B).unwrap().unwrap().quantity_of("RED"), 5);
    assert_eq!(total(&engine), 5);

    // The emptied cell is gone from the store too
    assert!(engine.state.store.read("positions/1/0/0").await.unwrap().is_none());
}

#[tokio::test]
async fn adding_the_same_shelf_twice_fails() {
    let engine = engine().await;
    with_shelf(&engine).await;
    let err = engine
        .state
        .inventory
        .add_shelf(&ana(), Shelf::new(1, "Again", "C1", 2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::DuplicateShelf(1)));
    assert_eq!(engine.state.inventory.shelves().len(), 1);
}

#[tokio::test]
async fn moves_sharing_a_position_are_exclusive() {
    let engine = engine().await;
    with_shelf(&engine).await;
    engine.state.inventory.set_product(&ana(), A, Some(red(5))).await.unwrap();
    engine
        .state
        .inventory
        .set_product(&ana(), C, Some(red(1)))
        .await
        .unwrap();

    let moves = &engine.state.moves;
    let pending = moves.begin_move(MoveRequest::full(A, B)).unwrap();
    let err = moves.begin_move(MoveRequest::full(C, B)).unwrap_err();
    assert!(matches!(err, InventoryError::LocationBusy(key) if key == B));

    moves.abort(pending);
    let tx = moves.begin_move(MoveRequest::full(C, B)).unwrap();
    moves.commit(tx, &ana()).await.unwrap();
    assert_eq!(total(&engine), 6);
}

#[tokio::test]
async fn mirror_receives_one_coalesced_payload_per_burst() {
    let engine = engine_on(Arc::new(MemoryStore::new()), 200).await;
    with_shelf(&engine).await;
    let inventory = &engine.state.inventory;
    inventory.set_product(&ana(), A, Some(red(5))).await.unwrap();
    inventory.adjust_quantity(&ana(), A, "RED", 2).await.unwrap();

    let mirror = engine.mirror.clone();
    assert!(eventually(|| !mirror.calls().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let calls = engine.mirror.calls();
    assert_eq!(calls.len(), 1);
    let payload = &calls[0];
    assert_eq!(payload.action, SyncAction::Add);
    assert_eq!(payload.previous_quantity, 0);
    assert_eq!(payload.new_quantity, 7);
    assert_eq!(payload.total_before, 0);
    assert_eq!(payload.total_after, 7);
    assert_eq!(payload.actor_name, "Ana");
}

#[tokio::test]
async fn every_mutation_reaches_the_audit_log() {
    let engine = engine().await;
    with_shelf(&engine).await;
    engine.state.inventory.set_product(&ana(), A, Some(red(5))).await.unwrap();
    engine
        .state
        .moves
        .move_product(&ana(), MoveRequest::full(A, B))
        .await
        .unwrap();

    let store = engine.state.store.clone();
    let mut events = Vec::new();
    for _ in 0..100 {
        events = audit_log(store.as_ref()).await;
        if events.len() >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let actions: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::ShelfAdded, AuditAction::ProductAdded, AuditAction::ProductMoved]
    );
    assert!(events.iter().all(|e| e.actor.id == "u1"));
}

#[tokio::test]
async fn second_client_converges_on_remote_writes() {
    let store: Arc<dyn StoreAdapter> = Arc::new(MemoryStore::new());
    let first = engine_on(store.clone(), 100).await;
    let second = engine_on(store, 100).await;

    with_shelf(&first).await;
    first.state.inventory.set_product(&ana(), A, Some(red(4))).await.unwrap();

    let inventory = second.state.inventory.clone();
    assert!(
        eventually(|| {
            inventory
                .get_product(&A)
                .ok()
                .flatten()
                .is_some_and(|p| p.quantity_of("RED") == 4)
        })
        .await
    );
    assert_eq!(second.state.inventory.shelves().len(), 1);

    // Remote removal wins as well
    first.state.inventory.set_product(&ana(), A, None).await.unwrap();
    assert!(eventually(|| matches!(inventory.get_product(&A), Ok(None))).await);
}

#[tokio::test]
async fn shutdown_stops_background_tasks() {
    let engine = engine().await;
    assert!(!engine.tasks.is_empty());
    engine.state.shutdown_token().cancel();
    engine.tasks.shutdown(Duration::from_secs(2)).await;
}
