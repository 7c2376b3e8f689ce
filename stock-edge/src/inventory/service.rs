//! Inventory service
//!
//! Façade over the replica, the position writer, audit and sync. The HTTP
//! layer and the integration tests drive the engine through this type and
//! [`MoveManager`](crate::moves::MoveManager).

use serde_json::json;
use shared::{
    Actor, AggregateSnapshot, AuditAction, ConsolidatedEntry, PositionKey, Product, ReportFilter,
    ReportSortKey, Shelf, SyncAction,
};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::error::{InventoryError, InventoryResult};
use super::writer::PositionWriter;
use crate::audit::AuditRecorder;
use crate::grid::RemovedShelf;
use crate::report::{aggregate_for, build_report};
use crate::settings::SharedSettings;
use crate::store::{StoreAdapter, TxDecision, keys};
use crate::sync::SyncDispatcher;

/// One color entry that changed at one position
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColorChange {
    sku: String,
    color: String,
    previous: u64,
    new: u64,
}

/// Per-color differences between two values of one position
///
/// A SKU swap counts as removing every old color and adding every new one.
fn color_changes(before: Option<&Product>, after: Option<&Product>) -> Vec<ColorChange> {
    let mut changes = Vec::new();
    let quantity_in = |p: Option<&Product>, sku: &str, color: &str| {
        p.filter(|p| p.sku == sku).map(|p| p.quantity_of(color)).unwrap_or(0)
    };

    if let Some(b) = before {
        for entry in &b.colors {
            changes.push(ColorChange {
                sku: b.sku.clone(),
                color: entry.code.clone(),
                previous: entry.quantity,
                new: quantity_in(after, &b.sku, &entry.code),
            });
        }
    }
    if let Some(a) = after {
        for entry in &a.colors {
            let seen = changes.iter().any(|c| c.sku == a.sku && c.color == entry.code);
            if !seen {
                changes.push(ColorChange {
                    sku: a.sku.clone(),
                    color: entry.code.clone(),
                    previous: quantity_in(before, &a.sku, &entry.code),
                    new: entry.quantity,
                });
            }
        }
    }

    changes.retain(|c| c.previous != c.new);
    changes
}

pub struct InventoryService {
    writer: Arc<PositionWriter>,
    audit: Arc<dyn AuditRecorder>,
    sync: SyncDispatcher,
    settings: SharedSettings,
}

impl InventoryService {
    pub fn new(
        writer: Arc<PositionWriter>,
        audit: Arc<dyn AuditRecorder>,
        sync: SyncDispatcher,
        settings: SharedSettings,
    ) -> Self {
        Self {
            writer,
            audit,
            sync,
            settings,
        }
    }

    fn store(&self) -> &Arc<dyn StoreAdapter> {
        self.writer.store()
    }

    // ========================================================================
    // Shelves
    // ========================================================================

    pub fn shelves(&self) -> Vec<Shelf> {
        self.writer.replica().read().confirmed().shelves().cloned().collect()
    }

    pub fn shelf(&self, id: i64) -> InventoryResult<Shelf> {
        self.writer
            .replica()
            .read()
            .shelf(id)
            .cloned()
            .ok_or(InventoryError::ShelfNotFound(id))
    }

    /// Create a shelf; ids are unique across every client
    pub async fn add_shelf(&self, actor: &Actor, shelf: Shelf) -> InventoryResult<Shelf> {
        self.writer.replica().read().confirmed().check_new_shelf(&shelf)?;

        let id = shelf.id;
        let revision = self
            .update_shelf(id, |current| match current {
                Some(_) => Err(InventoryError::DuplicateShelf(id)),
                None => Ok(Some(shelf.clone())),
            })
            .await?;
        self.writer.replica().write().apply_shelf(id, Some(shelf.clone()), revision);

        tracing::info!(shelf_id = id, name = %shelf.name, rows = shelf.rows, cols = shelf.cols, "Shelf added");
        self.audit.record(
            actor,
            AuditAction::ShelfAdded,
            json!({
                "id": id,
                "name": shelf.name,
                "corridor": shelf.corridor,
                "rows": shelf.rows,
                "cols": shelf.cols,
            }),
            &format!("shelf:{id}"),
        );
        Ok(shelf)
    }

    /// Change a shelf's dimensions; shrinking over an occupied cell fails
    ///
    /// Cell writes on the shelf wait until the new size is stored.
    pub async fn resize_shelf(&self, actor: &Actor, id: i64, rows: u32, cols: u32) -> InventoryResult<Shelf> {
        let _lock = self.writer.lock_shelf(id).await;
        let (before, resized) = {
            let replica = self.writer.replica().read();
            let view = replica.view();
            let before = view.shelf(id).cloned().ok_or(InventoryError::ShelfNotFound(id))?;
            (before, view.check_resize(id, rows, cols)?)
        };

        let revision = self
            .update_shelf(id, |current| match current {
                Some(stored) => Ok(Some(Shelf { rows, cols, ..stored })),
                None => Err(InventoryError::ShelfNotFound(id)),
            })
            .await?;
        self.writer.replica().write().apply_shelf(id, Some(resized.clone()), revision);

        tracing::info!(shelf_id = id, rows, cols, "Shelf resized");
        self.audit.record(
            actor,
            AuditAction::ShelfResized,
            json!({
                "id": id,
                "from": { "rows": before.rows, "cols": before.cols },
                "to": { "rows": rows, "cols": cols },
            }),
            &format!("shelf:{id}"),
        );
        Ok(resized)
    }

    /// Remove a shelf
    ///
    /// A shelf holding products is only removed with `force`, which clears
    /// every occupied position first. Forced removal may be restricted to
    /// admins by settings.
    pub async fn remove_shelf(&self, actor: &Actor, id: i64, force: bool) -> InventoryResult<RemovedShelf> {
        if force {
            let settings = self.settings.read();
            if settings.require_admin_for_force_delete && !settings.is_admin(&actor.id) {
                return Err(InventoryError::PermissionDenied(
                    "forced shelf removal requires an admin".to_string(),
                ));
            }
        }

        let _lock = self.writer.lock_shelf(id).await;
        let (shelf, occupied) = {
            let replica = self.writer.replica().read();
            let view = replica.view();
            let occupied = view.check_remove(id, force)?;
            let shelf = view.shelf(id).cloned().ok_or(InventoryError::ShelfNotFound(id))?;
            (shelf, occupied)
        };

        let mut discarded = Vec::with_capacity(occupied.len());
        for (key, _) in occupied {
            let update = self.writer.update_held(key, |_| Ok(None)).await?;
            if let Some(before) = update.before {
                self.after_position_change(actor, key, Some(&before), None);
                discarded.push((key, before));
            }
        }

        let mut delete = |current: Option<serde_json::Value>| match current {
            Some(_) => TxDecision::Delete,
            None => TxDecision::Abort,
        };
        let outcome = self.store().atomic_update(&keys::shelf(id), &mut delete).await?;
        if !outcome.committed {
            return Err(InventoryError::ShelfNotFound(id));
        }
        self.writer.replica().write().apply_shelf(id, None, outcome.revision);

        tracing::info!(shelf_id = id, discarded = discarded.len(), "Shelf removed");
        self.audit.record(
            actor,
            AuditAction::ShelfRemoved,
            json!({
                "id": id,
                "name": shelf.name,
                "force": force,
                "discarded": discarded.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>(),
            }),
            &format!("shelf:{id}"),
        );
        Ok(RemovedShelf { shelf, discarded })
    }

    /// Read-modify-write of one shelf record; returns the write revision
    async fn update_shelf<F>(&self, id: i64, mut f: F) -> InventoryResult<u64>
    where
        F: FnMut(Option<Shelf>) -> InventoryResult<Option<Shelf>> + Send,
    {
        let mut rejection: Option<InventoryError> = None;
        let mut decide = |current: Option<serde_json::Value>| {
            rejection = None;
            let current = match current.map(serde_json::from_value::<Shelf>).transpose() {
                Ok(shelf) => shelf,
                Err(e) => {
                    rejection = Some(InventoryError::StoreUnavailable(format!(
                        "unreadable shelf {id}: {e}"
                    )));
                    return TxDecision::Abort;
                }
            };
            match f(current) {
                Ok(Some(shelf)) => match serde_json::to_value(&shelf) {
                    Ok(value) => TxDecision::Set(value),
                    Err(e) => {
                        rejection = Some(InventoryError::StoreUnavailable(e.to_string()));
                        TxDecision::Abort
                    }
                },
                Ok(None) => TxDecision::Delete,
                Err(e) => {
                    rejection = Some(e);
                    TxDecision::Abort
                }
            }
        };

        let outcome = self.store().atomic_update(&keys::shelf(id), &mut decide).await?;
        match rejection {
            Some(err) => Err(err),
            None => Ok(outcome.revision),
        }
    }

    // ========================================================================
    // Positions
    // ========================================================================

    pub fn get_product(&self, key: &PositionKey) -> InventoryResult<Option<Product>> {
        let replica = self.writer.replica().read();
        replica.confirmed().check_position(key)?;
        Ok(replica.product(key))
    }

    /// Replace (or clear, with `None`) the product at `key`
    pub async fn set_product(
        &self,
        actor: &Actor,
        key: PositionKey,
        product: Option<Product>,
    ) -> InventoryResult<Option<Product>> {
        self.writer.replica().read().confirmed().check_position(&key)?;
        let product = match product {
            Some(mut p) => {
                p.validate()?;
                p.last_modified = shared::util::now_millis();
                Some(p)
            }
            None => None,
        };

        let update = self.writer.update(key, |_| Ok(product.clone())).await?;
        self.after_position_change(actor, key, update.before.as_ref(), update.after.as_ref());
        Ok(update.after)
    }

    /// Add `delta` units (negative removes) to one color entry at `key`
    ///
    /// Computed against the stored value, so concurrent adjustments from
    /// other clients are not overwritten.
    pub async fn adjust_quantity(
        &self,
        actor: &Actor,
        key: PositionKey,
        color: &str,
        delta: i64,
    ) -> InventoryResult<Option<Product>> {
        if delta == 0 || color.trim().is_empty() {
            return Err(InventoryError::InvalidQuantity);
        }
        self.writer.replica().read().confirmed().check_position(&key)?;
        let now = shared::util::now_millis();

        let update = self
            .writer
            .update(key, |current| {
                let mut product = current.ok_or(InventoryError::PositionEmpty(key))?;
                let amount = delta.unsigned_abs();
                if delta > 0 {
                    product.add_quantity(color, amount).map_err(|overflow| {
                        InventoryError::QuantityOverflow {
                            key,
                            color: overflow.color,
                        }
                    })?;
                } else {
                    product.take_quantity(color, amount).map_err(|available| {
                        InventoryError::InsufficientQuantity {
                            key,
                            color: color.to_string(),
                            requested: amount,
                            available,
                        }
                    })?;
                }
                product.last_modified = now;
                Ok(Some(product))
            })
            .await?;

        self.after_position_change(actor, key, update.before.as_ref(), update.after.as_ref());
        Ok(update.after)
    }

    /// Audit and mirror notifications for one landed position change
    fn after_position_change(
        &self,
        actor: &Actor,
        key: PositionKey,
        before: Option<&Product>,
        after: Option<&Product>,
    ) {
        let action = match (before, after) {
            (None, None) => return,
            (None, Some(_)) => AuditAction::ProductAdded,
            (Some(_), None) => AuditAction::ProductRemoved,
            (Some(_), Some(_)) => AuditAction::ProductUpdated,
        };
        self.audit.record(
            actor,
            action,
            json!({ "position": key.to_string(), "before": before, "after": after }),
            &key.to_string(),
        );

        let changes = color_changes(before, after);
        if changes.is_empty() {
            return;
        }
        let view = self.writer.replica().read().view();
        for change in changes {
            let snapshot = aggregate_for(&view, &change.sku, &change.color);
            self.sync.notify(
                &change.sku,
                &change.color,
                snapshot,
                &actor.display_name,
                SyncAction::classify(change.previous, change.new),
                change.previous,
                change.new,
            );
        }
    }

    // ========================================================================
    // Reports
    // ========================================================================

    pub fn report(&self, filter: &ReportFilter, sort: ReportSortKey) -> Vec<ConsolidatedEntry> {
        let view = self.writer.replica().read().view();
        build_report(&view, filter, sort)
    }

    pub fn aggregate(&self, sku: &str, color: &str) -> AggregateSnapshot {
        let view = self.writer.replica().read().view();
        aggregate_for(&view, sku, color)
    }

    /// Distinct SKUs currently stored anywhere
    pub fn skus(&self) -> BTreeSet<String> {
        let view = self.writer.replica().read().view();
        view.occupied().map(|(_, p)| p.sku.clone()).collect()
    }
}
