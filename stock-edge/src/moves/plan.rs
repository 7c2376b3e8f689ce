//! Pure move planning
//!
//! These functions decide what leaves the source and what the destination
//! becomes. They are applied inside the store's atomic updates, so they
//! only ever see the latest stored value.

use shared::{ColorEntry, PositionKey, Product};

use super::{MoveMode, MoveQuantity};
use crate::inventory::{InventoryError, InventoryResult};

/// What a move takes out of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveKind {
    /// The whole product
    Full,
    /// Part of one color entry
    Partial { color: String, quantity: u64 },
}

/// Decide between a full-cell and a partial move
///
/// A partial quantity equal to the cell's whole content is a full move.
pub fn resolve_kind(
    source_key: PositionKey,
    source: &Product,
    quantity: Option<&MoveQuantity>,
    mode: MoveMode,
) -> InventoryResult<MoveKind> {
    let kind = match quantity {
        None => MoveKind::Full,
        Some(q) => {
            if q.quantity == 0 {
                return Err(InventoryError::InvalidQuantity);
            }
            let available = source.quantity_of(&q.color);
            if q.quantity > available {
                return Err(InventoryError::InsufficientQuantity {
                    key: source_key,
                    color: q.color.clone(),
                    requested: q.quantity,
                    available,
                });
            }
            if q.quantity == source.total_quantity() {
                MoveKind::Full
            } else {
                MoveKind::Partial {
                    color: q.color.clone(),
                    quantity: q.quantity,
                }
            }
        }
    };

    if mode == MoveMode::Swap && kind != MoveKind::Full {
        return Err(InventoryError::InvalidMove(
            "swap moves whole cells only".to_string(),
        ));
    }
    Ok(kind)
}

/// Split the source into (what stays, what leaves)
pub fn take_from_source(
    source_key: PositionKey,
    current: Option<Product>,
    kind: &MoveKind,
) -> InventoryResult<(Option<Product>, Product)> {
    let Some(mut product) = current else {
        return Err(InventoryError::SourceEmpty(source_key));
    };

    match kind {
        MoveKind::Full => Ok((None, product)),
        MoveKind::Partial { color, quantity } => {
            product
                .take_quantity(color, *quantity)
                .map_err(|available| InventoryError::InsufficientQuantity {
                    key: source_key,
                    color: color.clone(),
                    requested: *quantity,
                    available,
                })?;
            let taken = Product {
                sku: product.sku.clone(),
                unit: product.unit.clone(),
                colors: vec![ColorEntry::new(color.clone(), *quantity)],
                last_modified: product.last_modified,
            };
            Ok((product.normalized(), taken))
        }
    }
}

/// Destination after receiving `incoming`
///
/// An empty destination takes the incoming product as is; a destination
/// holding the same SKU merges color entries; anything else is occupied.
pub fn place_at_destination(
    destination_key: PositionKey,
    current: Option<Product>,
    incoming: &Product,
) -> InventoryResult<Product> {
    match current {
        None => Ok(incoming.clone()),
        Some(mut product) if product.sku == incoming.sku => {
            product.merge_colors(incoming).map_err(|overflow| {
                InventoryError::QuantityOverflow {
                    key: destination_key,
                    color: overflow.color,
                }
            })?;
            Ok(product)
        }
        Some(product) => Err(InventoryError::DestinationOccupied {
            key: destination_key,
            sku: product.sku,
        }),
    }
}

/// Same SKU and color entries, ignoring timestamps
pub fn same_content(a: Option<&Product>, b: Option<&Product>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.sku == b.sku && a.unit == b.unit && a.colors == b.colors,
        _ => false,
    }
}

/// Quantity of `sku`/`color` across two positions
pub fn pair_quantity(a: Option<&Product>, b: Option<&Product>, sku: &str, color: &str) -> u64 {
    [a, b]
        .into_iter()
        .flatten()
        .filter(|p| p.sku == sku)
        .map(|p| p.quantity_of(color))
        .fold(0u64, u64::saturating_add)
}
