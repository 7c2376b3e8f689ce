use shared::util::cell_label;
use shared::{AggregateSnapshot, ConsolidatedEntry, LocationRef, PositionKey, Product, Shelf};
use std::collections::HashMap;

use crate::grid::GridState;

fn location_of(shelf: &Shelf, key: &PositionKey, product: &Product, quantity: u64) -> LocationRef {
    LocationRef {
        shelf_id: shelf.id,
        shelf_name: shelf.name.clone(),
        corridor: shelf.corridor.clone(),
        row: key.row,
        col: key.col,
        label: cell_label(key.row, key.col),
        quantity,
        last_modified: product.last_modified,
    }
}

/// Aggregate every occupied position into one entry per SKU+color
///
/// Positions are visited once, in grid order. The entry keeps the location
/// with the greatest `last_modified`; on ties the one seen last wins.
/// Entries come out in first-seen order. Positions whose shelf is unknown
/// (not yet replicated) are skipped.
pub fn generate_report(grid: &GridState) -> Vec<ConsolidatedEntry> {
    let mut entries: Vec<ConsolidatedEntry> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for (key, product) in grid.occupied() {
        let Some(shelf) = grid.shelf(key.shelf_id) else {
            continue;
        };
        for color in &product.colors {
            if color.quantity == 0 {
                continue;
            }
            let location = location_of(shelf, key, product, color.quantity);

            match index.get(&(product.sku.clone(), color.code.clone())) {
                Some(&i) => {
                    let entry = &mut entries[i];
                    entry.quantity = entry.quantity.saturating_add(color.quantity);
                    if location.last_modified >= entry.last_location.last_modified {
                        entry.last_location = location.clone();
                    }
                    entry.locations.push(location);
                }
                None => {
                    index.insert((product.sku.clone(), color.code.clone()), entries.len());
                    entries.push(ConsolidatedEntry {
                        sku: product.sku.clone(),
                        color: color.code.clone(),
                        unit: product.unit.clone(),
                        quantity: color.quantity,
                        last_location: location.clone(),
                        locations: vec![location],
                    });
                }
            }
        }
    }

    entries
}

/// Grid-wide aggregate for one SKU+color, as handed to the sync dispatcher
///
/// The total saturates at `u64::MAX`.
pub fn aggregate_for(grid: &GridState, sku: &str, color: &str) -> AggregateSnapshot {
    let mut total = 0u64;
    let mut last: Option<LocationRef> = None;
    let mut locations = Vec::new();

    for (key, product) in grid.occupied() {
        if product.sku != sku {
            continue;
        }
        let quantity = product.quantity_of(color);
        if quantity == 0 {
            continue;
        }
        let Some(shelf) = grid.shelf(key.shelf_id) else {
            continue;
        };
        let location = location_of(shelf, key, product, quantity);
        total = total.saturating_add(quantity);
        locations.push(location.describe());
        if last
            .as_ref()
            .is_none_or(|l| location.last_modified >= l.last_modified)
        {
            last = Some(location);
        }
    }

    AggregateSnapshot {
        total_quantity: total,
        last_location: last.map(|l| l.describe()),
        locations,
    }
}
