//! Grid state
//!
//! Pure, synchronous model of shelves and their positions. It enforces the
//! structural rules (bounds, dimensions, no zero-husks) and knows nothing
//! about the store, audit or sync.

use shared::{PositionKey, Product, Shelf};
use std::collections::BTreeMap;

use super::error::{GridError, GridResult};

/// Shelves and the products stored in them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridState {
    shelves: BTreeMap<i64, Shelf>,
    positions: BTreeMap<PositionKey, Product>,
}

/// What [`GridState::remove_shelf`] took out of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedShelf {
    pub shelf: Shelf,
    /// Products discarded by a forced removal, in position order
    pub discarded: Vec<(PositionKey, Product)>,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Shelves ==========

    pub fn shelves(&self) -> impl Iterator<Item = &Shelf> {
        self.shelves.values()
    }

    pub fn shelf(&self, id: i64) -> Option<&Shelf> {
        self.shelves.get(&id)
    }

    /// Validate a new shelf without inserting it
    pub fn check_new_shelf(&self, shelf: &Shelf) -> GridResult<()> {
        if self.shelves.contains_key(&shelf.id) {
            return Err(GridError::DuplicateShelf(shelf.id));
        }
        check_dimensions(shelf.rows, shelf.cols)
    }

    pub fn add_shelf(&mut self, shelf: Shelf) -> GridResult<()> {
        self.check_new_shelf(&shelf)?;
        self.shelves.insert(shelf.id, shelf);
        Ok(())
    }

    /// Validate a resize without applying it; returns the resized shelf
    pub fn check_resize(&self, id: i64, rows: u32, cols: u32) -> GridResult<Shelf> {
        let shelf = self.shelves.get(&id).ok_or(GridError::ShelfNotFound(id))?;
        check_dimensions(rows, cols)?;

        if let Some((key, _)) = self
            .occupied_in(id)
            .find(|(key, _)| key.row >= rows || key.col >= cols)
        {
            return Err(GridError::WouldOrphanProduct {
                shelf_id: id,
                key: *key,
            });
        }

        Ok(Shelf {
            rows,
            cols,
            ..shelf.clone()
        })
    }

    pub fn resize_shelf(&mut self, id: i64, rows: u32, cols: u32) -> GridResult<Shelf> {
        let resized = self.check_resize(id, rows, cols)?;
        self.shelves.insert(id, resized.clone());
        Ok(resized)
    }

    /// Occupied positions a removal would discard
    ///
    /// Fails with `ShelfNotEmpty` when the shelf holds products and `force`
    /// is not set.
    pub fn check_remove(&self, id: i64, force: bool) -> GridResult<Vec<(PositionKey, Product)>> {
        if !self.shelves.contains_key(&id) {
            return Err(GridError::ShelfNotFound(id));
        }
        let occupied: Vec<_> = self
            .occupied_in(id)
            .map(|(k, p)| (*k, p.clone()))
            .collect();
        if !occupied.is_empty() && !force {
            return Err(GridError::ShelfNotEmpty {
                shelf_id: id,
                occupied: occupied.len(),
            });
        }
        Ok(occupied)
    }

    pub fn remove_shelf(&mut self, id: i64, force: bool) -> GridResult<RemovedShelf> {
        let discarded = self.check_remove(id, force)?;
        for (key, _) in &discarded {
            self.positions.remove(key);
        }
        let shelf = self.shelves.remove(&id).ok_or(GridError::ShelfNotFound(id))?;
        Ok(RemovedShelf { shelf, discarded })
    }

    // ========== Positions ==========

    /// Shelf owning `key`, or `InvalidPosition` when out of bounds
    pub fn check_position(&self, key: &PositionKey) -> GridResult<&Shelf> {
        match self.shelves.get(&key.shelf_id) {
            Some(shelf) if shelf.contains(key.row, key.col) => Ok(shelf),
            _ => Err(GridError::InvalidPosition(*key)),
        }
    }

    pub fn get_product(&self, key: &PositionKey) -> Option<&Product> {
        self.positions.get(key)
    }

    /// Replace or clear the product at `key`, returning the previous one
    ///
    /// A product with no units left clears the slot.
    pub fn set_product(
        &mut self,
        key: PositionKey,
        product: Option<Product>,
    ) -> GridResult<Option<Product>> {
        self.check_position(&key)?;
        let product = match product {
            Some(p) => {
                p.validate()?;
                p.normalized()
            }
            None => None,
        };
        Ok(self.put(key, product))
    }

    /// Store a value that was already accepted elsewhere (the store)
    ///
    /// Skips bounds checks: a remote position may arrive before its shelf.
    /// Husks are still never kept.
    pub(crate) fn put(&mut self, key: PositionKey, product: Option<Product>) -> Option<Product> {
        match product.and_then(Product::normalized) {
            Some(p) => self.positions.insert(key, p),
            None => self.positions.remove(&key),
        }
    }

    pub(crate) fn put_shelf(&mut self, shelf: Shelf) {
        self.shelves.insert(shelf.id, shelf);
    }

    pub(crate) fn drop_shelf(&mut self, id: i64) -> Option<Shelf> {
        self.shelves.remove(&id)
    }

    /// Every occupied position in key order
    pub fn occupied(&self) -> impl Iterator<Item = (&PositionKey, &Product)> {
        self.positions.iter()
    }

    pub fn occupied_in(&self, shelf_id: i64) -> impl Iterator<Item = (&PositionKey, &Product)> {
        self.positions
            .range(PositionKey::new(shelf_id, 0, 0)..=PositionKey::new(shelf_id, u32::MAX, u32::MAX))
    }

    pub fn occupied_count(&self) -> usize {
        self.positions.len()
    }
}

fn check_dimensions(rows: u32, cols: u32) -> GridResult<()> {
    if rows == 0 || cols == 0 {
        return Err(GridError::InvalidDimensions { rows, cols });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ColorEntry;

    fn grid_with_shelf() -> GridState {
        let mut grid = GridState::new();
        grid.add_shelf(Shelf::new(1, "S1", "C1", 4, 6)).unwrap();
        grid
    }

    fn red(qty: u64) -> Product {
        Product::new("X1", "un", vec![ColorEntry::new("RED", qty)])
    }

    #[test]
    fn add_shelf_twice_is_duplicate() {
        let mut grid = grid_with_shelf();
        let err = grid.add_shelf(Shelf::new(1, "again", "C1", 1, 1)).unwrap_err();
        assert_eq!(err, GridError::DuplicateShelf(1));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let mut grid = GridState::new();
        let err = grid.add_shelf(Shelf::new(2, "S2", "C1", 0, 3)).unwrap_err();
        assert_eq!(err, GridError::InvalidDimensions { rows: 0, cols: 3 });
    }

    #[test]
    fn set_product_checks_bounds() {
        let mut grid = grid_with_shelf();
        let outside = PositionKey::new(1, 4, 0);
        assert_eq!(
            grid.set_product(outside, Some(red(1))).unwrap_err(),
            GridError::InvalidPosition(outside)
        );
        let unknown = PositionKey::new(9, 0, 0);
        assert_eq!(
            grid.set_product(unknown, Some(red(1))).unwrap_err(),
            GridError::InvalidPosition(unknown)
        );
    }

    #[test]
    fn emptied_product_clears_the_slot() {
        let mut grid = grid_with_shelf();
        let key = PositionKey::new(1, 0, 0);
        grid.set_product(key, Some(red(5))).unwrap();
        assert_eq!(grid.get_product(&key).unwrap().total_quantity(), 5);

        let previous = grid.set_product(key, Some(red(0))).unwrap();
        assert_eq!(previous.unwrap().total_quantity(), 5);
        assert!(grid.get_product(&key).is_none());
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn resize_cannot_orphan_products() {
        let mut grid = grid_with_shelf();
        let key = PositionKey::new(1, 3, 5);
        grid.set_product(key, Some(red(1))).unwrap();

        assert_eq!(
            grid.resize_shelf(1, 3, 6).unwrap_err(),
            GridError::WouldOrphanProduct { shelf_id: 1, key }
        );
        let grown = grid.resize_shelf(1, 8, 8).unwrap();
        assert_eq!((grown.rows, grown.cols), (8, 8));

        grid.set_product(key, None).unwrap();
        grid.resize_shelf(1, 1, 1).unwrap();
    }

    #[test]
    fn remove_shelf_requires_force_when_occupied() {
        let mut grid = grid_with_shelf();
        grid.add_shelf(Shelf::new(2, "S2", "C1", 2, 2)).unwrap();
        grid.set_product(PositionKey::new(1, 0, 0), Some(red(2))).unwrap();
        grid.set_product(PositionKey::new(2, 0, 0), Some(red(7))).unwrap();

        assert_eq!(
            grid.remove_shelf(1, false).unwrap_err(),
            GridError::ShelfNotEmpty { shelf_id: 1, occupied: 1 }
        );

        let removed = grid.remove_shelf(1, true).unwrap();
        assert_eq!(removed.discarded.len(), 1);
        assert!(grid.shelf(1).is_none());
        // Other shelves are untouched
        assert_eq!(grid.occupied_count(), 1);
        assert!(grid.get_product(&PositionKey::new(2, 0, 0)).is_some());
    }

    #[test]
    fn occupied_in_only_yields_that_shelf() {
        let mut grid = grid_with_shelf();
        grid.add_shelf(Shelf::new(2, "S2", "C1", 2, 2)).unwrap();
        grid.set_product(PositionKey::new(1, 1, 1), Some(red(1))).unwrap();
        grid.set_product(PositionKey::new(2, 0, 1), Some(red(1))).unwrap();

        let keys: Vec<_> = grid.occupied_in(2).map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![PositionKey::new(2, 0, 1)]);
    }

    #[test]
    fn invalid_product_is_rejected() {
        let mut grid = grid_with_shelf();
        let mut product = red(1);
        product.sku.clear();
        assert!(matches!(
            grid.set_product(PositionKey::new(1, 0, 0), Some(product)),
            Err(GridError::InvalidProduct(_))
        ));
    }
}
