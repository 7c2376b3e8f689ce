//! Shelf Model

use serde::{Deserialize, Serialize};

/// Shelf entity: a named rectangular grid of positions inside a corridor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelf {
    pub id: i64,
    pub name: String,
    pub corridor: String,
    pub rows: u32,
    pub cols: u32,
}

impl Shelf {
    pub fn new(id: i64, name: impl Into<String>, corridor: impl Into<String>, rows: u32, cols: u32) -> Self {
        Self {
            id,
            name: name.into(),
            corridor: corridor.into(),
            rows,
            cols,
        }
    }

    /// Whether `(row, col)` lies inside the grid
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row < self.rows && col < self.cols
    }

    /// Number of cells in the grid
    pub fn capacity(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }
}

/// Resize shelf payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShelfResize {
    pub rows: u32,
    pub cols: u32,
}
