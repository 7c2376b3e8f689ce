//! Consolidated report rows
//!
//! These records are projections of the grid, recomputed on demand and never
//! persisted as a source of truth.

use serde::{Deserialize, Serialize};

use super::PositionKey;

/// One position contributing to a consolidated entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    pub shelf_id: i64,
    pub shelf_name: String,
    pub corridor: String,
    pub row: u32,
    pub col: u32,
    /// Cell label inside the shelf ("B3")
    pub label: String,
    /// Units of this SKU+color at this position
    pub quantity: u64,
    pub last_modified: i64,
}

impl LocationRef {
    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.shelf_id, self.row, self.col)
    }

    /// "corridor / shelf / cell" text used by exports and the mirror payload
    pub fn describe(&self) -> String {
        format!("{} / {} / {}", self.corridor, self.shelf_name, self.label)
    }
}

/// Per SKU+color aggregate across the whole grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedEntry {
    pub sku: String,
    pub color: String,
    pub unit: String,
    pub quantity: u64,
    /// Contributing position with the greatest `last_modified`
    pub last_location: LocationRef,
    /// Every contributing position, in grid iteration order
    pub locations: Vec<LocationRef>,
}

impl ConsolidatedEntry {
    /// Grouping key `sku|color`
    pub fn key(&self) -> String {
        consolidation_key(&self.sku, &self.color)
    }
}

pub fn consolidation_key(sku: &str, color: &str) -> String {
    format!("{}|{}", sku, color)
}

/// Independent substring predicates; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    #[serde(default)]
    pub corridor: String,
    #[serde(default)]
    pub shelf: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub color: String,
}

impl ReportFilter {
    pub fn is_empty(&self) -> bool {
        self.corridor.trim().is_empty()
            && self.shelf.trim().is_empty()
            && self.sku.trim().is_empty()
            && self.color.trim().is_empty()
    }
}

/// Report ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSortKey {
    /// Corridor, shelf name, cell label
    #[default]
    Location,
    /// SKU, then color
    Sku,
    /// Quantity descending
    Quantity,
    /// Color, then SKU
    Color,
}
