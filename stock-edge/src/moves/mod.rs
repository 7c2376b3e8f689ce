//! Move transactions
//!
//! A move relocates a whole cell or part of one color entry between two
//! positions without changing the grid-wide quantity.
//!
//! ```text
//! (idle) ── begin_move ──→ Pending ── commit ──→ Committed
//!                             │          └─(write failure)─→ Aborted
//!                             └── abort ──→ Aborted
//! ```
//!
//! While a transaction is pending its two keys are reserved; any other
//! `begin_move` touching either key fails with `LocationBusy`.

mod manager;
pub mod plan;

pub use manager::{MoveManager, MoveTransaction};
pub use plan::MoveKind;

use serde::{Deserialize, Serialize};
use shared::{ColorEntry, PositionKey, Product};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveMode {
    /// Destination must be empty or hold the same SKU (colors are merged)
    #[default]
    Standard,
    /// Exchange the contents of two cells (whole cells only)
    Swap,
}

/// Partial move amount: units of one color entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveQuantity {
    pub color: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub source: PositionKey,
    pub destination: PositionKey,
    /// `None` moves the whole cell
    #[serde(default)]
    pub quantity: Option<MoveQuantity>,
    #[serde(default)]
    pub mode: MoveMode,
}

impl MoveRequest {
    pub fn full(source: PositionKey, destination: PositionKey) -> Self {
        Self {
            source,
            destination,
            quantity: None,
            mode: MoveMode::Standard,
        }
    }

    pub fn partial(
        source: PositionKey,
        destination: PositionKey,
        color: impl Into<String>,
        quantity: u64,
    ) -> Self {
        Self {
            source,
            destination,
            quantity: Some(MoveQuantity {
                color: color.into(),
                quantity,
            }),
            mode: MoveMode::Standard,
        }
    }

    pub fn swap(source: PositionKey, destination: PositionKey) -> Self {
        Self {
            mode: MoveMode::Swap,
            ..Self::full(source, destination)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveState {
    Pending,
    Committed,
    Aborted,
}

/// Result of a committed move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveReceipt {
    pub id: u64,
    pub state: MoveState,
    pub mode: MoveMode,
    pub source: PositionKey,
    pub destination: PositionKey,
    pub sku: String,
    /// Units that left the source
    pub moved: Vec<ColorEntry>,
    /// Units that came back from the destination (swap only)
    #[serde(default)]
    pub returned: Vec<ColorEntry>,
    pub source_after: Option<Product>,
    pub destination_after: Option<Product>,
    pub started_at: i64,
    pub committed_at: i64,
}
