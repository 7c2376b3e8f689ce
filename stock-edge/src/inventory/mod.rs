//! Inventory operations
//!
//! - [`PositionWriter`]: staged, atomic writes of one position
//! - [`InventoryService`]: shelves, direct product edits, reports
//! - [`InventoryError`]: error taxonomy shared with the move manager

mod error;
mod service;
mod writer;

pub use error::{InventoryError, InventoryResult};
pub use service::InventoryService;
pub use writer::{PositionUpdate, PositionWriter, ShelfAccess, ShelfLock};
