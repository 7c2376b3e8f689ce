//! Shared types for the shelf inventory engine
//!
//! Domain records (shelves, positions, products), derived report rows, audit
//! events, the mirror payload, and the unified error system. Everything here
//! is plain data with serde support; the engine itself lives in `stock-edge`.

pub mod error;
pub mod mirror;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use mirror::{AggregateSnapshot, MirrorPayload, SyncAction};
pub use models::{
    Actor, AuditAction, AuditEvent, ColorEntry, ConsolidatedEntry, InventorySettings,
    LocationRef, PositionKey, Product, ReportFilter, ReportSortKey, Shelf,
};
