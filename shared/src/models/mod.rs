//! Domain models shared by the engine, its HTTP surface and its tests

pub mod audit;
pub mod position;
pub mod product;
pub mod report;
pub mod settings;
pub mod shelf;

pub use audit::{Actor, AuditAction, AuditEvent};
pub use position::{InvalidPositionKey, PositionKey};
pub use product::{ColorEntry, Product, ProductIssue, QuantityOverflow};
pub use report::{
    ConsolidatedEntry, LocationRef, ReportFilter, ReportSortKey, consolidation_key,
};
pub use settings::{InventorySettings, SettingsPatch};
pub use shelf::{Shelf, ShelfResize};
