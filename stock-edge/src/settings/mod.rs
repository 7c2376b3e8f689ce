//! Inventory settings
//!
//! The settings document lives in the store under `settings`. A shared,
//! in-memory copy is passed to the services that consult it; the store
//! listener refreshes it when another client changes the document.

mod service;

pub use service::SettingsService;

use parking_lot::RwLock;
use shared::InventorySettings;
use std::sync::Arc;

pub type SharedSettings = Arc<RwLock<InventorySettings>>;

pub fn shared_settings(settings: InventorySettings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}
