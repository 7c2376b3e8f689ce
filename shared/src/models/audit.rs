//! Audit event records
//!
//! Audit events are append-only: once handed to the recorder they are never
//! mutated or deleted by the engine.

use serde::{Deserialize, Serialize};

/// Who performed an operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Actor used for changes the engine makes on its own behalf
    pub fn system() -> Self {
        Self::new("system", "System", "")
    }
}

/// Audited operation kinds (closed set, not free text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // ═══ Positions ═══
    ProductAdded,
    ProductUpdated,
    ProductRemoved,
    ProductMoved,

    // ═══ Shelves ═══
    ShelfAdded,
    ShelfResized,
    ShelfRemoved,

    // ═══ Configuration ═══
    SettingsUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductAdded => "product_added",
            Self::ProductUpdated => "product_updated",
            Self::ProductRemoved => "product_removed",
            Self::ProductMoved => "product_moved",
            Self::ShelfAdded => "shelf_added",
            Self::ShelfResized => "shelf_resized",
            Self::ShelfRemoved => "shelf_removed",
            Self::SettingsUpdated => "settings_updated",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: Actor,
    pub action: AuditAction,
    /// Structured details (JSON)
    pub details: serde_json::Value,
    /// Affected resource ("1/0/0", "shelf:1", "settings")
    pub target_id: String,
    /// Unix millis
    pub timestamp: i64,
}
