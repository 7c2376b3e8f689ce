//! Store key scheme

use shared::PositionKey;

pub const SHELVES: &str = "shelves";
pub const POSITIONS: &str = "positions";
pub const SETTINGS: &str = "settings";
pub const AUDIT_LOG: &str = "audit_log";

pub fn shelf(id: i64) -> String {
    format!("{SHELVES}/{id}")
}

pub fn position(key: &PositionKey) -> String {
    format!("{POSITIONS}/{key}")
}

/// Whether `key` is `prefix` itself or lives below it
pub fn has_prefix(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Decoded store key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Shelf(i64),
    Position(PositionKey),
    Settings,
    AuditEntry,
}

impl StoreKey {
    pub fn parse(key: &str) -> Option<Self> {
        if key == SETTINGS {
            return Some(Self::Settings);
        }
        let (root, rest) = key.split_once('/')?;
        match root {
            SHELVES => rest.parse().ok().map(Self::Shelf),
            POSITIONS => rest.parse().ok().map(Self::Position),
            AUDIT_LOG => Some(Self::AuditEntry),
            _ => None,
        }
    }
}
