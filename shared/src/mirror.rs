//! External mirror payload
//!
//! The spreadsheet mirror receives one JSON document per coalesced change:
//!
//! ```text
//! { sku, color, action, previousQuantity, newQuantity,
//!   totalBefore, totalAfter, actorName, location, timestamp }
//! ```
//!
//! The mirror keeps no transaction log of its own, so the engine reconstructs
//! the grid-wide total before the change from the current total and the
//! per-position delta (see [`SyncAction::total_before`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a single-position quantity change
///
/// Serialized as `ADD`/`UPDATE`/`REMOVE`/`UNCLASSIFIED`; the legacy
/// `ADICIONAR`/`ATUALIZAR`/`REMOVER` labels are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncAction {
    /// Color entry appeared at a position
    Add,
    /// Color entry quantity changed
    Update,
    /// Color entry vanished from a position
    Remove,
    /// Anything else; no before/after correction is applied
    Unclassified,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Remove => "REMOVE",
            Self::Unclassified => "UNCLASSIFIED",
        }
    }

    /// Classify a change of one color entry at one position
    pub fn classify(previous_quantity: u64, new_quantity: u64) -> Self {
        match (previous_quantity, new_quantity) {
            (0, 0) => Self::Unclassified,
            (0, _) => Self::Add,
            (_, 0) => Self::Remove,
            _ => Self::Update,
        }
    }

    /// Grid-wide total before this change, given the current total `total_after`
    ///
    /// - ADD: `T − new`
    /// - UPDATE: `T − new + prev`
    /// - REMOVE: `T + prev`
    /// - otherwise: `T`
    ///
    /// Saturates at the `i64` bounds instead of wrapping.
    pub fn total_before(&self, total_after: u64, previous_quantity: u64, new_quantity: u64) -> i64 {
        let total = signed_quantity(total_after);
        let prev = signed_quantity(previous_quantity);
        let new = signed_quantity(new_quantity);
        match self {
            Self::Add => total.saturating_sub(new),
            Self::Update => total.saturating_sub(new).saturating_add(prev),
            Self::Remove => total.saturating_add(prev),
            Self::Unclassified => total,
        }
    }
}

/// Unit count as the signed integer the mirror expects, clamped to `i64::MAX`
pub fn signed_quantity(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SyncAction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SyncAction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(label.parse().unwrap_or(SyncAction::Unclassified))
    }
}

impl FromStr for SyncAction {
    type Err = std::convert::Infallible;

    /// Unknown labels classify as [`SyncAction::Unclassified`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "ADD" | "ADICIONAR" => Self::Add,
            "UPDATE" | "ATUALIZAR" => Self::Update,
            "REMOVE" | "REMOVER" => Self::Remove,
            _ => Self::Unclassified,
        })
    }
}

/// Grid-wide aggregate for one SKU+color at notification time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub total_quantity: u64,
    /// Most recently modified contributing location, if any remain
    #[serde(default)]
    pub last_location: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

impl AggregateSnapshot {
    pub fn with_total(total_quantity: u64) -> Self {
        Self {
            total_quantity,
            ..Default::default()
        }
    }
}

/// Document POSTed to the mirror webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorPayload {
    pub sku: String,
    pub color: String,
    pub action: SyncAction,
    /// Before-quantity of the first change in the burst. A burst is keyed by
    /// SKU+color, so this and `new_quantity` may belong to different cells
    pub previous_quantity: u64,
    /// After-quantity of the last change in the burst
    pub new_quantity: u64,
    /// Grid-wide total before the burst
    pub total_before: i64,
    /// Grid-wide total after the burst
    pub total_after: i64,
    pub actor_name: String,
    pub location: String,
    /// Unix millis
    pub timestamp: i64,
}
