//! Inventory error taxonomy
//!
//! Returned to callers of the inventory, move and settings services. The
//! HTTP layer converts them into [`AppError`] with a stable [`ErrorCode`].

use shared::models::ProductIssue;
use shared::{AppError, ErrorCode, PositionKey};
use thiserror::Error;

use crate::grid::GridError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum InventoryError {
    // ========== Positions ==========
    #[error("Position {0} is outside its shelf")]
    InvalidPosition(PositionKey),

    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductIssue),

    #[error("No product at {0}")]
    PositionEmpty(PositionKey),

    // ========== Shelves ==========
    #[error("Shelf not found: {0}")]
    ShelfNotFound(i64),

    #[error("Shelf {0} already exists")]
    DuplicateShelf(i64),

    #[error("Invalid shelf dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: u32, cols: u32 },

    #[error("Resizing shelf {shelf_id} would orphan the product at {key}")]
    WouldOrphanProduct { shelf_id: i64, key: PositionKey },

    #[error("Shelf {shelf_id} still holds {occupied} product(s)")]
    ShelfNotEmpty { shelf_id: i64, occupied: usize },

    // ========== Moves ==========
    #[error("Source and destination are both {0}")]
    SameLocation(PositionKey),

    #[error("Nothing to move at {0}")]
    SourceEmpty(PositionKey),

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Quantity of {color} at {key} would exceed the supported maximum")]
    QuantityOverflow { key: PositionKey, color: String },

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Only {available} of {color} at {key}, {requested} requested")]
    InsufficientQuantity {
        key: PositionKey,
        color: String,
        requested: u64,
        available: u64,
    },

    #[error("Position {0} is part of another move in progress")]
    LocationBusy(PositionKey),

    #[error("Destination {key} already holds {sku}")]
    DestinationOccupied { key: PositionKey, sku: String },

    #[error("Move failed after a partial write ({reason}); rolled back: {rolled_back}")]
    PartialCommitFailure { reason: String, rolled_back: bool },

    // ========== Access / system ==========
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

impl From<GridError> for InventoryError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::ShelfNotFound(id) => Self::ShelfNotFound(id),
            GridError::DuplicateShelf(id) => Self::DuplicateShelf(id),
            GridError::InvalidDimensions { rows, cols } => Self::InvalidDimensions { rows, cols },
            GridError::InvalidPosition(key) => Self::InvalidPosition(key),
            GridError::WouldOrphanProduct { shelf_id, key } => {
                Self::WouldOrphanProduct { shelf_id, key }
            }
            GridError::ShelfNotEmpty { shelf_id, occupied } => {
                Self::ShelfNotEmpty { shelf_id, occupied }
            }
            GridError::InvalidProduct(issue) => Self::InvalidProduct(issue),
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl InventoryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPosition(_) => ErrorCode::InvalidPosition,
            Self::InvalidProduct(_) => ErrorCode::ProductInvalid,
            Self::PositionEmpty(_) => ErrorCode::NotFound,
            Self::ShelfNotFound(_) => ErrorCode::ShelfNotFound,
            Self::DuplicateShelf(_) => ErrorCode::DuplicateShelf,
            Self::InvalidDimensions { .. } => ErrorCode::InvalidDimensions,
            Self::WouldOrphanProduct { .. } => ErrorCode::WouldOrphanProduct,
            Self::ShelfNotEmpty { .. } => ErrorCode::ShelfNotEmpty,
            Self::SameLocation(_) => ErrorCode::SameLocation,
            Self::SourceEmpty(_) => ErrorCode::SourceEmpty,
            Self::InvalidQuantity | Self::QuantityOverflow { .. } => ErrorCode::InvalidQuantity,
            Self::InvalidMove(_) => ErrorCode::InvalidRequest,
            Self::InsufficientQuantity { .. } => ErrorCode::InsufficientQuantity,
            Self::LocationBusy(_) => ErrorCode::LocationBusy,
            Self::DestinationOccupied { .. } => ErrorCode::DestinationOccupied,
            Self::PartialCommitFailure { .. } => ErrorCode::PartialCommitFailure,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::StoreUnavailable(_) => ErrorCode::StoreUnavailable,
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let code = err.code();
        let app = AppError::with_message(code, err.to_string());
        match err {
            InventoryError::InvalidPosition(key)
            | InventoryError::PositionEmpty(key)
            | InventoryError::SameLocation(key)
            | InventoryError::SourceEmpty(key)
            | InventoryError::LocationBusy(key) => app.with_detail("position", key.to_string()),
            InventoryError::ShelfNotFound(id) | InventoryError::DuplicateShelf(id) => {
                app.with_detail("shelf_id", id)
            }
            InventoryError::WouldOrphanProduct { shelf_id, key } => app
                .with_detail("shelf_id", shelf_id)
                .with_detail("position", key.to_string()),
            InventoryError::ShelfNotEmpty { shelf_id, occupied } => app
                .with_detail("shelf_id", shelf_id)
                .with_detail("occupied", occupied as u64),
            InventoryError::InsufficientQuantity {
                key,
                color,
                requested,
                available,
            } => app
                .with_detail("position", key.to_string())
                .with_detail("color", color)
                .with_detail("requested", requested)
                .with_detail("available", available),
            InventoryError::QuantityOverflow { key, color } => app
                .with_detail("position", key.to_string())
                .with_detail("color", color),
            InventoryError::DestinationOccupied { key, sku } => app
                .with_detail("position", key.to_string())
                .with_detail("sku", sku),
            InventoryError::PartialCommitFailure { rolled_back, .. } => {
                app.with_detail("rolled_back", rolled_back)
            }
            _ => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn grid_errors_keep_their_meaning() {
        let key = PositionKey::new(1, 9, 9);
        let err: InventoryError = GridError::InvalidPosition(key).into();
        assert_eq!(err.code(), ErrorCode::InvalidPosition);

        let err: InventoryError = GridError::DuplicateShelf(1).into();
        assert_eq!(err.code(), ErrorCode::DuplicateShelf);
    }

    #[test]
    fn converts_to_app_error_with_details() {
        let err = InventoryError::LocationBusy(PositionKey::new(1, 0, 0));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::LocationBusy);
        assert_eq!(app.http_status(), StatusCode::CONFLICT);
        let details = app.details.unwrap();
        assert_eq!(details["position"], "1/0/0");
    }

    #[test]
    fn overflow_is_an_invalid_quantity() {
        let err = InventoryError::QuantityOverflow {
            key: PositionKey::new(1, 0, 0),
            color: "RED".into(),
        };
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InvalidQuantity);
        assert_eq!(app.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.details.unwrap()["color"], "RED");
    }

    #[test]
    fn store_errors_become_unavailable() {
        let err: InventoryError = StoreError::Unavailable("offline".into()).into();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
        let app: AppError = err.into();
        assert_eq!(app.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
