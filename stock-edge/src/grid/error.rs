use shared::PositionKey;
use shared::models::ProductIssue;
use thiserror::Error;

/// Grid model errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Shelf not found: {0}")]
    ShelfNotFound(i64),

    #[error("Shelf {0} already exists")]
    DuplicateShelf(i64),

    #[error("Invalid shelf dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: u32, cols: u32 },

    #[error("Position {0} is outside its shelf")]
    InvalidPosition(PositionKey),

    #[error("Resizing shelf {shelf_id} would orphan the product at {key}")]
    WouldOrphanProduct { shelf_id: i64, key: PositionKey },

    #[error("Shelf {shelf_id} still holds {occupied} product(s)")]
    ShelfNotEmpty { shelf_id: i64, occupied: usize },

    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductIssue),
}

pub type GridResult<T> = Result<T, GridError>;
