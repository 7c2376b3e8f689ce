//! Unified error codes for the shelf inventory engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 6xxx: Position / product errors
//! - 7xxx: Shelf errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so that clients of the HTTP
/// surface and the mirror can match on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 6xxx: Position / Product ====================
    /// Position outside shelf bounds
    InvalidPosition = 6001,
    /// Product record is malformed (empty SKU, duplicate color code)
    ProductInvalid = 6002,
    /// Quantity is zero or past the supported maximum
    InvalidQuantity = 6003,
    /// Requested quantity exceeds the color entry
    InsufficientQuantity = 6004,
    /// No product at the source position
    SourceEmpty = 6005,
    /// Source and destination are the same position
    SameLocation = 6006,
    /// Position already referenced by an in-flight move
    LocationBusy = 6007,
    /// Destination holds a different SKU
    DestinationOccupied = 6008,
    /// Move commit failed after a partial write
    PartialCommitFailure = 6009,

    // ==================== 7xxx: Shelf ====================
    /// Shelf not found
    ShelfNotFound = 7001,
    /// Shelf id already in use
    DuplicateShelf = 7002,
    /// Rows or columns not positive
    InvalidDimensions = 7003,
    /// Shrinking would discard an occupied position
    WouldOrphanProduct = 7004,
    /// Shelf still holds products
    ShelfNotEmpty = 7005,

    // ==================== 92xx: Store ====================
    /// Real-time store unreachable or failed
    StoreUnavailable = 9201,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",

            // Position / Product
            ErrorCode::InvalidPosition => "Position is outside the shelf",
            ErrorCode::ProductInvalid => "Product record is invalid",
            ErrorCode::InvalidQuantity => "Quantity must be positive and within range",
            ErrorCode::InsufficientQuantity => "Insufficient quantity at source",
            ErrorCode::SourceEmpty => "Source position is empty",
            ErrorCode::SameLocation => "Source and destination are the same position",
            ErrorCode::LocationBusy => "Position is busy with another move",
            ErrorCode::DestinationOccupied => "Destination holds a different product",
            ErrorCode::PartialCommitFailure => "Move failed after a partial write",

            // Shelf
            ErrorCode::ShelfNotFound => "Shelf not found",
            ErrorCode::DuplicateShelf => "Shelf already exists",
            ErrorCode::InvalidDimensions => "Shelf dimensions must be positive",
            ErrorCode::WouldOrphanProduct => "Resize would discard an occupied position",
            ErrorCode::ShelfNotEmpty => "Shelf still holds products",

            // Store
            ErrorCode::StoreUnavailable => "Real-time store is unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),

            // Position / Product
            6001 => Ok(ErrorCode::InvalidPosition),
            6002 => Ok(ErrorCode::ProductInvalid),
            6003 => Ok(ErrorCode::InvalidQuantity),
            6004 => Ok(ErrorCode::InsufficientQuantity),
            6005 => Ok(ErrorCode::SourceEmpty),
            6006 => Ok(ErrorCode::SameLocation),
            6007 => Ok(ErrorCode::LocationBusy),
            6008 => Ok(ErrorCode::DestinationOccupied),
            6009 => Ok(ErrorCode::PartialCommitFailure),

            // Shelf
            7001 => Ok(ErrorCode::ShelfNotFound),
            7002 => Ok(ErrorCode::DuplicateShelf),
            7003 => Ok(ErrorCode::InvalidDimensions),
            7004 => Ok(ErrorCode::WouldOrphanProduct),
            7005 => Ok(ErrorCode::ShelfNotEmpty),

            // Store
            9201 => Ok(ErrorCode::StoreUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
