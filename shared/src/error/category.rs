//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 2xxx: Permission errors
/// - 6xxx: Position / product errors
/// - 7xxx: Shelf errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Permission errors (2xxx)
    Permission,
    /// Position / product errors (6xxx)
    Position,
    /// Shelf errors (7xxx)
    Shelf,
    /// System errors (9xxx and anything unassigned)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            2000..3000 => Self::Permission,
            6000..7000 => Self::Position,
            7000..8000 => Self::Shelf,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Permission => "permission",
            Self::Position => "position",
            Self::Shelf => "shelf",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(6008), ErrorCategory::Position);
        assert_eq!(ErrorCategory::from_code(7002), ErrorCategory::Shelf);
        assert_eq!(ErrorCategory::from_code(9201), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(1500), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(
            ErrorCode::PermissionDenied.category(),
            ErrorCategory::Permission
        );
        assert_eq!(ErrorCode::LocationBusy.category(), ErrorCategory::Position);
        assert_eq!(ErrorCode::ShelfNotEmpty.category(), ErrorCategory::Shelf);
        assert_eq!(
            ErrorCode::StoreUnavailable.category(),
            ErrorCategory::System
        );
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Position).unwrap();
        assert_eq!(json, "\"position\"");
        let category: ErrorCategory = serde_json::from_str("\"shelf\"").unwrap();
        assert_eq!(category, ErrorCategory::Shelf);
    }
}
