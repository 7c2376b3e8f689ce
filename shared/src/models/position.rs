//! Position key

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Composite key `(shelf_id, row, col)` of one grid cell
///
/// Ordered by shelf, then row, then column, which is also the iteration order
/// of the grid model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    pub shelf_id: i64,
    pub row: u32,
    pub col: u32,
}

impl PositionKey {
    pub const fn new(shelf_id: i64, row: u32, col: u32) -> Self {
        Self { shelf_id, row, col }
    }

    /// Cell label inside the shelf ("A1", "B3", ...)
    pub fn label(&self) -> String {
        crate::util::cell_label(self.row, self.col)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.shelf_id, self.row, self.col)
    }
}

/// Error parsing a `shelf/row/col` key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid position key: {0}")]
pub struct InvalidPositionKey(pub String);

impl FromStr for PositionKey {
    type Err = InvalidPositionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(shelf), Some(row), Some(col), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InvalidPositionKey(s.to_string()));
        };
        let err = || InvalidPositionKey(s.to_string());
        Ok(Self {
            shelf_id: shelf.parse().map_err(|_| err())?,
            row: row.parse().map_err(|_| err())?,
            col: col.parse().map_err(|_| err())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let key = PositionKey::new(12, 3, 4);
        assert_eq!(key.to_string(), "12/3/4");
        assert_eq!("12/3/4".parse::<PositionKey>().unwrap(), key);
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert!("12/3".parse::<PositionKey>().is_err());
        assert!("12/3/4/5".parse::<PositionKey>().is_err());
        assert!("a/b/c".parse::<PositionKey>().is_err());
        assert!("1/-1/0".parse::<PositionKey>().is_err());
    }

    #[test]
    fn ordering_is_shelf_row_col() {
        let mut keys = vec![
            PositionKey::new(2, 0, 0),
            PositionKey::new(1, 1, 0),
            PositionKey::new(1, 0, 5),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                PositionKey::new(1, 0, 5),
                PositionKey::new(1, 1, 0),
                PositionKey::new(2, 0, 0),
            ]
        );
    }
}
