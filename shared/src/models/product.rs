//! Product Model
//!
//! A product is one SKU stored in one position, split into color-coded
//! quantity entries. A record whose entries are all empty is never stored:
//! [`Product::normalized`] turns it into "no product".

use serde::{Deserialize, Serialize};

/// One color variant of a product and its unit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    pub code: String,
    pub quantity: u64,
}

impl ColorEntry {
    pub fn new(code: impl Into<String>, quantity: u64) -> Self {
        Self {
            code: code.into(),
            quantity,
        }
    }
}

/// Product entity stored in a position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub colors: Vec<ColorEntry>,
    /// Unix millis of the last change to this record
    #[serde(default)]
    pub last_modified: i64,
}

/// Structural problems that make a product record unusable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductIssue {
    #[error("SKU must not be empty")]
    EmptySku,

    #[error("color code must not be empty")]
    EmptyColorCode,

    #[error("color code {0} appears more than once")]
    DuplicateColor(String),

    #[error("quantities add up past the supported maximum at color {0}")]
    QuantityOverflow(String),
}

/// Adding units would push the product total past `u64::MAX`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("quantity of {color} would overflow")]
pub struct QuantityOverflow {
    pub color: String,
}

impl Product {
    pub fn new(sku: impl Into<String>, unit: impl Into<String>, colors: Vec<ColorEntry>) -> Self {
        Self {
            sku: sku.into(),
            unit: unit.into(),
            colors,
            last_modified: crate::util::now_millis(),
        }
    }

    /// Sum of every color entry, saturating at `u64::MAX`
    pub fn total_quantity(&self) -> u64 {
        self.colors
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.quantity))
    }

    /// Sum of every color entry, `None` on overflow
    pub fn checked_total(&self) -> Option<u64> {
        self.colors
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(c.quantity))
    }

    pub fn color(&self, code: &str) -> Option<&ColorEntry> {
        self.colors.iter().find(|c| c.code == code)
    }

    /// Quantity held for `code`, zero when the entry is absent
    pub fn quantity_of(&self, code: &str) -> u64 {
        self.color(code).map(|c| c.quantity).unwrap_or(0)
    }

    /// True when the record carries no units at all
    pub fn is_husk(&self) -> bool {
        self.colors.iter().all(|c| c.quantity == 0)
    }

    /// Check SKU and color codes
    pub fn validate(&self) -> Result<(), ProductIssue> {
        if self.sku.trim().is_empty() {
            return Err(ProductIssue::EmptySku);
        }
        for (i, entry) in self.colors.iter().enumerate() {
            if entry.code.trim().is_empty() {
                return Err(ProductIssue::EmptyColorCode);
            }
            if self.colors[..i].iter().any(|c| c.code == entry.code) {
                return Err(ProductIssue::DuplicateColor(entry.code.clone()));
            }
        }
        let mut total = 0u64;
        for entry in &self.colors {
            total = total
                .checked_add(entry.quantity)
                .ok_or_else(|| ProductIssue::QuantityOverflow(entry.code.clone()))?;
        }
        Ok(())
    }

    /// Drop zero entries; `None` when nothing is left
    pub fn normalized(mut self) -> Option<Self> {
        self.colors.retain(|c| c.quantity > 0);
        if self.colors.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Add units to `code`, appending the entry if it does not exist yet
    ///
    /// Refused, leaving the product untouched, when the product total
    /// would no longer fit in a `u64`.
    pub fn add_quantity(&mut self, code: &str, quantity: u64) -> Result<(), QuantityOverflow> {
        let overflow = || QuantityOverflow {
            color: code.to_string(),
        };
        self.checked_total()
            .and_then(|total| total.checked_add(quantity))
            .ok_or_else(overflow)?;
        // entry <= total, so this cannot wrap
        match self.colors.iter_mut().find(|c| c.code == code) {
            Some(entry) => entry.quantity += quantity,
            None => self.colors.push(ColorEntry::new(code, quantity)),
        }
        Ok(())
    }

    /// Remove units from `code`
    ///
    /// The entry disappears when it reaches zero. Returns the available
    /// quantity as the error when the entry holds less than requested.
    pub fn take_quantity(&mut self, code: &str, quantity: u64) -> Result<(), u64> {
        let available = self.quantity_of(code);
        if available < quantity {
            return Err(available);
        }
        if let Some(entry) = self.colors.iter_mut().find(|c| c.code == code) {
            entry.quantity -= quantity;
        }
        self.colors.retain(|c| c.quantity > 0);
        Ok(())
    }

    /// Fold every entry of `other` into this product
    ///
    /// All or nothing: on overflow no entry has been changed.
    pub fn merge_colors(&mut self, other: &Product) -> Result<(), QuantityOverflow> {
        let fits = self
            .checked_total()
            .zip(other.checked_total())
            .and_then(|(a, b)| a.checked_add(b))
            .is_some();
        if !fits {
            return Err(QuantityOverflow {
                color: other
                    .colors
                    .first()
                    .map(|c| c.code.clone())
                    .unwrap_or_default(),
            });
        }
        for entry in &other.colors {
            self.add_quantity(&entry.code, entry.quantity)?;
        }
        Ok(())
    }
}
