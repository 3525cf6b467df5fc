//! Transaction domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A transaction's entry against a budget category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub amount: Decimal,
}

/// A single financial transaction mapped to zero or more categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Deterministic fingerprint, stable across re-imports of the same row
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(rename = "categories", default)]
    pub categories: Vec<Category>,
}

impl Transaction {
    /// Create a new uncategorized transaction, deriving its id
    pub fn new(description: impl Into<String>, amount: Decimal, date: NaiveDate) -> Self {
        let description = description.into();
        let id = Self::calculate_fingerprint(&description, amount, date);
        Self {
            id,
            description,
            amount,
            date,
            categories: Vec::new(),
        }
    }

    /// Calculate the fingerprint id used for import deduplication
    ///
    /// Uses date, amount (normalized to 2 decimals, -0 treated as 0) and the
    /// trimmed description.
    pub fn calculate_fingerprint(description: &str, amount: Decimal, date: NaiveDate) -> String {
        let amount = if amount.is_zero() { Decimal::ZERO } else { amount };
        let fingerprint_str = format!(
            "{}|{}|{:.2}",
            date.format("%Y-%m-%d"),
            description.trim(),
            amount
        );

        let mut hasher = Sha256::new();
        hasher.update(fingerprint_str.as_bytes());
        let result = hasher.finalize();
        format!("TRANS-{}", hex::encode(&result[..8]))
    }

    /// Whether a category has been assigned
    pub fn is_categorized(&self) -> bool {
        !self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = Transaction::new("ACME STORE", Decimal::new(-5000, 2), date(2025, 1, 15));
        let b = Transaction::new("ACME STORE", Decimal::new(-50, 0), date(2025, 1, 15));
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("TRANS-"));
        assert_eq!(a.id.len(), "TRANS-".len() + 16);
    }

    #[test]
    fn test_fingerprint_differs_by_field() {
        let base = Transaction::new("ACME", Decimal::new(100, 2), date(2025, 1, 15));
        let other_day = Transaction::new("ACME", Decimal::new(100, 2), date(2025, 1, 16));
        let other_amount = Transaction::new("ACME", Decimal::new(101, 2), date(2025, 1, 15));
        let other_desc = Transaction::new("ACME 2", Decimal::new(100, 2), date(2025, 1, 15));
        assert_ne!(base.id, other_day.id);
        assert_ne!(base.id, other_amount.id);
        assert_ne!(base.id, other_desc.id);
    }

    #[test]
    fn test_new_transaction_is_uncategorized() {
        let tx = Transaction::new("Coffee", Decimal::new(-450, 2), date(2024, 3, 1));
        assert!(!tx.is_categorized());
    }
}
