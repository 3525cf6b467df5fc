//! Status service - summary of a user's data and the store

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{KdfAlgorithm, User};
use crate::ports::UserStore;

/// Status service for per-user summaries
pub struct StatusService {
    store: Arc<dyn UserStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Summary for a checked-out user
    pub fn get_status(&self, user: &User) -> Result<StatusSummary> {
        let transactions = user.transactions();
        let categorized = transactions.iter().filter(|t| t.is_categorized()).count();

        // Transactions are kept most recent first
        let date_range = DateRange {
            earliest: transactions.last().map(|t| t.date.to_string()),
            latest: transactions.first().map(|t| t.date.to_string()),
        };

        Ok(StatusSummary {
            user: user.name().to_string(),
            kdf: user.kdf().algorithm,
            total_transactions: transactions.len(),
            categorized,
            uncategorized: transactions.len() - categorized,
            total_rules: user.rules().len(),
            date_range,
            stored_users: self.store.list()?.len(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub user: String,
    pub kdf: KdfAlgorithm,
    pub total_transactions: usize,
    pub categorized: usize,
    pub uncategorized: usize,
    pub total_rules: usize,
    pub date_range: DateRange,
    /// Accounts with a durable record in this data directory
    pub stored_users: usize,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}
