//! User domain model
//!
//! A [`User`] is the in-memory, checked-out form of an account: its durable
//! data plus the passkey it will be re-sealed with. [`UserRecord`] is the
//! durable form that gets encoded and sealed.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::encryption::{KdfMetadata, Passkey};
use super::rule::{Rule, RuleSet};
use super::transaction::Transaction;

/// Durable state of a user. Deliberately has no key material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    /// Most recent first
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl UserRecord {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transactions: Vec::new(),
            rules: Vec::new(),
        }
    }
}

/// Mutable per-user data, guarded by the user's own lock
#[derive(Debug, Default)]
struct UserData {
    transactions: Vec<Transaction>,
    rules: RuleSet,
}

/// Outcome of applying a user's rules to their transactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizeResult {
    pub evaluated: usize,
    pub categorized: usize,
    /// One message per transaction that matched more than one rule
    pub conflicts: Vec<String>,
}

/// An authenticated user's data, checked out of durable storage
pub struct User {
    name: String,
    passkey: Passkey,
    kdf: KdfMetadata,
    data: Mutex<UserData>,
}

impl User {
    /// Create a brand new user with no transactions or rules
    pub fn new(name: impl Into<String>, passkey: Passkey, kdf: KdfMetadata) -> Self {
        Self {
            name: name.into(),
            passkey,
            kdf,
            data: Mutex::new(UserData::default()),
        }
    }

    /// Rebuild a user from its durable record and the key it was opened with
    pub fn from_record(record: UserRecord, passkey: Passkey, kdf: KdfMetadata) -> Self {
        Self {
            name: record.name,
            passkey,
            kdf,
            data: Mutex::new(UserData {
                transactions: record.transactions,
                rules: RuleSet::from_rules(record.rules),
            }),
        }
    }

    /// Snapshot the durable state
    pub fn to_record(&self) -> UserRecord {
        let data = self.data();
        UserRecord {
            name: self.name.clone(),
            transactions: data.transactions.clone(),
            rules: data.rules.rules(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key this user is sealed with. Must never be logged or persisted.
    pub fn passkey(&self) -> &Passkey {
        &self.passkey
    }

    pub fn kdf(&self) -> &KdfMetadata {
        &self.kdf
    }

    fn data(&self) -> MutexGuard<'_, UserData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All transactions, most recent first
    pub fn transactions(&self) -> Vec<Transaction> {
        self.data().transactions.clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.data().transactions.len()
    }

    /// Import transactions, skipping any whose id is already present
    ///
    /// Returns the number of newly added transactions. The collection stays
    /// sorted most-recent-first; equal dates keep their insertion order.
    pub fn import_transactions(&self, incoming: Vec<Transaction>) -> usize {
        let mut data = self.data();

        let mut seen: HashSet<String> = data.transactions.iter().map(|t| t.id.clone()).collect();
        let mut count = 0;
        for tx in incoming {
            if seen.insert(tx.id.clone()) {
                data.transactions.push(tx);
                count += 1;
            }
        }
        data.transactions.sort_by(|a, b| b.date.cmp(&a.date));
        count
    }

    /// All rules, ordered by name
    pub fn rules(&self) -> Vec<Rule> {
        self.data().rules.rules()
    }

    /// Add a rule, returning false if one with the same name exists
    pub fn add_rule(&self, rule: Rule) -> bool {
        self.data().rules.add(rule)
    }

    /// Add or replace a rule by name
    pub fn upsert_rule(&self, rule: Rule) {
        self.data().rules.upsert(rule)
    }

    /// Delete a rule by name, returning true if it existed
    pub fn delete_rule(&self, name: &str) -> bool {
        self.data().rules.delete(name)
    }

    /// Apply the user's rules to every transaction
    pub fn categorize(&self) -> CategorizeResult {
        let mut guard = self.data();
        let data = &mut *guard;

        let mut result = CategorizeResult::default();
        for tx in data.transactions.iter_mut() {
            result.evaluated += 1;
            match data.rules.evaluate(tx) {
                Ok(true) => result.categorized += 1,
                Ok(false) => {}
                Err(e) => result.conflicts.push(e.to_string()),
            }
        }
        result
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("User")
            .field("name", &self.name)
            .field("transactions", &data.transactions.len())
            .field("rules", &data.rules.len())
            .field("passkey", &self.passkey)
            .finish()
    }
}
