//! Domain models - pure data and validation, no I/O

mod backup;
mod encryption;
pub mod result;
pub mod rule;
mod transaction;
mod user;

pub use backup::BackupMetadata;
pub use encryption::{Argon2Params, KdfAlgorithm, KdfMetadata, Passkey, KEY_LEN};
pub use rule::{AmountRange, DateRange, Pattern, Rule, RuleSet};
pub use transaction::{Category, Transaction};
pub use user::{CategorizeResult, User, UserRecord};
