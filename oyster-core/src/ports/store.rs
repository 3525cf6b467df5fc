//! User store port - durable, sealed per-user records

use crate::domain::result::Result;
use crate::domain::{KdfMetadata, Passkey, User};

/// Durable storage of sealed user records
///
/// Existence of a record means the account exists. Implementations must
/// never write a record in clear and never leave a partially written record
/// behind.
pub trait UserStore: Send + Sync {
    /// Whether a durable record exists for this name
    fn exists(&self, name: &str) -> Result<bool>;

    /// Key derivation metadata for an existing user
    ///
    /// Users without stored metadata use [`KdfMetadata::legacy`].
    fn kdf_for(&self, name: &str) -> Result<KdfMetadata>;

    /// Seal and atomically persist the user's current state
    fn save(&self, user: &User) -> Result<()>;

    /// Read and open a user's record
    ///
    /// Missing record is [`crate::Error::NotFound`]; a wrong key or a
    /// modified record is [`crate::Error::Integrity`].
    fn load(&self, name: &str, passkey: Passkey, kdf: KdfMetadata) -> Result<User>;

    /// Names of every stored user, sorted
    fn list(&self) -> Result<Vec<String>>;
}
