//! Key material and key derivation domain models

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a derived passkey in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// A password-derived 256-bit key, zeroized on drop
///
/// Held only in memory for the duration of a session. Never serialized and
/// never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passkey([u8; KEY_LEN]);

impl Passkey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes. Callers must not log or persist them.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl PartialEq for Passkey {
    fn eq(&self, other: &Self) -> bool {
        // No early exit on the first differing byte
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for Passkey {}

impl fmt::Debug for Passkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passkey").field("bytes", &"[REDACTED]").finish()
    }
}

/// Default Argon2id parameters
pub const DEFAULT_TIME_COST: u32 = 3;
pub const DEFAULT_MEMORY_COST: u32 = 65536; // 64 MiB
pub const DEFAULT_PARALLELISM: u32 = 4;
pub const DEFAULT_HASH_LEN: u32 = 32;

/// How a user's passkey is derived from their password
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KdfAlgorithm {
    /// SHA-256 digest XOR-folded into the key. No salt; compatible with
    /// every existing user file.
    #[default]
    #[serde(rename = "sha256-fold")]
    Sha256Fold,
    /// Salted Argon2id; the salt lives in the user's metadata sidecar
    #[serde(rename = "argon2id")]
    Argon2id,
}

impl KdfAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KdfAlgorithm::Sha256Fold => "sha256-fold",
            KdfAlgorithm::Argon2id => "argon2id",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sha256-fold" | "sha256" | "legacy" => Some(KdfAlgorithm::Sha256Fold),
            "argon2id" | "argon2" => Some(KdfAlgorithm::Argon2id),
            _ => None,
        }
    }
}

/// Argon2id parameters for key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
    pub hash_len: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
            hash_len: DEFAULT_HASH_LEN,
        }
    }
}

/// Per-user key derivation metadata, stored next to the sealed user file
///
/// Never contains key material. Users without a sidecar use the
/// [`KdfMetadata::legacy`] scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfMetadata {
    pub algorithm: KdfAlgorithm,
    /// Base64-encoded random salt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argon2_params: Option<Argon2Params>,
}

impl KdfMetadata {
    /// The unsalted digest-fold scheme
    pub fn legacy() -> Self {
        Self {
            algorithm: KdfAlgorithm::Sha256Fold,
            salt: None,
            version: 1,
            argon2_params: None,
        }
    }

    /// Metadata for a salted Argon2id derivation
    pub fn argon2id(salt: String, params: Argon2Params) -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            salt: Some(salt),
            version: 1,
            argon2_params: Some(params),
        }
    }

    /// Whether this scheme needs a sidecar file to be reproducible
    pub fn needs_sidecar(&self) -> bool {
        self.algorithm != KdfAlgorithm::Sha256Fold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passkey_debug_is_redacted() {
        let key = Passkey::from_bytes([7u8; KEY_LEN]);
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains('7'));
        assert_eq!(key, Passkey::from_bytes([7u8; KEY_LEN]));
        assert_ne!(key, Passkey::from_bytes([8u8; KEY_LEN]));
    }

    #[test]
    fn test_kdf_algorithm_serde_names() {
        assert_eq!(
            serde_json::to_string(&KdfAlgorithm::Sha256Fold).unwrap(),
            "\"sha256-fold\""
        );
        assert_eq!(
            serde_json::from_str::<KdfAlgorithm>("\"argon2id\"").unwrap(),
            KdfAlgorithm::Argon2id
        );
        assert_eq!(KdfAlgorithm::parse("Argon2"), Some(KdfAlgorithm::Argon2id));
        assert_eq!(KdfAlgorithm::parse("scrypt"), None);
    }

    #[test]
    fn test_metadata_creation() {
        let meta = KdfMetadata::argon2id("base64salt==".to_string(), Argon2Params::default());
        assert!(meta.needs_sidecar());
        assert_eq!(meta.version, 1);
        assert_eq!(meta.argon2_params.unwrap().memory_cost, 65536);

        let legacy = KdfMetadata::legacy();
        assert!(!legacy.needs_sidecar());
        assert!(legacy.salt.is_none());
    }
}
