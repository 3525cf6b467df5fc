//! Encryption primitives - key derivation and authenticated encryption
//!
//! Sealed blob format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`,
//! AES-256-GCM with a fresh random nonce per seal. These lengths are part of
//! the on-disk format and must not change without migrating every user file.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::result::{Error, Result};
use crate::domain::{Argon2Params, KdfAlgorithm, KdfMetadata, Passkey, KEY_LEN};

/// Nonce length for AES-256-GCM (96 bits)
pub const NONCE_LEN: usize = 12;

/// Authentication tag appended by AES-GCM
pub const TAG_LEN: usize = 16;

/// Salt length for Argon2id derivation
const SALT_LEN: usize = 16;

/// Derive a passkey with the unsalted digest-fold scheme
///
/// Every byte of the SHA-256 digest is XOR-folded into the key buffer, so no
/// digest bits are dropped whatever the key length. Deterministic across
/// processes.
pub fn derive_passkey(password: &str) -> Passkey {
    let digest = Sha256::digest(password.as_bytes());
    let mut key = [0u8; KEY_LEN];
    for (i, byte) in digest.iter().enumerate() {
        key[i % KEY_LEN] ^= byte;
    }
    Passkey::from_bytes(key)
}

/// Derive a passkey from password and salt using Argon2id
pub fn derive_passkey_argon2(password: &str, salt: &[u8], params: &Argon2Params) -> Result<Passkey> {
    if params.hash_len as usize != KEY_LEN {
        return Err(Error::Config(format!(
            "argon2 hash length must be {KEY_LEN}, got {}",
            params.hash_len
        )));
    }

    let argon2_params = argon2::Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| Error::Config(format!("Failed to create argon2 params: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| Error::Crypto(format!("Failed to derive key: {e}")))?;

    Ok(Passkey::from_bytes(key))
}

/// Derive the passkey described by a user's KDF metadata
pub fn derive_with(password: &str, meta: &KdfMetadata) -> Result<Passkey> {
    match meta.algorithm {
        KdfAlgorithm::Sha256Fold => Ok(derive_passkey(password)),
        KdfAlgorithm::Argon2id => {
            let salt_b64 = meta
                .salt
                .as_deref()
                .ok_or_else(|| Error::format("argon2id metadata without salt"))?;
            let salt = base64::engine::general_purpose::STANDARD
                .decode(salt_b64)
                .map_err(|e| Error::format(format!("Invalid salt in KDF metadata: {e}")))?;
            let params = meta.argon2_params.clone().unwrap_or_default();
            derive_passkey_argon2(password, &salt, &params)
        }
    }
}

/// Fresh metadata for a new user, generating a random salt when needed
pub fn new_kdf_metadata(algorithm: KdfAlgorithm, params: &Argon2Params) -> KdfMetadata {
    match algorithm {
        KdfAlgorithm::Sha256Fold => KdfMetadata::legacy(),
        KdfAlgorithm::Argon2id => {
            let mut salt = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut salt);
            let salt_b64 = base64::engine::general_purpose::STANDARD.encode(salt);
            KdfMetadata::argon2id(salt_b64, params.clone())
        }
    }
}

/// Encrypt plaintext under the passkey with a fresh random nonce
pub fn seal(key: &Passkey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("AES encryption failed: {e}")))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt a blob produced by [`seal`]
///
/// Wrong key, truncation, and any modified byte all fail with
/// [`Error::Integrity`]; no plaintext is returned in those cases.
pub fn open(key: &Passkey, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::integrity(format!(
            "sealed data too short: {} bytes",
            blob.len()
        )));
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| Error::integrity("authentication failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> Argon2Params {
        Argon2Params {
            time_cost: 1,
            memory_cost: 64,
            parallelism: 1,
            hash_len: 32,
        }
    }

    #[test]
    fn test_derive_is_deterministic() {
        for word in ["hello", "", "PASSWORD"] {
            let key = derive_passkey(word);
            for _ in 0..10 {
                assert_eq!(derive_passkey(word), key, "{word}");
            }
        }
    }

    #[test]
    fn test_derive_folds_full_digest() {
        // A 32-byte digest folded into a 32-byte key is the digest itself
        let digest = Sha256::digest(b"test");
        assert_eq!(derive_passkey("test").as_bytes().as_slice(), digest.as_slice());
        assert_ne!(derive_passkey("test"), derive_passkey("test "));
    }

    #[test]
    fn test_argon2_is_deterministic_per_salt() {
        let params = fast_params();
        let a = derive_passkey_argon2("secret1", b"0123456789abcdef", &params).unwrap();
        let b = derive_passkey_argon2("secret1", b"0123456789abcdef", &params).unwrap();
        let c = derive_passkey_argon2("secret1", b"fedcba9876543210", &params).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_argon2_rejects_wrong_hash_len() {
        let mut params = fast_params();
        params.hash_len = 16;
        assert!(matches!(
            derive_passkey_argon2("pw", b"0123456789abcdef", &params),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_derive_with_metadata() {
        let legacy = derive_with("pw1234", &KdfMetadata::legacy()).unwrap();
        assert_eq!(legacy, derive_passkey("pw1234"));

        let meta = new_kdf_metadata(KdfAlgorithm::Argon2id, &fast_params());
        assert!(meta.salt.is_some());
        let k1 = derive_with("pw1234", &meta).unwrap();
        let k2 = derive_with("pw1234", &meta).unwrap();
        assert_eq!(k1, k2);
        assert_ne!(k1, legacy);

        // Two users with the same password get different salts and keys
        let other = new_kdf_metadata(KdfAlgorithm::Argon2id, &fast_params());
        assert_ne!(derive_with("pw1234", &other).unwrap(), k1);
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = derive_passkey("secret");
        let blob = seal(&key, b"plaintext data").unwrap();
        assert_eq!(blob.len(), NONCE_LEN + b"plaintext data".len() + TAG_LEN);
        assert_eq!(open(&key, &blob).unwrap(), b"plaintext data");

        let empty = seal(&key, b"").unwrap();
        assert!(open(&key, &empty).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = derive_passkey("secret");
        let a = seal(&key, b"same").unwrap();
        let b = seal(&key, b"same").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let blob = seal(&derive_passkey("right"), b"secret").unwrap();
        assert!(matches!(open(&derive_passkey("wrong"), &blob), Err(Error::Integrity(_))));
    }

    #[test]
    fn test_every_single_byte_flip_is_detected() {
        let key = derive_passkey("secret");
        let blob = seal(&key, b"financial data").unwrap();
        for i in 0..blob.len() {
            let mut tampered = blob.clone();
            tampered[i] ^= 0x01;
            assert!(
                matches!(open(&key, &tampered), Err(Error::Integrity(_))),
                "flip at byte {i} was not detected"
            );
        }
    }

    #[test]
    fn test_truncated_blob_fails() {
        let key = derive_passkey("secret");
        let blob = seal(&key, b"financial data").unwrap();
        assert!(matches!(open(&key, &blob[..10]), Err(Error::Integrity(_))));
        assert!(matches!(open(&key, &blob[..blob.len() - 1]), Err(Error::Integrity(_))));
        assert!(matches!(open(&key, &[]), Err(Error::Integrity(_))));
    }
}
