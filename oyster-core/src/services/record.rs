//! User record codec - JSON compressed with gzip
//!
//! The encoded bytes are what gets sealed; they never touch disk in clear.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::domain::result::{Error, Result};
use crate::domain::UserRecord;

/// Serialize and compress a user record
pub fn encode(record: &UserRecord) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(record)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

/// Decompress and deserialize a user record
///
/// Anything that is not valid gzip carrying a valid record fails with
/// [`Error::Format`].
pub fn decode(bytes: &[u8]) -> Result<UserRecord> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| Error::format(format!("corrupt compressed record: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| Error::format(format!("malformed user record: {e}")))
}
