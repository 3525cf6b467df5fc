//! Filesystem user store
//!
//! One sealed file per user under `<data_dir>/users/`, named by the
//! base64url encoding of `name + "-Oyster"`. Optional key derivation
//! metadata sits next to it in `<encoded>.kdf.json`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};
use crate::domain::{KdfMetadata, Passkey, User};
use crate::ports::UserStore;
use crate::services::{encryption, record};

const NAME_SUFFIX: &str = "-Oyster";
const SIDECAR_EXT: &str = ".kdf.json";
const LOCK_FILE: &str = ".lock";

/// Filename for a user's sealed record. The raw name never hits the disk.
pub fn encode_name(name: &str) -> String {
    base64::engine::general_purpose::URL_SAFE.encode(format!("{name}{NAME_SUFFIX}"))
}

/// Inverse of [`encode_name`]; `None` for files that are not user records
pub fn decode_name(file_name: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::URL_SAFE
        .decode(file_name)
        .ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    decoded.strip_suffix(NAME_SUFFIX).map(str::to_string)
}

/// Replace `path` with `contents` through a temp file in `dir`
///
/// `dir` must be the directory holding `path`. Readers see either the old
/// file or the complete new one.
pub fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    File::open(dir)?.sync_all()?;

    Ok(())
}

/// User store backed by a directory of sealed files
///
/// Holds an exclusive lock on the directory for its whole lifetime.
#[derive(Debug)]
pub struct FileUserStore {
    users_dir: PathBuf,
    _lock: File,
}

impl FileUserStore {
    /// Open (creating if needed) the user directory under `data_dir`
    ///
    /// Fails with [`Error::Config`] if another store already owns it.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let users_dir = data_dir.join("users");
        fs::create_dir_all(&users_dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(users_dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|_| {
            Error::Config(format!(
                "user directory {} is in use by another process",
                users_dir.display()
            ))
        })?;

        Ok(Self {
            users_dir,
            _lock: lock,
        })
    }

    pub fn users_dir(&self) -> &Path {
        &self.users_dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.users_dir.join(encode_name(name))
    }

    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.users_dir
            .join(format!("{}{SIDECAR_EXT}", encode_name(name)))
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<()> {
        Ok(write_atomic(&self.users_dir, path, contents)?)
    }
}

impl UserStore for FileUserStore {
    /// Anything at the record path counts, so a stat failure never frees a name
    fn exists(&self, name: &str) -> Result<bool> {
        match fs::metadata(self.record_path(name)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn kdf_for(&self, name: &str) -> Result<KdfMetadata> {
        let path = self.sidecar_path(name);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::format(format!("malformed key metadata: {e}"))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(KdfMetadata::legacy()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, user: &User) -> Result<()> {
        let plaintext = record::encode(&user.to_record())?;
        let sealed = encryption::seal(user.passkey(), &plaintext)?;

        // Metadata first: a record must never exist without the means to open it
        if user.kdf().needs_sidecar() {
            let meta = serde_json::to_vec_pretty(user.kdf())?;
            self.write_file(&self.sidecar_path(user.name()), &meta)?;
        }
        self.write_file(&self.record_path(user.name()), &sealed)
    }

    fn load(&self, name: &str, passkey: Passkey, kdf: KdfMetadata) -> Result<User> {
        let sealed = match fs::read(self.record_path(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::not_found("no such user"));
            }
            Err(e) => return Err(e.into()),
        };

        let plaintext = encryption::open(&passkey, &sealed)?;
        let record = record::decode(&plaintext)?;
        if record.name != name {
            return Err(Error::format("record belongs to a different user"));
        }
        Ok(User::from_record(record, passkey, kdf))
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.users_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') || file_name.ends_with(SIDECAR_EXT) {
                continue;
            }
            if let Some(name) = decode_name(file_name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
