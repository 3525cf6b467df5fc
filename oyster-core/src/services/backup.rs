//! Backup service - ZIP archives of the sealed user directory
//!
//! Archives hold the user files exactly as they are on disk (still
//! encrypted) plus `settings.json`. Nothing is ever decrypted here.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::adapters::file_store::write_atomic;
use crate::adapters::FileUserStore;
use crate::domain::BackupMetadata;

const SETTINGS_FILE: &str = "settings.json";
const USERS_PREFIX: &str = "users/";
const BACKUP_PREFIX: &str = "oyster-";
const PRE_RESTORE_PREFIX: &str = "oyster-pre-restore-";

/// Files in the user directory that belong in a backup
fn is_backed_up(file_name: &str) -> bool {
    // Skips the lock file and in-flight temp files
    !file_name.starts_with('.')
}

fn timestamped_name(prefix: &str) -> String {
    let now = Utc::now();
    format!(
        "{}{}-{:06}.zip",
        prefix,
        now.format("%Y-%m-%dT%H-%M-%S"),
        now.timestamp_subsec_micros()
    )
}

/// Parse creation time from a backup filename
fn parse_backup_time(backup_name: &str) -> Option<DateTime<Utc>> {
    let ts = backup_name
        .strip_prefix(PRE_RESTORE_PREFIX)
        .or_else(|| backup_name.strip_prefix(BACKUP_PREFIX))?
        .strip_suffix(".zip")?;
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S-%f")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S"))
        .ok()
        .map(|dt| dt.and_utc())
}

/// Backup service for the data directory
pub struct BackupService {
    data_dir: PathBuf,
}

impl BackupService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    /// Sealed user files currently on disk, by filename
    fn user_files(&self) -> Result<Vec<String>> {
        let users_dir = self.users_dir();
        if !users_dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&users_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if is_backed_up(name) {
                    files.push(name.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Write an archive of the current state; returns the number of user files
    fn write_archive(&self, path: &Path) -> Result<usize> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create backup file {}", path.display()))?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let user_files = self.user_files()?;
        for name in &user_files {
            zip.start_file(format!("{USERS_PREFIX}{name}"), options)?;
            zip.write_all(&fs::read(self.users_dir().join(name))?)?;
        }

        let settings_path = self.data_dir.join(SETTINGS_FILE);
        if settings_path.exists() {
            zip.start_file(SETTINGS_FILE, options)?;
            zip.write_all(&fs::read(&settings_path)?)?;
        }

        zip.finish()?;
        Ok(user_files.len())
    }

    /// Create a backup and apply the retention limit
    pub fn create(&self, max_backups: Option<usize>) -> Result<BackupMetadata> {
        if self.user_files()?.is_empty() {
            bail!("No user data to back up");
        }

        let backups_dir = self.backups_dir();
        fs::create_dir_all(&backups_dir)?;

        let backup_name = timestamped_name(BACKUP_PREFIX);
        let backup_path = backups_dir.join(&backup_name);
        let users = self.write_archive(&backup_path)?;
        let size_bytes = fs::metadata(&backup_path)?.len();

        if let Some(max) = max_backups {
            self.apply_retention(max)?;
        }

        Ok(BackupMetadata {
            name: backup_name,
            created_at: Utc::now(),
            size_bytes,
            users: Some(users),
        })
    }

    /// All backups, newest first
    pub fn list(&self) -> Result<Vec<BackupMetadata>> {
        let backups_dir = self.backups_dir();
        if !backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&backups_dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(created_at) = parse_backup_time(&name) else {
                continue;
            };
            backups.push(BackupMetadata {
                name,
                created_at,
                size_bytes: entry.metadata()?.len(),
                users: None,
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Replace the user directory and settings with a backup's contents
    ///
    /// Takes the user directory lock, so it fails while any store has it
    /// open. The current state is archived first as a pre-restore backup.
    pub fn restore(&self, backup_name: &str) -> Result<Option<String>> {
        if backup_name.contains(['/', '\\']) || parse_backup_time(backup_name).is_none() {
            bail!("Invalid backup name: {}", backup_name);
        }
        let backup_path = self.backups_dir().join(backup_name);
        if !backup_path.exists() {
            bail!("Backup not found: {}", backup_name);
        }

        let mut archive = ZipArchive::new(File::open(&backup_path)?)
            .with_context(|| format!("Failed to read backup {backup_name}"))?;
        Self::validate_entries(&mut archive)?;
        // Fully read (and checksum) every entry before touching anything
        let entries = Self::read_entries(&mut archive)
            .with_context(|| format!("Backup {backup_name} is damaged"))?;

        let store = FileUserStore::open(&self.data_dir)?;

        let pre_restore = if self.user_files()?.is_empty() {
            None
        } else {
            let name = timestamped_name(PRE_RESTORE_PREFIX);
            fs::create_dir_all(self.backups_dir())?;
            self.write_archive(&self.backups_dir().join(&name))?;
            Some(name)
        };

        // Each file is swapped in whole; removals come last
        let users_dir = self.users_dir();
        let mut restored = HashSet::new();
        let mut has_settings = false;
        for (name, contents) in &entries {
            match name.strip_prefix(USERS_PREFIX) {
                Some(user_file) => {
                    write_atomic(&users_dir, &users_dir.join(user_file), contents)?;
                    restored.insert(user_file.to_string());
                }
                None => {
                    write_atomic(&self.data_dir, &self.data_dir.join(SETTINGS_FILE), contents)?;
                    has_settings = true;
                }
            }
        }

        for name in self.user_files()? {
            if !restored.contains(&name) {
                fs::remove_file(users_dir.join(name))?;
            }
        }
        let settings_path = self.data_dir.join(SETTINGS_FILE);
        if !has_settings && settings_path.exists() {
            fs::remove_file(&settings_path)?;
        }

        drop(store);
        Ok(pre_restore)
    }

    fn read_entries(archive: &mut ZipArchive<File>) -> Result<Vec<(String, Vec<u8>)>> {
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut contents = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut contents)?;
            entries.push((file.name().to_string(), contents));
        }
        Ok(entries)
    }

    /// Reject archives with anything other than user files and settings
    fn validate_entries(archive: &mut ZipArchive<File>) -> Result<()> {
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let name = file.name().to_string();
            let allowed = name == SETTINGS_FILE
                || name
                    .strip_prefix(USERS_PREFIX)
                    .is_some_and(|f| !f.is_empty() && !f.contains(['/', '\\']) && is_backed_up(f) && f != "..");
            if !allowed {
                bail!("Unexpected entry in backup: {}", name);
            }
        }
        Ok(())
    }

    /// Delete every backup
    pub fn clear(&self) -> Result<ClearResult> {
        let backups = self.list()?;
        for backup in &backups {
            fs::remove_file(self.backups_dir().join(&backup.name))?;
        }
        Ok(ClearResult {
            deleted: backups.len(),
        })
    }

    fn apply_retention(&self, max_backups: usize) -> Result<()> {
        let mut backups = self.list()?;
        backups.retain(|b| !b.is_pre_restore());

        while backups.len() > max_backups {
            if let Some(oldest) = backups.pop() {
                fs::remove_file(self.backups_dir().join(&oldest.name))?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub deleted: usize,
}
