//! Configuration management
//!
//! `settings.json` in the data directory:
//! ```json
//! {
//!   "security": {
//!     "kdf": "sha256-fold",
//!     "minPasswordLength": 4,
//!     "argon2": { "timeCost": 3, "memoryCost": 65536, "parallelism": 4, "hashLen": 32 }
//!   },
//!   "backups": { "maxBackups": 10 }
//! }
//! ```
//!
//! Keys this crate does not know about are kept as-is when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Argon2Params, KdfAlgorithm};
use crate::services::session::{SessionSettings, DEFAULT_MIN_PASSWORD_LEN};

/// Environment variable overriding the KDF for new users
pub const KDF_ENV: &str = "OYSTER_KDF";

const DEFAULT_MAX_BACKUPS: usize = 10;

fn default_min_password_len() -> usize {
    DEFAULT_MIN_PASSWORD_LEN
}

fn default_max_backups() -> Option<usize> {
    Some(DEFAULT_MAX_BACKUPS)
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    security: SecuritySettings,
    #[serde(default)]
    backups: BackupSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecuritySettings {
    #[serde(default)]
    kdf: KdfAlgorithm,
    #[serde(default = "default_min_password_len")]
    min_password_length: usize,
    #[serde(default)]
    argon2: Argon2Params,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            kdf: KdfAlgorithm::default(),
            min_password_length: DEFAULT_MIN_PASSWORD_LEN,
            argon2: Argon2Params::default(),
            other: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupSettings {
    #[serde(default = "default_max_backups")]
    max_backups: Option<usize>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            max_backups: default_max_backups(),
            other: HashMap::new(),
        }
    }
}

/// Oyster configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Scheme used for newly registered users
    pub kdf: KdfAlgorithm,
    pub min_password_len: usize,
    pub argon2: Argon2Params,
    /// Backups kept after each new one; `None` keeps everything
    pub max_backups: Option<usize>,
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(SettingsFile::default())
    }
}

impl Config {
    fn from_settings(raw: SettingsFile) -> Self {
        Self {
            kdf: raw.security.kdf,
            min_password_len: raw.security.min_password_length,
            argon2: raw.security.argon2.clone(),
            max_backups: raw.backups.max_backups,
            _raw_settings: raw,
        }
    }

    /// Load config from the data directory
    ///
    /// The KDF for new users can be overridden with `OYSTER_KDF`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let mut config = Self::from_settings(raw);
        if let Ok(value) = std::env::var(KDF_ENV) {
            config.apply_kdf_override(&value)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_kdf_override(&mut self, value: &str) -> Result<()> {
        match KdfAlgorithm::parse(value) {
            Some(kdf) => {
                self.kdf = kdf;
                Ok(())
            }
            None => bail!("{KDF_ENV}: unknown key derivation scheme '{value}'"),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.min_password_len == 0 {
            bail!("security.minPasswordLength must be at least 1");
        }
        if self.argon2.hash_len != 32 {
            bail!("security.argon2.hashLen must be 32");
        }
        Ok(())
    }

    /// Save config to the data directory, preserving unmanaged settings
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self._raw_settings.clone())
        } else {
            self._raw_settings.clone()
        };

        settings.security.kdf = self.kdf;
        settings.security.min_password_length = self.min_password_len;
        settings.security.argon2 = self.argon2.clone();
        settings.backups.max_backups = self.max_backups;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Settings for the session manager
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            min_password_len: self.min_password_len,
            kdf: self.kdf,
            argon2: self.argon2.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.min_password_len, 4);
        assert_eq!(config.max_backups, Some(10));
        assert_eq!(config.argon2, Argon2Params::default());
    }

    #[test]
    fn test_load_camel_case_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"security": {"kdf": "argon2id", "minPasswordLength": 8}, "backups": {"maxBackups": 3}}"#,
        )
        .unwrap();

        let config = Config::from_settings(
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap()).unwrap(),
        );
        assert_eq!(config.kdf, KdfAlgorithm::Argon2id);
        assert_eq!(config.min_password_len, 8);
        assert_eq!(config.max_backups, Some(3));

        let settings = config.session_settings();
        assert_eq!(settings.min_password_len, 8);
        assert_eq!(settings.kdf, KdfAlgorithm::Argon2id);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"security": {"kdf": "md5"}}"#).unwrap();
        assert!(Config::load(dir.path()).is_err());

        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"security": {"minPasswordLength": 0}}"#,
        )
        .unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn test_kdf_override() {
        let mut config = Config::default();
        config.apply_kdf_override("argon2").unwrap();
        assert_eq!(config.kdf, KdfAlgorithm::Argon2id);
        assert!(config.apply_kdf_override("rot13").is_err());
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"theme": "dark", "security": {"minPasswordLength": 6, "note": "keep"}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.max_backups = Some(2);
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("settings.json")).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["security"]["note"], "keep");
        assert_eq!(saved["security"]["minPasswordLength"], 6);
        assert_eq!(saved["backups"]["maxBackups"], 2);
    }
}
