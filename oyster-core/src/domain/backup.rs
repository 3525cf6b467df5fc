//! Backup domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backup archive of sealed user files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Archive filename, e.g. "oyster-2025-01-15T10-30-00-000123.zip"
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Number of sealed user records in the archive, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<usize>,
}

impl BackupMetadata {
    /// Whether this archive was taken automatically before a restore
    pub fn is_pre_restore(&self) -> bool {
        self.name.contains("-pre-restore-")
    }

    /// Size for human display
    pub fn size_display(&self) -> String {
        const UNITS: [&str; 3] = ["KB", "MB", "GB"];
        if self.size_bytes < 1024 {
            return format!("{} bytes", self.size_bytes);
        }
        let mut size = self.size_bytes as f64 / 1024.0;
        let mut unit = 0;
        while size >= 1024.0 && unit + 1 < UNITS.len() {
            size /= 1024.0;
            unit += 1;
        }
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, size_bytes: u64) -> BackupMetadata {
        BackupMetadata {
            name: name.to_string(),
            created_at: Utc::now(),
            size_bytes,
            users: None,
        }
    }

    #[test]
    fn test_size_display() {
        assert_eq!(meta("a.zip", 512).size_display(), "512 bytes");
        assert_eq!(meta("a.zip", 1536).size_display(), "1.5 KB");
        assert_eq!(meta("a.zip", 2 * 1024 * 1024).size_display(), "2.0 MB");
        assert_eq!(meta("a.zip", 3 * 1024 * 1024 * 1024).size_display(), "3.0 GB");
    }

    #[test]
    fn test_pre_restore_detection() {
        assert!(meta("oyster-pre-restore-2025-01-01T00-00-00-000001.zip", 1).is_pre_restore());
        assert!(!meta("oyster-2025-01-01T00-00-00-000001.zip", 1).is_pre_restore());
    }
}
