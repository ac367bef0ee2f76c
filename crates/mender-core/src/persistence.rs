//! Backups of the source taken before each committed patch.
//!
//! The controller calls [`BackupSink::backup`] once per commit, on tokio's
//! blocking pool, and only logs failures: a backup never stops a repair.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Receives the pre-patch source of every commit. Implementations may block.
pub trait BackupSink: Send + Sync {
    fn backup(&self, label: &str, source: &str) -> anyhow::Result<()>;
}

/// Discards every backup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackupSink;

impl BackupSink for NullBackupSink {
    fn backup(&self, _label: &str, _source: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub label: String,
    pub source: String,
    pub taken_at: DateTime<Utc>,
}

/// Keeps backups in memory, in commit order.
#[derive(Debug, Default)]
pub struct MemoryBackupSink {
    records: Mutex<Vec<BackupRecord>>,
}

impl MemoryBackupSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<BackupRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackupSink for MemoryBackupSink {
    fn backup(&self, label: &str, source: &str) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(BackupRecord {
                label: label.to_string(),
                source: source.to_string(),
                taken_at: Utc::now(),
            });
        Ok(())
    }
}

/// Writes `<label>.backup` next to the source file, or into a fixed
/// directory when one is given. Each backup replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct FsBackupSink {
    dir: Option<PathBuf>,
}

impl FsBackupSink {
    /// Back up next to the file named by the label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Back up into `dir`, keyed by the label's file name.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub fn backup_path(&self, label: &str) -> PathBuf {
        let label_path = Path::new(label);
        match &self.dir {
            Some(dir) => {
                let name = label_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "source".to_string());
                dir.join(format!("{name}.backup"))
            }
            None => PathBuf::from(format!("{label}.backup")),
        }
    }
}

impl BackupSink for FsBackupSink {
    fn backup(&self, label: &str, source: &str) -> anyhow::Result<()> {
        let path = self.backup_path(label);
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("creating backup directory {}", parent.display()))?;

        // Atomic write: temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(source.as_bytes())?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("writing backup {}", path.display()))?;
        Ok(())
    }
}
