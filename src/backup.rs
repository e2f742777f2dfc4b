//! Backup bookkeeping for files about to be rewritten.
//!
//! Every destructive rewrite is preceded by a byte-for-byte copy to
//! `<path>.backup` (or `<path>.backup.<unix timestamp>` when that name is
//! taken). The ledger remembers which copy belongs to which original so a
//! failed batch can be put back exactly as it was.

use crate::error::{Error, Result};
use crate::fs_util::atomic_write;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix appended to an original file name to form its backup name.
pub const BACKUP_SUFFIX: &str = ".backup";

/// One tracked original → backup mapping.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BackupEntry {
    pub original: PathBuf,
    pub backup: PathBuf,
}

#[derive(Debug, Default)]
pub struct BackupLedger {
    /// original path -> backup path
    entries: HashMap<PathBuf, PathBuf>,
    /// Insertion order of `entries`, for stable reporting
    order: Vec<PathBuf>,
}

impl BackupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `path` aside before it is mutated.
    ///
    /// Returns the backup path, or `None` (logged) if `path` does not exist or
    /// the copy fails. Backing up a path whose backup is still on disk is a
    /// no-op returning the existing backup; if the tracked backup has since
    /// vanished, a fresh timestamped copy is made.
    pub fn backup(&mut self, path: &Path) -> Option<PathBuf> {
        if !path.exists() {
            tracing::warn!("Cannot back up {}: file does not exist", path.display());
            return None;
        }

        let stale = match self.entries.get(path) {
            Some(existing) if existing.exists() => {
                tracing::debug!(
                    "{} already backed up at {}",
                    path.display(),
                    existing.display()
                );
                return Some(existing.clone());
            }
            Some(_) => true,
            None => false,
        };

        let primary = backup_path_for(path);
        let backup_path = if stale || primary.exists() {
            timestamped_backup_path(path)
        } else {
            primary
        };

        if let Err(e) = fs::copy(path, &backup_path) {
            tracing::error!(
                "Failed to back up {} to {}: {}",
                path.display(),
                backup_path.display(),
                e
            );
            return None;
        }

        if !self.entries.contains_key(path) {
            self.order.push(path.to_path_buf());
        }
        self.entries.insert(path.to_path_buf(), backup_path.clone());
        tracing::info!("Backed up {} to {}", path.display(), backup_path.display());
        Some(backup_path)
    }

    /// Copy the tracked backup back over `path`.
    ///
    /// `false` (logged) when nothing is tracked for `path`, the backup file is
    /// gone, or the copy fails.
    pub fn restore(&self, path: &Path) -> bool {
        let Some(backup_path) = self.entries.get(path) else {
            tracing::warn!("No backup tracked for {}", path.display());
            return false;
        };

        let contents = match fs::read(backup_path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::error!(
                    "Backup {} for {} is unreadable: {}",
                    backup_path.display(),
                    path.display(),
                    e
                );
                return false;
            }
        };

        match atomic_write(path, &contents) {
            Ok(()) => {
                tracing::info!("Restored {} from {}", path.display(), backup_path.display());
                true
            }
            Err(e) => {
                tracing::error!("Failed to restore {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Delete backup files and forget them; `None` discards everything.
    pub fn discard(&mut self, path: Option<&Path>) {
        match path {
            Some(path) => {
                if let Some(backup_path) = self.entries.remove(path) {
                    self.order.retain(|p| p != path);
                    remove_backup_file(&backup_path);
                }
            }
            None => {
                for original in self.order.drain(..) {
                    if let Some(backup_path) = self.entries.remove(&original) {
                        remove_backup_file(&backup_path);
                    }
                }
            }
        }
    }

    pub fn backup_path(&self, path: &Path) -> Option<&Path> {
        self.entries.get(path).map(PathBuf::as_path)
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Tracked entries in the order they were first backed up.
    pub fn entries(&self) -> Vec<BackupEntry> {
        self.order
            .iter()
            .filter_map(|original| {
                self.entries.get(original).map(|backup| BackupEntry {
                    original: original.clone(),
                    backup: backup.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn remove_backup_file(backup_path: &Path) {
    match fs::remove_file(backup_path) {
        Ok(()) => tracing::debug!("Removed backup {}", backup_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove backup {}: {}", backup_path.display(), e),
    }
}

/// `<path>.backup`
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// `<path>.backup.<unix timestamp>`, bumped until the name is free.
fn timestamped_backup_path(path: &Path) -> PathBuf {
    let primary = backup_path_for(path);
    let mut stamp = chrono::Utc::now().timestamp();
    loop {
        let mut name = primary.as_os_str().to_os_string();
        name.push(format!(".{}", stamp));
        let candidate = PathBuf::from(name);
        if !candidate.exists() {
            return candidate;
        }
        stamp += 1;
    }
}

/// True for names following the backup convention: `*.backup` or `*.backup.<digits>`.
pub fn is_backup_file_name(name: &str) -> bool {
    if let Some(stem) = name.strip_suffix(BACKUP_SUFFIX) {
        return !stem.is_empty();
    }
    match name.rsplit_once('.') {
        Some((rest, digits))
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest.strip_suffix(BACKUP_SUFFIX)
                .is_some_and(|stem| !stem.is_empty())
        }
        _ => false,
    }
}

/// List orchestrator-owned backup files directly inside `dir`, sorted.
pub fn find_stray_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::BackupScan {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(is_backup_file_name)
        })
        .map(|entry| entry.path())
        .collect();
    found.sort();
    Ok(found)
}

/// Delete every stray backup in `dir`, returning the paths removed.
pub fn clean_stray_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in find_stray_backups(dir)? {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}
