// src/repository.rs
//! File access for the CLI: read, write, and timestamped backups.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const BACKUP_DIR: &str = ".layerfix_backup";

/// Where source text comes from and goes to.
pub trait SourceRepository: Send + Sync {
    /// # Errors
    /// Returns error if the file cannot be read as UTF-8.
    fn read(&self, path: &Path) -> Result<String>;

    /// # Errors
    /// Returns error if the file cannot be written.
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Stores `original` before `path` is overwritten. Returns the backup path.
    ///
    /// # Errors
    /// Returns error if the backup cannot be written.
    fn backup(&self, path: &Path, original: &str) -> Result<PathBuf>;
}

/// Filesystem repository rooted at a project directory. Backups of one run
/// share a `<BACKUP_DIR>/<unix-ts>/` folder and mirror the relative path.
pub struct FsRepository {
    root: PathBuf,
    stamp: u64,
}

impl FsRepository {
    /// # Errors
    /// Returns error if the system clock is before the unix epoch.
    pub fn new(root: &Path) -> Result<Self> {
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        Ok(Self::with_stamp(root, stamp))
    }

    #[must_use]
    pub fn with_stamp(root: &Path, stamp: u64) -> Self {
        Self {
            root: root.to_path_buf(),
            stamp,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn backup_folder(&self) -> PathBuf {
        self.root.join(BACKUP_DIR).join(self.stamp.to_string())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Path below the root, for mirroring inside the backup folder. Paths
    /// outside the root keep only their file name.
    fn relative(&self, path: &Path) -> PathBuf {
        let full = self.resolve(path);
        match full.strip_prefix(&self.root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => full
                .file_name()
                .map_or_else(|| PathBuf::from("unnamed"), PathBuf::from),
        }
    }

    /// Keeps the newest `retention` backup folders and removes the rest.
    /// Returns how many were removed.
    pub fn cleanup_old_backups(&self, retention: usize) -> usize {
        let backup_dir = self.root.join(BACKUP_DIR);
        let Ok(entries) = fs::read_dir(&backup_dir) else {
            return 0;
        };

        let mut stamps: Vec<(u64, PathBuf)> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|e| {
                let path = e.path();
                let ts: u64 = path.file_name()?.to_str()?.parse().ok()?;
                Some((ts, path))
            })
            .collect();

        stamps.sort_by(|a, b| b.0.cmp(&a.0));

        let mut removed = 0;
        for (_, path) in stamps.into_iter().skip(retention) {
            if fs::remove_dir_all(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

impl SourceRepository for FsRepository {
    fn read(&self, path: &Path) -> Result<String> {
        let full = self.resolve(path);
        fs::read_to_string(&full).with_context(|| format!("Failed to read {}", full.display()))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content).with_context(|| format!("Failed to write {}", full.display()))
    }

    fn backup(&self, path: &Path, original: &str) -> Result<PathBuf> {
        let dest = self.backup_folder().join(self.relative(path));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).context("Failed to create backup directory")?;
        }
        fs::write(&dest, original)
            .with_context(|| format!("Failed to backup {}", path.display()))?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backup_mirrors_relative_path() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = FsRepository::with_stamp(dir.path(), 100);
        repo.write(Path::new("src/a.ts"), "new")?;

        let saved = repo.backup(Path::new("src/a.ts"), "old")?;
        assert_eq!(saved, dir.path().join(BACKUP_DIR).join("100").join("src/a.ts"));
        assert_eq!(fs::read_to_string(saved)?, "old");
        assert_eq!(repo.read(Path::new("src/a.ts"))?, "new");
        Ok(())
    }

    #[test]
    fn cleanup_keeps_newest() -> Result<()> {
        let dir = TempDir::new()?;
        for stamp in [1, 2, 3, 4] {
            FsRepository::with_stamp(dir.path(), stamp).backup(Path::new("x.js"), "x")?;
        }
        let repo = FsRepository::with_stamp(dir.path(), 5);
        assert_eq!(repo.cleanup_old_backups(2), 2);
        assert!(dir.path().join(BACKUP_DIR).join("4").exists());
        assert!(dir.path().join(BACKUP_DIR).join("3").exists());
        assert!(!dir.path().join(BACKUP_DIR).join("1").exists());
        Ok(())
    }

    #[test]
    fn read_missing_file_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = FsRepository::new(dir.path())?;
        assert!(repo.read(Path::new("nope.ts")).is_err());
        Ok(())
    }
}
