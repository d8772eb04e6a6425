//! TOML-backed preference store.
//!
//! Persists the single cross-session preference (the highlight-only filter
//! flag) to `preferences.toml`. Writes are atomic (tmp file + fsync +
//! rename) under an exclusive file lock; reads go through an in-memory cache
//! to avoid repeated file I/O.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use statehouse_core::error::{CatalogError, Result};
use statehouse_core::preferences::PreferenceRepository;

use crate::paths::StatehousePaths;

/// On-disk shape of the preference file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceFile {
    /// Whether the highlight-only filter was active when last toggled.
    #[serde(default)]
    pub highlight_only: bool,
}

/// File-backed implementation of [`PreferenceRepository`].
pub struct TomlPreferenceStore {
    path: PathBuf,
    cached: RwLock<Option<PreferenceFile>>,
}

impl TomlPreferenceStore {
    /// Creates a store at the platform config location.
    pub fn new() -> Result<Self> {
        let path = StatehousePaths::preference_file()
            .map_err(|e| CatalogError::config(e.to_string()))?;
        Ok(Self::at_path(path))
    }

    /// Creates a store at an explicit path. Tests point this at a temp dir.
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            cached: RwLock::new(None),
        }
    }

    fn load(&self) -> PreferenceFile {
        {
            let cached = self.cached.read().unwrap_or_else(|e| e.into_inner());
            if let Some(prefs) = cached.as_ref() {
                return prefs.clone();
            }
        }

        let loaded = self.read_file().unwrap_or_else(|err| {
            tracing::warn!(
                "[PreferenceStore] Failed to read {}: {}; using defaults",
                self.path.display(),
                err
            );
            PreferenceFile::default()
        });

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(loaded.clone());
        loaded
    }

    fn read_file(&self) -> Result<PreferenceFile> {
        if !self.path.exists() {
            return Ok(PreferenceFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(PreferenceFile::default());
        }
        Ok(toml::from_str(&content)?)
    }

    fn save(&self, prefs: &PreferenceFile) -> Result<()> {
        let _lock = FileLock::acquire(&self.path)?;

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(prefs)?;

        // Write to a sibling tmp file, fsync, then rename into place so a
        // crash never leaves a torn preference file.
        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, &self.path)?;

        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(prefs.clone());
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| CatalogError::config("preference path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| CatalogError::config("preference path has no file name"))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

#[async_trait]
impl PreferenceRepository for TomlPreferenceStore {
    async fn highlight_only(&self) -> bool {
        self.load().highlight_only
    }

    async fn set_highlight_only(&self, enabled: bool) -> Result<()> {
        let mut prefs = self.load();
        prefs.highlight_only = enabled;
        self.save(&prefs)
    }
}

/// A file lock guard that automatically releases the lock when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| CatalogError::config(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Unlock is automatic when the file handle is dropped.
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_to_false_when_missing() {
        let dir = TempDir::new().unwrap();
        let store = TomlPreferenceStore::at_path(dir.path().join("preferences.toml"));
        assert!(!store.highlight_only().await);
    }

    #[tokio::test]
    async fn test_toggle_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.toml");

        let store = TomlPreferenceStore::at_path(path.clone());
        store.set_highlight_only(true).await.unwrap();
        assert!(store.highlight_only().await);

        // A fresh store with a cold cache reads the persisted value.
        let reopened = TomlPreferenceStore::at_path(path);
        assert!(reopened.highlight_only().await);
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.toml");
        let store = TomlPreferenceStore::at_path(path.clone());

        store.set_highlight_only(true).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join(".preferences.toml.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "not [valid toml").unwrap();

        let store = TomlPreferenceStore::at_path(path);
        assert!(!store.highlight_only().await);
    }
}
