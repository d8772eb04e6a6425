//! Path management for statehouse client-local files.

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Unified path management for statehouse.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/statehouse/        # Config directory
/// └── preferences.toml         # Persisted user preferences
/// ```
pub struct StatehousePaths;

impl StatehousePaths {
    /// Returns the statehouse configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/statehouse/`)
    /// - `Err(PathError::ConfigDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join("statehouse"))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the persisted preference file.
    pub fn preference_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("preferences.toml"))
    }
}
