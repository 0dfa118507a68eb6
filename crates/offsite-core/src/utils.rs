//! Shared utility functions for offsite crates

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// a HOME override in cron jobs and tests is respected.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or_else(|| Error::invalid_config("Could not determine home directory"))
}

/// Load a YAML file and parse it
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    let value: T = serde_yaml_ng::from_str(&content)
        .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(value)
}

/// Load a YAML file, falling back to `T::default()` when it does not exist
pub fn load_yaml_file_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        tracing::debug!("{} not found, using defaults", path.display());
        return Ok(T::default());
    }
    load_yaml_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_home_dir_from_env() {
        if std::env::var("HOME").is_ok() {
            let home = get_home_dir().unwrap();
            assert!(!home.as_os_str().is_empty());
        }
    }

    #[test]
    fn test_missing_yaml_yields_default() {
        let temp = tempfile::TempDir::new().unwrap();
        let value: Vec<String> = load_yaml_file_or_default(&temp.path().join("absent.yaml")).unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_bad_yaml_names_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bad.yaml");
        fs::write(&path, "- [unclosed").unwrap();
        let err = load_yaml_file::<Vec<String>>(&path).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }
}
