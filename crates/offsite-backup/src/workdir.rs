//! Per-source working directories under the config directory
//!
//! A working directory is named `<name>.<fingerprint>`, where the
//! fingerprint is derived from the absolute source path. It holds a `src`
//! symlink to the source, the `config.yaml` selecting the backup type and
//! a `backup/` staging directory.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use offsite_core::config::{FsBackupType, WorkingConfig};
use offsite_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

const SOURCE_LINK: &str = "src";
const CONFIG_FILE: &str = "config.yaml";
const STAGING_DIR: &str = "backup";

/// Bytes of the digest kept in the fingerprint
const FINGERPRINT_BYTES: usize = 6;

/// Stable, fixed-width, file-name-safe fingerprint of a source path
pub fn fingerprint(source: &Path) -> String {
    let digest = Sha256::digest(source.as_os_str().as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..FINGERPRINT_BYTES])
}

/// An initialized working directory
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    path: PathBuf,
    source: PathBuf,
    config: WorkingConfig,
}

impl WorkingDirectory {
    fn open(path: PathBuf, source: &Path) -> Result<Self> {
        let config = WorkingConfig::load(&path.join(CONFIG_FILE))?;
        Ok(Self {
            path,
            source: source.to_path_buf(),
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn config(&self) -> &WorkingConfig {
        &self.config
    }

    pub fn backup_type(&self) -> FsBackupType {
        self.config.backup_type
    }

    /// Where payloads are staged before they are committed
    pub fn staging_dir(&self) -> PathBuf {
        self.path.join(STAGING_DIR)
    }
}

/// Finds and creates working directories in a base directory
#[derive(Debug, Clone)]
pub struct WorkingDirectoryResolver {
    base: PathBuf,
}

impl WorkingDirectoryResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The working directory of `source`, if one was initialized
    pub fn resolve(&self, source: &Path) -> Result<Option<WorkingDirectory>> {
        let suffix = format!(".{}", fingerprint(source));

        let entries = match fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(&suffix) {
                candidates.push(entry.path());
            }
        }
        candidates.sort();

        let path = match candidates.len() {
            0 => return Ok(None),
            1 => candidates.remove(0),
            _ => {
                return Err(Error::DuplicateWorkingDirectory {
                    candidates: candidates
                        .iter()
                        .map(|c| c.display().to_string())
                        .collect(),
                })
            }
        };

        match fs::read_link(path.join(SOURCE_LINK)) {
            Ok(target) if target == source => {}
            _ => return Err(Error::WrongWorkingDirectory { path }),
        }

        tracing::debug!("Working directory for {}: {}", source.display(), path.display());
        WorkingDirectory::open(path, source).map(Some)
    }

    /// Like [`resolve`](Self::resolve), but a missing directory is an error
    pub fn require(&self, source: &Path) -> Result<WorkingDirectory> {
        self.resolve(source)?
            .ok_or_else(|| Error::MissingWorkingDirectory {
                source_path: source.display().to_string(),
            })
    }

    /// Create the working directory of `source`
    ///
    /// The directory itself is created exclusively; anything that fails
    /// after that removes it again.
    pub fn initialize(
        &self,
        source: &Path,
        name: &str,
        backup_type: FsBackupType,
    ) -> Result<WorkingDirectory> {
        if !source.is_absolute() {
            return Err(Error::RelativeSource);
        }
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(Error::invalid_config(format!(
                "invalid working directory name: {:?}",
                name
            )));
        }
        if self.resolve(source)?.is_some() {
            return Err(Error::WorkingDirectoryExists);
        }

        fs::create_dir_all(&self.base)?;
        let path = self.base.join(format!("{}.{}", name, fingerprint(source)));
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::WorkingDirectoryExists)
            }
            Err(e) => return Err(e.into()),
        }

        let populated = (|| -> Result<WorkingDirectory> {
            symlink(source, path.join(SOURCE_LINK))?;
            WorkingConfig::new(backup_type).save(&path.join(CONFIG_FILE))?;
            fs::create_dir(path.join(STAGING_DIR))?;
            // A concurrent initialization under another name shows up here
            self.require(source)
        })();

        if populated.is_err() {
            if let Err(e) = fs::remove_dir_all(&path) {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
            }
        } else {
            tracing::info!("Created working directory {}", path.display());
        }
        populated
    }
}
