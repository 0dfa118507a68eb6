//! Backup destinations under the root path

use offsite_core::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::ownership::{chown_if, Ownership};

/// File in each destination collecting human-readable notices
pub const LOG_FILE: &str = "log.txt";

/// A directory receiving backup history entries
///
/// Every destination lives under the root path so that the paths recorded
/// in the sync ledger are relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    path: PathBuf,
    relative: String,
}

impl Destination {
    /// Locate `dst` (relative to `root`, or absolute under it)
    pub fn locate(root: &Path, dst: &Path) -> Result<Self> {
        let path = root.join(dst);
        let outside = || Error::OutsideRoot {
            path: path.clone(),
            root: root.to_path_buf(),
        };

        let relative = path.strip_prefix(root).map_err(|_| outside())?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(outside()),
            }
        }

        Ok(Self {
            relative: parts.join("/"),
            path,
        })
    }

    /// Locate `dst` and create it if needed
    pub fn prepare(root: &Path, dst: &Path) -> Result<Self> {
        let destination = Self::locate(root, dst)?;
        fs::create_dir_all(&destination.path)?;
        Ok(destination)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the root, `""` for the root itself
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Ledger path of an entry named `name` in this destination
    pub fn ledger_path(&self, name: &str) -> String {
        if self.relative.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.relative, name)
        }
    }

    /// Append a line to the destination's log file
    pub fn log(&self, message: &str, owner: Option<&Ownership>) -> Result<()> {
        let log_path = self.path.join(LOG_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        writeln!(file, "{}", message)?;
        chown_if(owner, &log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_destination() {
        let dst = Destination::locate(Path::new("/srv/backups"), Path::new("hosts/web")).unwrap();
        assert_eq!(dst.path(), Path::new("/srv/backups/hosts/web"));
        assert_eq!(dst.relative(), "hosts/web");
        assert_eq!(
            dst.ledger_path("2016-01-01T12:00:00"),
            "hosts/web/2016-01-01T12:00:00"
        );
    }

    #[test]
    fn test_absolute_destination_under_root() {
        let dst = Destination::locate(Path::new("/srv/backups"), Path::new("/srv/backups/db")).unwrap();
        assert_eq!(dst.relative(), "db");
    }

    #[test]
    fn test_root_itself() {
        let dst = Destination::locate(Path::new("/srv/backups"), Path::new(".")).unwrap();
        assert_eq!(dst.relative(), "");
        assert_eq!(dst.ledger_path("x.tgz"), "x.tgz");
    }

    #[test]
    fn test_outside_root() {
        assert!(matches!(
            Destination::locate(Path::new("/srv/backups"), Path::new("/tmp/x")),
            Err(Error::OutsideRoot { .. })
        ));
        assert!(matches!(
            Destination::locate(Path::new("/srv/backups"), Path::new("../x")),
            Err(Error::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_log_appends_lines() {
        let temp = TempDir::new().unwrap();
        let dst = Destination::prepare(temp.path(), Path::new("dst")).unwrap();
        dst.log("one", None).unwrap();
        dst.log("two", None).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("dst").join(LOG_FILE)).unwrap(),
            "one\ntwo\n"
        );
    }
}
