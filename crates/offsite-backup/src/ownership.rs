//! Ownership of produced backup files (`-u USER[:GROUP]`)

use nix::unistd::{Group, Uid, User};
use offsite_core::{Error, Result};
use std::os::unix::fs::lchown;
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

/// Numeric owner applied to everything a backup produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    /// Change the owner of `path` itself (symlinks are not followed)
    pub fn apply(&self, path: &Path) -> Result<()> {
        lchown(path, Some(self.uid), Some(self.gid))?;
        Ok(())
    }

    /// Change the owner of `root` and everything below it
    pub fn apply_recursive(&self, root: &Path) -> Result<()> {
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            self.apply(entry.path())?;
        }
        Ok(())
    }
}

impl FromStr for Ownership {
    type Err = Error;

    /// Accepts `user`, `user:group`, `uid:gid` or any mix of names and ids.
    /// Without a group, the user's primary group is used.
    fn from_str(spec: &str) -> Result<Self> {
        let (user, group) = match spec.split_once(':') {
            Some((user, group)) => (user, Some(group)),
            None => (spec, None),
        };
        if user.is_empty() || group.is_some_and(str::is_empty) {
            return Err(Error::invalid_owner(spec));
        }

        let lookup_err = |e: nix::Error| Error::invalid_owner(format!("{}: {}", spec, e));

        let (uid, primary_gid) = match user.parse::<u32>() {
            Ok(uid) => {
                let entry = User::from_uid(Uid::from_raw(uid)).map_err(lookup_err)?;
                (uid, entry.map(|e| e.gid.as_raw()))
            }
            Err(_) => {
                let entry = User::from_name(user)
                    .map_err(lookup_err)?
                    .ok_or_else(|| Error::invalid_owner(format!("{}: unknown user", spec)))?;
                (entry.uid.as_raw(), Some(entry.gid.as_raw()))
            }
        };

        let gid = match group {
            Some(group) => match group.parse::<u32>() {
                Ok(gid) => gid,
                Err(_) => Group::from_name(group)
                    .map_err(lookup_err)?
                    .ok_or_else(|| Error::invalid_owner(format!("{}: unknown group", spec)))?
                    .gid
                    .as_raw(),
            },
            None => primary_gid
                .ok_or_else(|| Error::invalid_owner(format!("{}: no primary group", spec)))?,
        };

        Ok(Self { uid, gid })
    }
}

/// Apply `owner` to `path` when one was requested
pub fn chown_if(owner: Option<&Ownership>, path: &Path) -> Result<()> {
    match owner {
        Some(owner) => owner.apply(path),
        None => Ok(()),
    }
}

/// Apply `owner` to the tree at `root` when one was requested
pub fn chown_tree_if(owner: Option<&Ownership>, root: &Path) -> Result<()> {
    match owner {
        Some(owner) => owner.apply_recursive(root),
        None => Ok(()),
    }
}
