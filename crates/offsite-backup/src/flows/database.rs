use offsite_core::Result;
use tempfile::TempDir;

use super::{ArtifactBuilder, BackupKind, StagedArtifact};
use crate::compare::Comparator;
use crate::tools::{DatabaseDumper, DatabaseTarget};

/// Dumps a database into a private staging directory
///
/// The staging directory is removed when the builder is dropped.
pub struct DatabaseBuilder {
    target: DatabaseTarget,
    dumper: DatabaseDumper,
    comparator: Box<dyn Comparator>,
    staging: TempDir,
}

impl DatabaseBuilder {
    pub fn new(target: DatabaseTarget, dumper: DatabaseDumper) -> Result<Self> {
        let comparator = dumper.comparator(&target);
        let staging = tempfile::Builder::new().prefix("offsite-db-").tempdir()?;
        Ok(Self {
            target,
            dumper,
            comparator,
            staging,
        })
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }
}

impl ArtifactBuilder for DatabaseBuilder {
    fn kind(&self) -> BackupKind {
        BackupKind::Database
    }

    fn stage(&mut self) -> Result<StagedArtifact> {
        let file_name = self.target.dump_file_name();
        let file = self.staging.path().join(&file_name);
        self.dumper.dump(&self.target, &file)?;
        Ok(StagedArtifact {
            file,
            file_name,
            staging_dir: self.staging.path().to_path_buf(),
        })
    }

    fn comparator(&self) -> &dyn Comparator {
        self.comparator.as_ref()
    }
}
