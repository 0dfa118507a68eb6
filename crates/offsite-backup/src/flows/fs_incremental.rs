use offsite_core::Result;
use std::fs;
use std::path::PathBuf;

use super::{ArtifactBuilder, BackupKind, StagedArtifact};
use crate::compare::{ByteComparator, Comparator};
use crate::tools::{ArchiveFormat, Archiver, TarArchiver, EXCLUDE_MARKER};
use crate::workdir::WorkingDirectory;

const PAYLOAD: &str = "backup.tar";

/// Tars the source tree into the working directory's staging area
///
/// The tar is uncompressed so the incremental engine can diff it cheaply.
pub struct FsIncrementalBuilder {
    source: PathBuf,
    staging_dir: PathBuf,
    archiver: Box<dyn Archiver>,
    comparator: ByteComparator,
}

impl FsIncrementalBuilder {
    pub fn new(source: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            staging_dir: staging_dir.into(),
            archiver: Box::new(TarArchiver::new()),
            comparator: ByteComparator,
        }
    }

    pub fn for_working_directory(working_dir: &WorkingDirectory) -> Self {
        Self::new(working_dir.source(), working_dir.staging_dir())
    }
}

impl ArtifactBuilder for FsIncrementalBuilder {
    fn kind(&self) -> BackupKind {
        BackupKind::FsIncremental
    }

    fn stage(&mut self) -> Result<StagedArtifact> {
        fs::create_dir_all(&self.staging_dir)?;
        let file = self.staging_dir.join(PAYLOAD);
        self.archiver
            .create(&self.source, EXCLUDE_MARKER, &file, ArchiveFormat::Tar)?;
        Ok(StagedArtifact {
            file,
            file_name: PAYLOAD.to_string(),
            staging_dir: self.staging_dir.clone(),
        })
    }

    fn comparator(&self) -> &dyn Comparator {
        &self.comparator
    }
}
