use offsite_core::Result;
use std::fs;
use std::path::PathBuf;

use super::{ArtifactBuilder, BackupKind, StagedArtifact, ARCHIVE_EXTENSION};
use crate::compare::{ByteComparator, Comparator};
use crate::tools::{ArchiveFormat, Archiver, TarArchiver, EXCLUDE_MARKER};
use crate::workdir::WorkingDirectory;

/// Builds a compressed archive of the source tree, committed as is
pub struct FsArchiveBuilder {
    source: PathBuf,
    staging_dir: PathBuf,
    archiver: Box<dyn Archiver>,
    comparator: ByteComparator,
}

impl FsArchiveBuilder {
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

impl ArtifactBuilder for FsArchiveBuilder {
    fn kind(&self) -> BackupKind {
        BackupKind::FsArchive
    }

    fn stage(&mut self) -> Result<StagedArtifact> {
        fs::create_dir_all(&self.staging_dir)?;
        let file_name = format!("backup.{}", ARCHIVE_EXTENSION);
        let file = self.staging_dir.join(&file_name);
        self.archiver
            .create(&self.source, EXCLUDE_MARKER, &file, ArchiveFormat::TarGz)?;
        Ok(StagedArtifact {
            file,
            file_name,
            staging_dir: self.staging_dir.clone(),
        })
    }

    fn comparator(&self) -> &dyn Comparator {
        &self.comparator
    }
}
