use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use offsite_core::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tar::{Builder as TarBuilder, Header, HeaderMode};
use walkdir::{DirEntry, WalkDir};

/// Directories containing this file have their contents left out
pub const EXCLUDE_MARKER: &str = "NOBACKUP-TAG";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Plain tar; keeps unchanged regions byte-identical between runs
    Tar,
    /// Gzip-compressed tar
    TarGz,
}

/// Packs a directory tree into a single file and back
pub trait Archiver {
    /// Archive `source` into `dest`, skipping everything under a directory
    /// that contains `exclude_marker`
    fn create(
        &self,
        source: &Path,
        exclude_marker: &str,
        dest: &Path,
        format: ArchiveFormat,
    ) -> Result<()>;

    /// Unpack `archive` into the directory `dest`
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// In-process tar archiver
///
/// Entries are written in sorted order with ustar headers (no access or
/// change times), so archiving an unchanged tree twice gives identical
/// bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarArchiver;

impl TarArchiver {
    pub fn new() -> Self {
        Self
    }

    fn write_tree<W: Write>(&self, writer: W, source: &Path, marker: &str) -> Result<W> {
        let mut tar = TarBuilder::new(writer);
        let mut count = 0usize;

        for entry in WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !under_tagged_dir(e, marker))
        {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let rel_path = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| Error::Io(io::Error::other(e)))?;
            let meta = fs::symlink_metadata(entry.path())?;

            let mut header = Header::new_ustar();
            header.set_metadata_in_mode(&meta, HeaderMode::Complete);

            let file_type = entry.file_type();
            if file_type.is_dir() {
                header.set_size(0);
                tar.append_data(&mut header, rel_path, io::empty())?;
            } else if file_type.is_file() {
                let file = File::open(entry.path())?;
                let size = header.size()?;
                tar.append_data(&mut header, rel_path, file.take(size))?;
            } else if file_type.is_symlink() {
                let target = fs::read_link(entry.path())?;
                header.set_size(0);
                tar.append_link(&mut header, rel_path, target)?;
            } else {
                tracing::debug!("Skipping special file {}", entry.path().display());
                continue;
            }
            count += 1;
        }

        tracing::debug!("Archived {} entries from {}", count, source.display());
        Ok(tar.into_inner()?)
    }

    fn write_archive(
        &self,
        source: &Path,
        marker: &str,
        dest: &Path,
        format: ArchiveFormat,
    ) -> Result<()> {
        let file = BufWriter::new(File::create(dest)?);
        let mut file = match format {
            ArchiveFormat::Tar => self.write_tree(file, source, marker)?,
            // Default gzip headers carry no mtime, keeping output reproducible
            ArchiveFormat::TarGz => self
                .write_tree(GzEncoder::new(file, Compression::default()), source, marker)?
                .finish()?,
        };
        file.flush()?;
        Ok(())
    }
}

fn under_tagged_dir(entry: &DirEntry, marker: &str) -> bool {
    entry.depth() > 0
        && entry
            .path()
            .parent()
            .is_some_and(|parent| parent.join(marker).is_file())
}

fn unpack<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.unpack(dest)?;
    Ok(())
}

impl Archiver for TarArchiver {
    fn create(
        &self,
        source: &Path,
        exclude_marker: &str,
        dest: &Path,
        format: ArchiveFormat,
    ) -> Result<()> {
        if !source.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", source.display()),
            )));
        }

        let result = self.write_archive(source, exclude_marker, dest, format);
        if result.is_err() {
            let _ = fs::remove_file(dest);
        }
        result
    }

    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)?;
        let mut reader = BufReader::new(File::open(archive)?);
        if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
            unpack(GzDecoder::new(reader), dest)
        } else {
            unpack(reader, dest)
        }
    }
}
