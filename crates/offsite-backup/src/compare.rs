//! Content-equality checks between a staged artifact and the last committed one

use offsite_core::config::ToolCommand;
use offsite_core::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Stdio};

/// Size of the blocks compared at a time
const CHUNK_SIZE: usize = 64 * 1024;

/// Decides whether a freshly staged artifact carries the same data as the
/// artifact of the previous backup
pub trait Comparator {
    /// `previous` may not exist, in which case the artifacts differ
    fn same(&self, staged: &Path, previous: &Path) -> Result<bool>;
}

/// Byte-for-byte comparison
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteComparator;

impl Comparator for ByteComparator {
    fn same(&self, staged: &Path, previous: &Path) -> Result<bool> {
        if !previous.is_file() {
            return Ok(false);
        }
        if fs::metadata(staged)?.len() != fs::metadata(previous)?.len() {
            return Ok(false);
        }

        let mut a = BufReader::new(File::open(staged)?);
        let mut b = BufReader::new(File::open(previous)?);
        same_streams(&mut a, &mut b)
    }
}

/// Compares what a restore tool outputs for each artifact
///
/// Used for dump formats that embed their own creation time.
#[derive(Debug, Clone)]
pub struct RestoreComparator {
    restore: ToolCommand,
}

impl RestoreComparator {
    pub fn new(restore: ToolCommand) -> Self {
        Self { restore }
    }

    fn spawn(&self, dump: &Path) -> Result<(Child, ChildStdout)> {
        let mut child = self
            .restore
            .command()
            .arg(dump)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Error::tool_spawn(self.restore.name(), e))?;
        match child.stdout.take() {
            Some(stdout) => Ok((child, stdout)),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::Io(io::Error::other("restore output not captured")))
            }
        }
    }

    fn finish(&self, child: &mut Child, killed: bool) -> Result<()> {
        if killed {
            let _ = child.kill();
        }
        let status = child.wait()?;
        if !killed && !status.success() {
            return Err(Error::external_tool(self.restore.name(), status));
        }
        Ok(())
    }
}

impl Comparator for RestoreComparator {
    fn same(&self, staged: &Path, previous: &Path) -> Result<bool> {
        if !previous.is_file() {
            return Ok(false);
        }

        let (mut child_a, mut out_a) = self.spawn(staged)?;
        let (mut child_b, mut out_b) = match self.spawn(previous) {
            Ok(spawned) => spawned,
            Err(e) => {
                let _ = self.finish(&mut child_a, true);
                return Err(e);
            }
        };

        let compared = same_streams(&mut out_a, &mut out_b);
        // Stop both restores as soon as the outputs diverge
        let stop = !matches!(compared, Ok(true));
        drop(out_a);
        drop(out_b);
        let finished_a = self.finish(&mut child_a, stop);
        let finished_b = self.finish(&mut child_b, stop);

        let same = compared?;
        finished_a?;
        finished_b?;
        tracing::debug!(
            "{} output of {} and {}: {}",
            self.restore.name(),
            staged.display(),
            previous.display(),
            if same { "same" } else { "different" }
        );
        Ok(same)
    }
}

/// Compare two streams chunk by chunk
fn same_streams<A: Read, B: Read>(a: &mut A, b: &mut B) -> Result<bool> {
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];
    loop {
        let len_a = read_chunk(a, &mut buf_a)?;
        let len_b = read_chunk(b, &mut buf_b)?;
        if buf_a[..len_a] != buf_b[..len_b] {
            return Ok(false);
        }
        if len_a == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` unless the stream ends first; returns the bytes read
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
