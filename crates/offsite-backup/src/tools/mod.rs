//! External collaborators: incremental engine, archiver, database dumps

mod archiver;
mod dump;
mod engine;

pub use archiver::{ArchiveFormat, Archiver, TarArchiver, EXCLUDE_MARKER};
pub use dump::{DatabaseDumper, DatabaseTarget};
pub use engine::{IncrementalEngine, RdiffBackup};
