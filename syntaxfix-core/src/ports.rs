//! Port traits abstracting file I/O away from the pipeline.

use camino::Utf8Path;
use syntaxfix_edit::{CommitError, CommitReceipt, FileRecord};

/// Reads a source file into a [`FileRecord`]. Called from worker threads.
pub trait SourceReader: Sync {
    fn read(&self, path: &Utf8Path) -> std::io::Result<FileRecord>;
}

/// Publishes repaired content. Called from worker threads.
pub trait CommitPort: Sync {
    fn commit(&self, record: &FileRecord, content: &str) -> Result<CommitReceipt, CommitError>;
}

/// File-system write operations for report artifacts.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
