//! Default filesystem-backed port implementations.

use crate::ports::{CommitPort, SourceReader, WritePort};
use anyhow::Context;
use camino::Utf8Path;
use syntaxfix_edit::{CommitError, CommitReceipt, FileRecord, WriteGate};

/// Reads UTF-8 files from disk. Non-UTF-8 content is an `InvalidData` error.
#[derive(Debug, Clone, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read(&self, path: &Utf8Path) -> std::io::Result<FileRecord> {
        FileRecord::read(path)
    }
}

/// Commits through the atomic [`WriteGate`].
#[derive(Debug, Clone, Default)]
pub struct FsCommitPort {
    gate: WriteGate,
}

impl CommitPort for FsCommitPort {
    fn commit(&self, record: &FileRecord, content: &str) -> Result<CommitReceipt, CommitError> {
        self.gate.commit(record, content)
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs_err::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs_err::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs_err::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}
