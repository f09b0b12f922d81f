//! Commit engine for repaired file contents.
//!
//! Responsibilities:
//! - Capture the original content and its sha256 when a file is read.
//! - Stage new content in a temporary file next to the target.
//! - Re-check the sha256 precondition, then replace the target by rename.
//! - Render unified diffs for dry runs.
//!
//! A [`StagedWrite`] that is dropped without being published removes its
//! temporary file, so an interrupted run never leaves a half-written target.

mod error;

pub use error::CommitError;

use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use fs_err as fs;
use std::io::{ErrorKind, Write};
use syntaxfix_hash::sha256_hex;
use tracing::{debug, warn};
use uuid::Uuid;

/// A file as it was when the run read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: Utf8PathBuf,
    pub original: String,
    pub original_sha256: String,
}

impl FileRecord {
    pub fn new(path: impl Into<Utf8PathBuf>, original: String) -> Self {
        let original_sha256 = sha256_hex(original.as_bytes());
        Self {
            path: path.into(),
            original,
            original_sha256,
        }
    }

    pub fn read(path: &Utf8Path) -> std::io::Result<Self> {
        let original = fs::read_to_string(path)?;
        Ok(Self::new(path, original))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub path: Utf8PathBuf,
    pub sha256_before: String,
    pub sha256_after: String,
    pub bytes_written: u64,
}

/// Single point through which repaired content reaches disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteGate;

impl WriteGate {
    pub fn new() -> Self {
        Self
    }

    /// Write `content` to a temporary sibling of `record.path`.
    pub fn stage(&self, record: &FileRecord, content: &str) -> Result<StagedWrite, CommitError> {
        let target = record.path.clone();
        let tmp = temp_path_for(&target);
        let io_err = |source| CommitError::Io {
            path: target.clone(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .map_err(io_err)?;

        // From here on the staged value owns the temp file and cleans it up on error.
        let staged = StagedWrite {
            target: target.clone(),
            tmp,
            expected_sha256: record.original_sha256.clone(),
            new_sha256: sha256_hex(content.as_bytes()),
            bytes: content.len() as u64,
            published: false,
        };

        file.write_all(content.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        debug!(path = %staged.target, tmp = %staged.tmp, "staged write");
        Ok(staged)
    }

    /// Stage and publish in one step.
    pub fn commit(&self, record: &FileRecord, content: &str) -> Result<CommitReceipt, CommitError> {
        self.stage(record, content)?.publish()
    }
}

/// New content sitting in a temporary file, not yet visible at the target path.
#[derive(Debug)]
pub struct StagedWrite {
    target: Utf8PathBuf,
    tmp: Utf8PathBuf,
    expected_sha256: String,
    new_sha256: String,
    bytes: u64,
    published: bool,
}

impl StagedWrite {
    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Utf8Path {
        &self.tmp
    }

    /// Verify the target still holds the content that was read, then swap it in.
    pub fn publish(mut self) -> Result<CommitReceipt, CommitError> {
        let current = match fs::read(&self.target) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CommitError::Missing {
                    path: self.target.clone(),
                });
            }
            Err(source) => {
                return Err(CommitError::Io {
                    path: self.target.clone(),
                    source,
                });
            }
        };

        let actual = sha256_hex(&current);
        if actual != self.expected_sha256 {
            return Err(CommitError::PreconditionMismatch {
                path: self.target.clone(),
                expected: self.expected_sha256.clone(),
                actual,
            });
        }

        let io_err = |path: &Utf8Path, source| CommitError::Io {
            path: path.to_path_buf(),
            source,
        };
        let perms = fs::metadata(&self.target)
            .map_err(|e| io_err(&self.target, e))?
            .permissions();
        fs::set_permissions(&self.tmp, perms).map_err(|e| io_err(&self.target, e))?;
        fs::rename(&self.tmp, &self.target).map_err(|e| io_err(&self.target, e))?;
        self.published = true;

        sync_parent(&self.target);
        debug!(path = %self.target, sha256 = %self.new_sha256, "committed");

        Ok(CommitReceipt {
            path: self.target.clone(),
            sha256_before: self.expected_sha256.clone(),
            sha256_after: self.new_sha256.clone(),
            bytes_written: self.bytes,
        })
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        if let Err(err) = fs::remove_file(&self.tmp)
            && err.kind() != ErrorKind::NotFound
        {
            warn!(tmp = %self.tmp, error = %err, "failed to remove staged file");
        }
    }
}

fn temp_path_for(target: &Utf8Path) -> Utf8PathBuf {
    let name = target.file_name().unwrap_or("file");
    let tmp_name = format!(".{name}.syntaxfix.{}.tmp", Uuid::new_v4().simple());
    match target.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.join(tmp_name),
        _ => Utf8PathBuf::from(tmp_name),
    }
}

fn sync_parent(target: &Utf8Path) {
    let Some(parent) = target.parent().filter(|p| !p.as_str().is_empty()) else {
        return;
    };
    if let Err(err) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        debug!(dir = %parent, error = %err, "parent directory sync failed");
    }
}

/// Unified diff of one file, with git-style headers. Empty when unchanged.
pub fn render_patch(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    let body = formatter.fmt_patch(&patch).to_string();
    // diffy repeats its own ---/+++ header; keep only the hunks.
    let hunks = body
        .split_once("\n@@")
        .map(|(_, rest)| format!("@@{rest}"))
        .unwrap_or(body);
    out.push_str(&hunks);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
