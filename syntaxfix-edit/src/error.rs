//! Error types for syntaxfix-edit.
//!
//! A failed commit always leaves the target file as it was before the
//! attempt; the variants only say why the new content did not land.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitError {
    /// The file changed on disk between read and commit.
    #[error("{path} changed since it was read (expected sha256 {expected}, found {actual})")]
    PreconditionMismatch {
        path: Utf8PathBuf,
        expected: String,
        actual: String,
    },

    /// The file was removed between read and commit.
    #[error("{path} no longer exists")]
    Missing { path: Utf8PathBuf },

    #[error("commit {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CommitError {
    pub fn path(&self) -> &Utf8Path {
        match self {
            CommitError::PreconditionMismatch { path, .. }
            | CommitError::Missing { path }
            | CommitError::Io { path, .. } => path,
        }
    }

    /// True when the commit was refused because the file moved under us.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CommitError::PreconditionMismatch { .. } | CommitError::Missing { .. }
        )
    }
}
