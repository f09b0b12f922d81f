//! Per-file error taxonomy.
//!
//! None of these abort a run. They are rendered into the file's outcome and
//! counted in the report; see [`crate::pipeline::RunError`] for the
//! startup errors that do abort.

use camino::Utf8PathBuf;
use syntaxfix_edit::CommitError;
use syntaxfix_types::report::Convergence;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepairError {
    /// The file could not be read (permissions, encoding, vanished).
    #[error("read {path}: {source}")]
    FileAccess {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The repaired content could not be written.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// No fixed point within the pass budget.
    #[error("{path}: {} after {passes} passes", describe(.state))]
    Convergence {
        path: Utf8PathBuf,
        state: Convergence,
        passes: u32,
    },
}

fn describe(state: &Convergence) -> String {
    match state {
        Convergence::Oscillating { period } => format!("oscillating with period {period}"),
        Convergence::Exhausted => "still changing".to_string(),
        Convergence::Converged => "converged".to_string(),
        Convergence::NotRun => "not run".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convergence_error_names_the_state() {
        let err = RepairError::Convergence {
            path: "src/a.ts".into(),
            state: Convergence::Oscillating { period: 2 },
            passes: 3,
        };
        assert_eq!(
            err.to_string(),
            "src/a.ts: oscillating with period 2 after 3 passes"
        );
    }

    #[test]
    fn file_access_error_keeps_source() {
        let err = RepairError::FileAccess {
            path: "src/a.ts".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
