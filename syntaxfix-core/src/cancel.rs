//! Run-level cancellation: an explicit flag plus an optional deadline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared between workers; cloning shares the flag.
///
/// Checked before a file is started. A file already in progress finishes
/// (and commits) normally.
#[derive(Debug, Clone)]
pub struct RunCancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RunCancellation {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Cancel automatically once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

impl Default for RunCancellation {
    fn default() -> Self {
        Self::new()
    }
}
