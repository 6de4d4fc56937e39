//! Progress reporting and cooperative cancellation for analysis runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Progress information for an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    /// Planes or windows processed so far.
    pub current: usize,
    /// Total number of steps.
    pub total: usize,
    pub stage: ScanStage,
}

/// Which analysis is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScanStage {
    #[strum(to_string = "modulation contrast")]
    ModulationContrast,
    #[strum(to_string = "raw phase Fourier")]
    PhaseFourier,
    #[strum(to_string = "pattern calibration")]
    PatternCalibration,
}

/// Callback type for progress reporting.
pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Observer hooks passed into an analysis run.
#[derive(Clone, Default)]
pub struct RunControl {
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl std::fmt::Debug for RunControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("progress", &self.progress.as_ref().map(|_| "..."))
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Report progress using the callback if set.
    pub fn report(&self, current: usize, total: usize, stage: ScanStage) {
        if let Some(f) = self.progress.as_ref() {
            f(ScanProgress {
                current,
                total,
                stage,
            });
        }
    }
}

/// Whether a run processed every plane or stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Completed,
    Cancelled,
}
