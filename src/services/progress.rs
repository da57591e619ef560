//! Progress reporting service
//!
//! This module separates progress reporting concerns from the workflow logic,
//! allowing different frontends (CLI progress bar, GUI, tests) to observe the
//! analysis without the controller knowing about them.

use crate::config::ProgressConfig;
use crate::workflow::WorkflowState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Stages of a skin analysis session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Decoding the selected photograph
    ImageLoading,
    /// Extracting and encoding the selected region
    Cropping,
    /// Probing the classification service
    ServiceCheck,
    /// Waiting on the remote classifier
    Analyzing,
    /// Requesting the printable report
    ReportGeneration,
    /// Writing the report to the download folder
    ReportDownload,
    /// Analysis finished
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading image",
            ProcessingStage::Cropping => "Cropping selected area",
            ProcessingStage::ServiceCheck => "Checking classification service",
            ProcessingStage::Analyzing => "Analyzing skin patterns",
            ProcessingStage::ReportGeneration => "Generating medical report",
            ProcessingStage::ReportDownload => "Saving report",
            ProcessingStage::Completed => "Analysis complete",
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since the stage started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, progress: u8, start_time: Instant) -> Self {
        Self {
            progress: progress.min(100),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Observer for workflow progress, transitions and surfaced errors
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report a state machine transition
    fn report_transition(&self, from: WorkflowState, to: WorkflowState) {
        let _ = (from, to);
    }

    /// Report a user-visible error
    ///
    /// # Arguments
    /// * `stage` - Stage where error occurred
    /// * `error` - Error description
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Reporter that discards everything
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Reporter that forwards updates to `tracing`
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// # Arguments
    /// * `verbose` - Also log every progress tick and transition
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            tracing::info!(
                stage = ?update.stage,
                progress = update.progress,
                elapsed_ms = update.elapsed_ms,
                "{}",
                update.description
            );
        }
    }

    fn report_transition(&self, from: WorkflowState, to: WorkflowState) {
        if self.verbose {
            tracing::debug!(%from, %to, "Workflow transition");
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        tracing::error!(stage = ?stage, "{}: {}", stage.description(), error);
    }
}

#[derive(Debug)]
struct TickerState {
    value: u8,
    cancelled: bool,
}

fn lock(state: &Mutex<TickerState>) -> MutexGuard<'_, TickerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Synthetic progress counter for a single opaque remote call
///
/// Advances by `step` every `interval_ms` up to `cap`. After [`cancel`]
/// returns no further increment or report can happen, because both the
/// increment and the report run under the same lock as the cancelled flag.
///
/// [`cancel`]: ProgressTicker::cancel
#[derive(Debug)]
pub struct ProgressTicker {
    state: Arc<Mutex<TickerState>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Spawn the ticker on the current tokio runtime, starting at 0
    #[must_use]
    pub fn start(config: ProgressConfig, reporter: Arc<dyn ProgressReporter>) -> Self {
        let state = Arc::new(Mutex::new(TickerState {
            value: 0,
            cancelled: false,
        }));
        let task_state = Arc::clone(&state);
        let started = Instant::now();
        let period = Duration::from_millis(config.interval_ms.max(1));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(started + period, period);
            loop {
                interval.tick().await;
                let mut guard = lock(&task_state);
                if guard.cancelled {
                    break;
                }
                let next = guard.value.saturating_add(config.step).min(config.cap);
                if next <= guard.value {
                    break;
                }
                guard.value = next;
                reporter.report_progress(ProgressUpdate::new(
                    ProcessingStage::Analyzing,
                    next,
                    started,
                ));
                if next >= config.cap {
                    break;
                }
            }
        });

        Self {
            state,
            handle: Some(handle),
        }
    }

    /// Current counter value
    #[must_use]
    pub fn progress(&self) -> u8 {
        lock(&self.state).value
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        lock(&self.state).cancelled
    }

    /// Stop the ticker and return the last value it reached
    pub fn cancel(&mut self) -> u8 {
        let value = {
            let mut guard = lock(&self.state);
            guard.cancelled = true;
            guard.value
        };
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        value
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}
