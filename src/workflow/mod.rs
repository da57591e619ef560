//! Analysis workflow controller
//!
//! Sequences image selection, cropping, classification and report generation
//! over an injected [`ClassificationGateway`]. All mutable session state sits
//! behind one async mutex; the lock is released while a remote call is in
//! flight so the progress counter and read accessors stay responsive.
//!
//! A session epoch is bumped by [`select_image`] and [`reset`]. A remote call
//! that settles under an older epoch is discarded without touching state.
//!
//! [`select_image`]: AnalysisWorkflowController::select_image
//! [`reset`]: AnalysisWorkflowController::reset

pub mod state;

pub use state::{WorkflowEvent, WorkflowState};

use crate::{
    config::DermaScanConfig,
    crop::CropTransformEngine,
    error::{DermaScanError, Result},
    gateway::ClassificationGateway,
    interpreter::ResultInterpreter,
    services::{NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTicker, ProgressUpdate},
    types::{AnalysisSummary, ClassificationResult, CropRegion, CroppedImage, ServiceStatus, SourceImage},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;

/// Fraction of the shorter display side covered by the initial crop
const DEFAULT_CROP_FRACTION: f64 = 0.5;

/// User-visible transient message for a surfaced error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub stage: ProcessingStage,
    pub message: String,
    /// Repeating the action may succeed
    pub retryable: bool,
}

/// How a request-style operation was handled
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<T> {
    /// The call ran and settled successfully
    Completed(T),
    /// Dropped because the same call is already in flight
    Ignored,
    /// The call settled after the session moved on; its result was discarded
    Superseded,
}

impl<T> Dispatch<T> {
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Ignored | Self::Superseded => None,
        }
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

#[derive(Default)]
struct Session {
    state: WorkflowState,
    source: Option<SourceImage>,
    cropped: Option<Arc<CroppedImage>>,
    result: Option<ClassificationResult>,
    service_status: Option<ServiceStatus>,
    ticker: Option<ProgressTicker>,
    progress: u8,
    epoch: u64,
    notification: Option<Notification>,
}

impl Session {
    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn current_progress(&self) -> u8 {
        self.ticker.as_ref().map_or(self.progress, ProgressTicker::progress)
    }

    /// Drop everything tied to the current photograph and start a new epoch
    fn discard_work(&mut self) {
        self.stop_ticker();
        self.cropped = None;
        self.result = None;
        self.progress = 0;
        self.notification = None;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// State machine driving one analysis session
pub struct AnalysisWorkflowController {
    gateway: Arc<dyn ClassificationGateway>,
    config: DermaScanConfig,
    engine: CropTransformEngine,
    interpreter: ResultInterpreter,
    reporter: Arc<dyn ProgressReporter>,
    session: Mutex<Session>,
}

impl AnalysisWorkflowController {
    #[must_use]
    pub fn new(gateway: Arc<dyn ClassificationGateway>, config: DermaScanConfig) -> Self {
        Self::with_reporter(gateway, config, Arc::new(NoOpProgressReporter))
    }

    #[must_use]
    pub fn with_reporter(
        gateway: Arc<dyn ClassificationGateway>,
        config: DermaScanConfig,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            engine: CropTransformEngine::new(config.crop),
            interpreter: ResultInterpreter::new(config.thresholds),
            gateway,
            config,
            reporter,
            session: Mutex::new(Session::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DermaScanConfig {
        &self.config
    }

    fn transition(&self, session: &mut Session, event: WorkflowEvent) -> Result<WorkflowState> {
        let from = session.state;
        let to = from.next(event).ok_or_else(|| DermaScanError::InvalidTransition {
            operation: event.operation(),
            state: from.to_string(),
        })?;
        session.state = to;
        if from != to {
            tracing::debug!(%from, %to, ?event, "Workflow transition");
            self.reporter.report_transition(from, to);
        }
        Ok(to)
    }

    fn surface(&self, session: &mut Session, stage: ProcessingStage, error: &DermaScanError) {
        let message = error.to_string();
        tracing::warn!(stage = ?stage, error = %message, "Surfacing error");
        self.reporter.report_error(stage, &message);
        session.notification = Some(Notification {
            stage,
            message,
            retryable: error.is_transient(),
        });
    }

    /// Store a new photograph; discards any crop or result from before
    pub async fn select_image(&self, source: SourceImage) -> WorkflowState {
        let mut session = self.session.lock().await;
        session.discard_work();
        let (width, height) = source.native_size();
        session.source = Some(source);
        tracing::info!(width, height, "Image selected");
        // SelectImage is accepted from every state
        self.transition(&mut session, WorkflowEvent::SelectImage)
            .unwrap_or(WorkflowState::ImageSelected)
    }

    /// Centered square over the current photograph's display area
    pub async fn default_crop_region(&self) -> Option<CropRegion> {
        let session = self.session.lock().await;
        session.source.as_ref().map(|source| {
            let (width, height) = source.display_size();
            CropRegion::centered_square(width, height, DEFAULT_CROP_FRACTION)
        })
    }

    pub async fn start_crop(&self) -> Result<WorkflowState> {
        let mut session = self.session.lock().await;
        self.transition(&mut session, WorkflowEvent::StartCrop)
    }

    pub async fn cancel_crop(&self) -> Result<WorkflowState> {
        let mut session = self.session.lock().await;
        self.transition(&mut session, WorkflowEvent::CancelCrop)
    }

    /// Extract `region` at native resolution and move to `Cropped`
    ///
    /// Crop errors are surfaced and leave the state unchanged.
    pub async fn finalize_crop(&self, region: CropRegion) -> Result<Arc<CroppedImage>> {
        let mut session = self.session.lock().await;
        let from = session.state;
        if from.next(WorkflowEvent::FinalizeCrop).is_none() {
            return Err(DermaScanError::InvalidTransition {
                operation: WorkflowEvent::FinalizeCrop.operation(),
                state: from.to_string(),
            });
        }

        let Some(source) = session.source.as_ref() else {
            return Err(DermaScanError::invalid_image("no image selected"));
        };

        let started = Instant::now();
        let cropped = match self
            .engine
            .extract_region(source, &region, self.config.crop.jpeg_quality)
        {
            Ok(cropped) => Arc::new(cropped),
            Err(e) => {
                self.surface(&mut session, ProcessingStage::Cropping, &e);
                return Err(e);
            },
        };

        tracing::info!(
            width = cropped.width,
            height = cropped.height,
            bytes = cropped.bytes.len(),
            "Crop finalized"
        );
        self.reporter
            .report_progress(ProgressUpdate::new(ProcessingStage::Cropping, 100, started));
        session.cropped = Some(Arc::clone(&cropped));
        session.notification = None;
        self.transition(&mut session, WorkflowEvent::FinalizeCrop)?;
        Ok(cropped)
    }

    /// Discard the crop and return to `ImageSelected`
    pub async fn recrop(&self) -> Result<WorkflowState> {
        let mut session = self.session.lock().await;
        let to = self.transition(&mut session, WorkflowEvent::Recrop)?;
        session.cropped = None;
        session.progress = 0;
        Ok(to)
    }

    /// Probe the service and cache the answer for `analyze`
    pub async fn check_service(&self) -> ServiceStatus {
        let status = self.gateway.probe().await;
        tracing::info!(?status, "Service status");
        self.session.lock().await.service_status = Some(status);
        status
    }

    /// Whether the session moved on since `epoch` or left `expected`
    async fn is_stale(&self, epoch: u64, expected: WorkflowState) -> bool {
        let session = self.session.lock().await;
        session.epoch != epoch || session.state != expected
    }

    fn check_analyze_allowed(session: &Session) -> Result<()> {
        if session.state.next(WorkflowEvent::Analyze).is_none() {
            return Err(DermaScanError::InvalidTransition {
                operation: WorkflowEvent::Analyze.operation(),
                state: session.state.to_string(),
            });
        }
        Ok(())
    }

    /// Classify the current crop
    ///
    /// Returns [`Dispatch::Ignored`] without calling the gateway while a
    /// classification is already in flight. A first-time service probe runs
    /// without holding the session lock; if the session moved on meanwhile
    /// the call returns [`Dispatch::Superseded`].
    ///
    /// # Errors
    /// - `ServiceUnavailable` when the last probe failed; no call is made and
    ///   the state stays `Cropped`
    /// - the gateway's error, after moving to `AnalysisFailed`
    #[instrument(skip(self))]
    pub async fn analyze(&self) -> Result<Dispatch<AnalysisSummary>> {
        let (epoch, cached_status) = {
            let session = self.session.lock().await;
            if session.state == WorkflowState::Analyzing {
                tracing::debug!("Analysis already in flight; ignoring request");
                return Ok(Dispatch::Ignored);
            }
            Self::check_analyze_allowed(&session)?;
            (session.epoch, session.service_status)
        };

        // Health check runs unlocked so accessors and navigation stay responsive
        let status = match cached_status {
            Some(status) => status,
            None => self.gateway.probe().await,
        };

        let image = {
            let mut session = self.session.lock().await;
            if session.epoch != epoch {
                tracing::debug!(epoch, current = session.epoch, "Discarding stale health check");
                return Ok(Dispatch::Superseded);
            }
            if cached_status.is_none() {
                session.service_status = Some(status);
            }
            if session.state == WorkflowState::Analyzing {
                tracing::debug!("Analysis started while probing; ignoring request");
                return Ok(Dispatch::Ignored);
            }
            Self::check_analyze_allowed(&session)?;

            if !status.is_available() {
                let error = DermaScanError::ServiceUnavailable;
                self.surface(&mut session, ProcessingStage::ServiceCheck, &error);
                return Err(error);
            }

            let Some(image) = session.cropped.clone() else {
                return Err(DermaScanError::invalid_image("no cropped image to analyze"));
            };

            self.transition(&mut session, WorkflowEvent::Analyze)?;
            session.notification = None;
            session.progress = 0;
            session.ticker = Some(ProgressTicker::start(
                self.config.progress,
                Arc::clone(&self.reporter),
            ));
            image
        };

        let started = Instant::now();
        let outcome = self.gateway.classify(&image).await;

        let mut session = self.session.lock().await;
        if session.epoch != epoch || session.state != WorkflowState::Analyzing {
            tracing::debug!(epoch, current = session.epoch, "Discarding stale classification");
            return Ok(Dispatch::Superseded);
        }
        session.stop_ticker();

        match outcome {
            Ok(result) => {
                let summary = self.interpreter.summarize(&result);
                session.result = Some(result);
                session.progress = 100;
                self.transition(&mut session, WorkflowEvent::ClassifySucceeded)?;
                self.reporter
                    .report_progress(ProgressUpdate::new(ProcessingStage::Completed, 100, started));
                tracing::info!(
                    primary = %summary.primary_condition,
                    confidence = summary.confidence,
                    meets_threshold = summary.meets_threshold,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis complete"
                );
                Ok(Dispatch::Completed(summary))
            },
            Err(error) => {
                session.progress = 0;
                self.transition(&mut session, WorkflowEvent::ClassifyFailed)?;
                self.surface(&mut session, ProcessingStage::Analyzing, &error);
                Err(error)
            },
        }
    }

    /// Generate the report for the current result and save it
    ///
    /// Returns the saved path, or [`Dispatch::Ignored`] while a report is
    /// already being generated. A failure is surfaced and the state returns
    /// to `Complete` with the result kept.
    #[instrument(skip(self, patient_name, suggested_name))]
    pub async fn request_report(
        &self,
        patient_name: Option<&str>,
        suggested_name: Option<&str>,
    ) -> Result<Dispatch<PathBuf>> {
        let (epoch, image, analysis) = {
            let mut session = self.session.lock().await;
            if session.state == WorkflowState::GeneratingReport {
                tracing::debug!("Report already in flight; ignoring request");
                return Ok(Dispatch::Ignored);
            }
            if session.state.next(WorkflowEvent::RequestReport).is_none() {
                return Err(DermaScanError::InvalidTransition {
                    operation: WorkflowEvent::RequestReport.operation(),
                    state: session.state.to_string(),
                });
            }
            let (Some(image), Some(result)) = (session.cropped.clone(), session.result.as_ref())
            else {
                return Err(DermaScanError::invalid_config("no analysis result to report on"));
            };
            let analysis = ResultInterpreter::analysis_data(result);
            self.transition(&mut session, WorkflowEvent::RequestReport)?;
            session.notification = None;
            (session.epoch, image, analysis)
        };

        let started = Instant::now();
        self.reporter
            .report_progress(ProgressUpdate::new(ProcessingStage::ReportGeneration, 0, started));

        let outcome = match self
            .gateway
            .request_report(&image, &analysis, patient_name)
            .await
        {
            Ok(report) => {
                if self.is_stale(epoch, WorkflowState::GeneratingReport).await {
                    tracing::debug!(epoch, "Discarding stale report before saving");
                    return Ok(Dispatch::Superseded);
                }
                self.reporter.report_progress(ProgressUpdate::new(
                    ProcessingStage::ReportDownload,
                    50,
                    started,
                ));
                self.gateway.save_report_to_disk(&report, suggested_name).await
            },
            Err(e) => Err(e),
        };

        let mut session = self.session.lock().await;
        if session.epoch != epoch || session.state != WorkflowState::GeneratingReport {
            tracing::debug!(epoch, current = session.epoch, "Discarding stale report");
            return Ok(Dispatch::Superseded);
        }

        match outcome {
            Ok(path) => {
                self.transition(&mut session, WorkflowEvent::ReportSucceeded)?;
                self.reporter.report_progress(ProgressUpdate::new(
                    ProcessingStage::ReportDownload,
                    100,
                    started,
                ));
                tracing::info!(path = %path.display(), "Report downloaded");
                Ok(Dispatch::Completed(path))
            },
            Err(error) => {
                self.transition(&mut session, WorkflowEvent::ReportFailed)?;
                self.surface(&mut session, ProcessingStage::ReportGeneration, &error);
                self.transition(&mut session, WorkflowEvent::AcknowledgeReportFailure)?;
                Err(error)
            },
        }
    }

    /// Back to `Idle`, discarding the photograph and any cached probe
    pub async fn reset(&self) -> WorkflowState {
        let mut session = self.session.lock().await;
        session.discard_work();
        session.source = None;
        session.service_status = None;
        self.transition(&mut session, WorkflowEvent::Reset)
            .unwrap_or(WorkflowState::Idle)
    }

    pub async fn state(&self) -> WorkflowState {
        self.session.lock().await.state
    }

    /// 0-100; live ticker value while analyzing
    pub async fn progress(&self) -> u8 {
        self.session.lock().await.current_progress()
    }

    /// Derived view of the held result
    pub async fn summary(&self) -> Option<AnalysisSummary> {
        let session = self.session.lock().await;
        session.result.as_ref().map(|r| self.interpreter.summarize(r))
    }

    pub async fn result(&self) -> Option<ClassificationResult> {
        self.session.lock().await.result.clone()
    }

    pub async fn cropped_image(&self) -> Option<Arc<CroppedImage>> {
        self.session.lock().await.cropped.clone()
    }

    pub async fn service_status(&self) -> Option<ServiceStatus> {
        self.session.lock().await.service_status
    }

    pub async fn last_notification(&self) -> Option<Notification> {
        self.session.lock().await.notification.clone()
    }

    /// Return and clear the pending notification
    pub async fn take_notification(&self) -> Option<Notification> {
        self.session.lock().await.notification.take()
    }
}
