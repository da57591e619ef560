//! Workflow states and the transition function

use std::fmt;

/// Where an analysis session currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    ImageSelected,
    /// Crop rectangle being adjusted
    Cropping,
    Cropped,
    Analyzing,
    AnalysisFailed,
    Complete,
    GeneratingReport,
    /// Transient; immediately acknowledged back to `Complete`
    ReportFailed,
}

impl WorkflowState {
    /// Whether a remote call is outstanding
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Analyzing | Self::GeneratingReport)
    }

    /// Apply `event`, or `None` when it is not accepted here
    #[must_use]
    pub fn next(self, event: WorkflowEvent) -> Option<Self> {
        use WorkflowEvent as E;
        use WorkflowState as S;

        let next = match (self, event) {
            (_, E::SelectImage) => S::ImageSelected,
            (_, E::Reset) => S::Idle,
            (S::ImageSelected, E::StartCrop) => S::Cropping,
            (S::Cropping, E::CancelCrop) => S::ImageSelected,
            (S::ImageSelected | S::Cropping, E::FinalizeCrop) => S::Cropped,
            (S::Cropped | S::AnalysisFailed, E::Recrop) => S::ImageSelected,
            (S::Cropped | S::AnalysisFailed, E::Analyze) => S::Analyzing,
            (S::Analyzing, E::ClassifySucceeded) => S::Complete,
            (S::Analyzing, E::ClassifyFailed) => S::AnalysisFailed,
            (S::Complete, E::RequestReport) => S::GeneratingReport,
            (S::GeneratingReport, E::ReportSucceeded) => S::Complete,
            (S::GeneratingReport, E::ReportFailed) => S::ReportFailed,
            (S::ReportFailed, E::AcknowledgeReportFailure) => S::Complete,
            _ => return None,
        };
        Some(next)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::ImageSelected => "ImageSelected",
            Self::Cropping => "Cropping",
            Self::Cropped => "Cropped",
            Self::Analyzing => "Analyzing",
            Self::AnalysisFailed => "AnalysisFailed",
            Self::Complete => "Complete",
            Self::GeneratingReport => "GeneratingReport",
            Self::ReportFailed => "ReportFailed",
        };
        f.write_str(name)
    }
}

/// Inputs to [`WorkflowState::next`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    SelectImage,
    StartCrop,
    CancelCrop,
    FinalizeCrop,
    Recrop,
    Analyze,
    ClassifySucceeded,
    ClassifyFailed,
    RequestReport,
    ReportSucceeded,
    ReportFailed,
    AcknowledgeReportFailure,
    Reset,
}

impl WorkflowEvent {
    /// Verb phrase used in `InvalidTransition` messages
    #[must_use]
    pub fn operation(self) -> &'static str {
        match self {
            Self::SelectImage => "select an image",
            Self::StartCrop => "start cropping",
            Self::CancelCrop => "cancel cropping",
            Self::FinalizeCrop => "finalize a crop",
            Self::Recrop => "re-crop",
            Self::Analyze => "analyze",
            Self::ClassifySucceeded | Self::ClassifyFailed => "settle a classification",
            Self::RequestReport => "request a report",
            Self::ReportSucceeded | Self::ReportFailed => "settle a report",
            Self::AcknowledgeReportFailure => "acknowledge a report failure",
            Self::Reset => "reset",
        }
    }
}
