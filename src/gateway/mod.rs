//! Client side of the remote classification service
//!
//! The workflow controller only ever sees the [`ClassificationGateway`] trait,
//! so the HTTP client can be swapped for [`MockGateway`] in tests.

pub mod http;
pub mod mock;

pub use http::HttpGateway;
pub use mock::{MockGateway, MockOutcome};

use crate::{
    error::Result,
    types::{AnalysisData, ClassificationResult, CroppedImage, ModelInfo, ReportDocument, ServiceStatus},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Asynchronous round-trips to the classification service
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait ClassificationGateway: Send + Sync {
    /// Liveness check; transport failures map to `Unavailable`
    async fn probe(&self) -> ServiceStatus;

    /// Describe the deployed model
    async fn model_info(&self) -> Result<ModelInfo>;

    /// Classify a cropped region
    ///
    /// # Errors
    /// `ClassificationRejected` carrying the server's reason when available
    async fn classify(&self, image: &CroppedImage) -> Result<ClassificationResult>;

    /// Render a printable report for an analysis
    ///
    /// # Errors
    /// `ReportGenerationFailed` carrying the server's reason when available
    async fn request_report(
        &self,
        image: &CroppedImage,
        analysis: &AnalysisData,
        patient_name: Option<&str>,
    ) -> Result<ReportDocument>;

    /// Persist a report to the user's download location
    ///
    /// Uses `medical_report_<timestamp>.pdf` when `suggested_name` is `None`.
    async fn save_report_to_disk(
        &self,
        report: &ReportDocument,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf>;
}

/// `POST /classify` body
#[derive(Debug, Serialize)]
pub struct ClassifyRequest {
    /// Base64 data URL
    pub image: String,
}

/// `POST /generate-report` body
#[derive(Debug, Serialize)]
pub struct ReportRequest<'a> {
    pub image: String,
    pub analysis_data: &'a AnalysisData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<&'a str>,
}

/// `GET /health` body
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Server-provided reason, `detail` preferred over `error`
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        [&self.detail, &self.error]
            .into_iter()
            .flatten()
            .find_map(|value| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) if s.trim().is_empty() => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "Model not loaded", "error": "other"}"#).unwrap();
        assert_eq!(body.reason().as_deref(), Some("Model not loaded"));

        let body: ErrorBody = serde_json::from_str(r#"{"error": "Invalid image"}"#).unwrap();
        assert_eq!(body.reason().as_deref(), Some("Invalid image"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail": ""}"#).unwrap();
        assert_eq!(body.reason(), None);
    }

    #[test]
    fn test_report_request_omits_missing_patient() {
        let data = AnalysisData {
            predictions: Default::default(),
            primary_condition: "Acne".to_string(),
            confidence: 0.8,
            recommendations: vec![],
            products: vec![],
        };
        let body = ReportRequest {
            image: "data:image/jpeg;base64,AA==".to_string(),
            analysis_data: &data,
            patient_name: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("patient_name").is_none());
        assert_eq!(json["analysis_data"]["primary_condition"], "Acne");
    }
}
