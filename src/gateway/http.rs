//! reqwest-backed gateway for the hosted classification service

use super::{ClassificationGateway, ClassifyRequest, ErrorBody, HealthResponse, ReportRequest};
use crate::{
    config::GatewayConfig,
    error::{DermaScanError, Result},
    services::ReportIOService,
    types::{AnalysisData, ClassificationResult, CroppedImage, ModelInfo, ReportDocument, ServiceStatus},
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(flatten)]
    result: ClassificationResult,
}

/// HTTP client for `/health`, `/model-info`, `/classify` and `/generate-report`
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Build a client with the configured request timeout
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("dermascan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DermaScanError::network_error("Failed to build HTTP client", &e))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `detail`, then `error`, then `"<operation> failed: <status text>"`
    async fn failure_reason(operation: &str, response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.reason())
            .unwrap_or_else(|| format!("{} failed: {}", operation, status_text(status)))
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_u16().to_string(), str::to_string)
}

#[async_trait]
impl ClassificationGateway for HttpGateway {
    #[instrument(level = "debug", skip(self))]
    async fn probe(&self) -> ServiceStatus {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(response) if response.status().is_success() => {
                if let Ok(health) = response.json::<HealthResponse>().await {
                    tracing::debug!(status = %health.status, message = ?health.message, "Service healthy");
                }
                ServiceStatus::Available
            },
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Health check failed");
                ServiceStatus::Unavailable
            },
            Err(e) => {
                tracing::warn!(error = %e, connect = e.is_connect(), "Health check failed");
                ServiceStatus::Unavailable
            },
        }
    }

    async fn model_info(&self) -> Result<ModelInfo> {
        let response = self
            .client
            .get(self.endpoint("model-info"))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    DermaScanError::Unavailable(e.to_string())
                } else {
                    DermaScanError::network_error("Failed to get model info", &e)
                }
            })?;

        if !response.status().is_success() {
            return Err(DermaScanError::Network(format!(
                "Failed to get model info: {}",
                status_text(response.status())
            )));
        }

        response
            .json::<ModelInfo>()
            .await
            .map_err(|e| DermaScanError::network_error("Failed to parse model info", &e))
    }

    #[instrument(skip(self, image), fields(width = image.width, height = image.height, bytes = image.bytes.len()))]
    async fn classify(&self, image: &CroppedImage) -> Result<ClassificationResult> {
        let body = ClassifyRequest {
            image: image.to_data_url(),
        };

        let response = self
            .client
            .post(self.endpoint("classify"))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DermaScanError::classification_rejected(format!(
                        "Classification failed: request timed out after {}s",
                        self.config.timeout_secs
                    ))
                } else {
                    DermaScanError::classification_rejected(format!("Classification failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let reason = Self::failure_reason("Classification", response).await;
            tracing::warn!(%reason, "Classification rejected");
            return Err(DermaScanError::ClassificationRejected(reason));
        }

        let parsed: ClassifyResponse = response.json().await.map_err(|e| {
            DermaScanError::classification_rejected(format!(
                "Classification failed: invalid response ({})",
                e
            ))
        })?;

        if parsed.success == Some(false) {
            return Err(DermaScanError::classification_rejected(
                "Classification failed: service reported an unsuccessful prediction",
            ));
        }

        tracing::info!(
            primary = %parsed.result.primary_condition,
            confidence = parsed.result.confidence,
            "Classification complete"
        );
        Ok(parsed.result)
    }

    #[instrument(skip(self, image, analysis, patient_name), fields(primary = %analysis.primary_condition))]
    async fn request_report(
        &self,
        image: &CroppedImage,
        analysis: &AnalysisData,
        patient_name: Option<&str>,
    ) -> Result<ReportDocument> {
        let body = ReportRequest {
            image: image.to_data_url(),
            analysis_data: analysis,
            patient_name,
        };

        let response = self
            .client
            .post(self.endpoint("generate-report"))
            .json(&body)
            .send()
            .await
            .map_err(|e| DermaScanError::report_failed(format!("Report generation failed: {}", e)))?;

        if !response.status().is_success() {
            let reason = Self::failure_reason("Report generation", response).await;
            tracing::warn!(%reason, "Report generation rejected");
            return Err(DermaScanError::ReportGenerationFailed(reason));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DermaScanError::report_failed(format!("Report generation failed: {}", e)))?;

        tracing::info!(bytes = bytes.len(), content_type = ?content_type, "Report received");
        Ok(ReportDocument {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn save_report_to_disk(
        &self,
        report: &ReportDocument,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf> {
        ReportIOService::save_report(report, self.config.resolved_download_dir(), suggested_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let gateway = HttpGateway::new(GatewayConfig {
            base_url: "http://localhost:5000/api/".to_string(),
            ..GatewayConfig::default()
        })
        .unwrap();
        assert_eq!(gateway.endpoint("classify"), "http://localhost:5000/api/classify");
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(StatusCode::INTERNAL_SERVER_ERROR), "Internal Server Error");
        assert_eq!(status_text(StatusCode::from_u16(599).unwrap()), "599");
    }

    #[test]
    fn test_classify_response_flattening() {
        let json = r#"{"success": true, "predictions": {"Acne": 1.0}, "primary_condition": "Acne", "confidence": 1.0, "class_names": ["Acne"]}"#;
        let parsed: ClassifyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.success, Some(true));
        assert_eq!(parsed.result.primary_condition, "Acne");
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_unavailable() {
        let gateway = HttpGateway::new(GatewayConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            timeout_secs: 2,
            download_dir: None,
        })
        .unwrap();
        assert_eq!(gateway.probe().await, ServiceStatus::Unavailable);
    }
}
