//! Scripted gateway for tests and offline demos
//!
//! Outcomes are configured up front and can be changed between calls. A gated
//! mock parks `classify`/`request_report` until [`MockGateway::release`] is
//! called, which lets tests observe the controller while a call is in flight.

use super::ClassificationGateway;
use crate::{
    error::{DermaScanError, Result},
    services::{default_report_filename, ReportIOService},
    types::{AnalysisData, ClassificationResult, CroppedImage, ModelInfo, ReportDocument, ServiceStatus},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// Scripted result of one mocked call
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome<T> {
    Success(T),
    /// Rejected with this reason
    Failure(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`ClassificationGateway`]
#[derive(Debug)]
pub struct MockGateway {
    status: Mutex<ServiceStatus>,
    classify_outcome: Mutex<MockOutcome<ClassificationResult>>,
    report_outcome: Mutex<MockOutcome<Vec<u8>>>,
    gate: Option<Semaphore>,
    download_dir: Option<PathBuf>,
    probe_calls: AtomicUsize,
    classify_calls: AtomicUsize,
    report_calls: AtomicUsize,
    call_history: Mutex<Vec<String>>,
    saved_reports: Mutex<Vec<(PathBuf, ReportDocument)>>,
    last_patient: Mutex<Option<String>>,
}

impl MockGateway {
    /// Available service returning [`MockGateway::sample_result`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: Mutex::new(ServiceStatus::Available),
            classify_outcome: Mutex::new(MockOutcome::Success(Self::sample_result())),
            report_outcome: Mutex::new(MockOutcome::Success(b"%PDF-1.4 mock report".to_vec())),
            gate: None,
            download_dir: None,
            probe_calls: AtomicUsize::new(0),
            classify_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
            call_history: Mutex::new(Vec::new()),
            saved_reports: Mutex::new(Vec::new()),
            last_patient: Mutex::new(None),
        }
    }

    /// Mock whose probe reports `Unavailable`
    #[must_use]
    pub fn new_unavailable() -> Self {
        let gateway = Self::new();
        gateway.set_status(ServiceStatus::Unavailable);
        gateway
    }

    /// Mock whose `classify` and `request_report` wait for [`release`](Self::release)
    #[must_use]
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Also write saved reports into `dir`
    #[must_use]
    pub fn with_download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// `{Acne: 0.82, Rosacea: 0.31}`, primary Acne
    #[must_use]
    pub fn sample_result() -> ClassificationResult {
        let predictions: BTreeMap<String, f64> = [("Acne", 0.82), ("Rosacea", 0.31)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        ClassificationResult {
            predictions,
            primary_condition: "Acne".to_string(),
            confidence: 0.82,
            class_names: vec!["Acne".to_string(), "Rosacea".to_string()],
        }
    }

    pub fn set_status(&self, status: ServiceStatus) {
        *lock(&self.status) = status;
    }

    pub fn set_classify_outcome(&self, outcome: MockOutcome<ClassificationResult>) {
        *lock(&self.classify_outcome) = outcome;
    }

    pub fn set_report_outcome(&self, outcome: MockOutcome<Vec<u8>>) {
        *lock(&self.report_outcome) = outcome;
    }

    /// Let `count` parked calls proceed
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    #[must_use]
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    /// Method names in call order
    #[must_use]
    pub fn call_history(&self) -> Vec<String> {
        lock(&self.call_history).clone()
    }

    #[must_use]
    pub fn saved_reports(&self) -> Vec<(PathBuf, ReportDocument)> {
        lock(&self.saved_reports).clone()
    }

    /// Patient label passed to the most recent report request
    #[must_use]
    pub fn last_patient(&self) -> Option<String> {
        lock(&self.last_patient).clone()
    }

    fn record_call(&self, method: &str) {
        lock(&self.call_history).push(method.to_string());
    }

    async fn wait_for_gate(&self) -> std::result::Result<(), String> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| format!("mock gate closed: {}", e))?
                .forget();
        }
        Ok(())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassificationGateway for MockGateway {
    async fn probe(&self) -> ServiceStatus {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.record_call("probe");
        *lock(&self.status)
    }

    async fn model_info(&self) -> Result<ModelInfo> {
        self.record_call("model_info");
        if !lock(&self.status).is_available() {
            return Err(DermaScanError::Unavailable("health check failed".to_string()));
        }
        Ok(ModelInfo {
            model_type: "mock".to_string(),
            num_classes: 5,
            class_names: ["Acne", "Actinic Keratosis", "Basal Cell Carcinoma", "Eczemaa", "Rosacea"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            device: "cpu".to_string(),
        })
    }

    async fn classify(&self, _image: &CroppedImage) -> Result<ClassificationResult> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.record_call("classify");
        self.wait_for_gate()
            .await
            .map_err(DermaScanError::ClassificationRejected)?;

        match lock(&self.classify_outcome).clone() {
            MockOutcome::Success(result) => Ok(result),
            MockOutcome::Failure(reason) => Err(DermaScanError::ClassificationRejected(reason)),
        }
    }

    async fn request_report(
        &self,
        _image: &CroppedImage,
        _analysis: &AnalysisData,
        patient_name: Option<&str>,
    ) -> Result<ReportDocument> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.record_call("request_report");
        *lock(&self.last_patient) = patient_name.map(str::to_string);
        self.wait_for_gate()
            .await
            .map_err(DermaScanError::ReportGenerationFailed)?;

        match lock(&self.report_outcome).clone() {
            MockOutcome::Success(bytes) => Ok(ReportDocument {
                bytes,
                content_type: Some("application/pdf".to_string()),
            }),
            MockOutcome::Failure(reason) => Err(DermaScanError::ReportGenerationFailed(reason)),
        }
    }

    async fn save_report_to_disk(
        &self,
        report: &ReportDocument,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf> {
        self.record_call("save_report_to_disk");
        let path = match &self.download_dir {
            Some(dir) => ReportIOService::save_report(report, dir, suggested_name)?,
            None => PathBuf::from(
                suggested_name.map_or_else(|| default_report_filename(Utc::now()), str::to_string),
            ),
        };
        lock(&self.saved_reports).push((path.clone(), report.clone()));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn cropped() -> CroppedImage {
        CroppedImage {
            bytes: vec![0xFF, 0xD8],
            width: 1,
            height: 1,
            mime_type: "image/jpeg",
        }
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let gateway = MockGateway::new();
        assert_eq!(gateway.classify(&cropped()).await.unwrap().primary_condition, "Acne");

        gateway.set_classify_outcome(MockOutcome::Failure("Model not loaded".to_string()));
        let err = gateway.classify(&cropped()).await.unwrap_err();
        assert_eq!(err.to_string(), "Model not loaded");
        assert_eq!(gateway.classify_calls(), 2);
    }

    #[tokio::test]
    async fn test_model_info_when_down() {
        let gateway = MockGateway::new_unavailable();
        let err = gateway.model_info().await.unwrap_err();
        assert!(matches!(err, DermaScanError::Unavailable(_)));
        assert!(err.is_transient());

        gateway.set_status(ServiceStatus::Available);
        assert_eq!(gateway.model_info().await.unwrap().num_classes, 5);
    }

    #[tokio::test]
    async fn test_gate_parks_until_released() {
        let gateway = Arc::new(MockGateway::gated());
        let task = {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.classify(&cropped()).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(gateway.classify_calls(), 1);
        assert!(!task.is_finished());

        gateway.release(1);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_save_without_directory_is_in_memory() {
        let gateway = MockGateway::new();
        let report = ReportDocument {
            bytes: vec![1, 2, 3],
            content_type: None,
        };
        let path = gateway.save_report_to_disk(&report, Some("a.pdf")).await.unwrap();
        assert_eq!(path, PathBuf::from("a.pdf"));
        assert!(!path.exists());
        assert_eq!(gateway.saved_reports().len(), 1);
        assert_eq!(
            gateway.call_history(),
            vec!["save_report_to_disk".to_string()]
        );
    }
}
