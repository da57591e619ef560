#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # DermaScan
//!
//! Client-side core of a skin-image analysis service: select a photograph,
//! crop a region of interest at native resolution, classify it remotely, turn
//! the probabilities into findings, recommendations and product suggestions,
//! and download a printable report.
//!
//! ## Features
//!
//! - **Native-resolution crops**: display-space rectangles are mapped through
//!   independent horizontal and vertical scale factors and encoded as JPEG
//! - **Pluggable gateway**: [`ClassificationGateway`] with an HTTP client
//!   ([`HttpGateway`]) and a scripted [`MockGateway`] for tests
//! - **Deterministic interpretation**: severity bands, sorted findings and a
//!   static condition catalog ([`ResultInterpreter`])
//! - **Explicit workflow**: [`AnalysisWorkflowController`] drives a state
//!   machine with a cancellable progress ticker and stale-result protection
//! - **CLI Integration**: optional command-line interface (`cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dermascan::{
//!     AnalysisWorkflowController, CropRegion, DermaScanConfig, HttpGateway, ImageIOService,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DermaScanConfig::builder()
//!     .base_url("http://localhost:5000/api")
//!     .build()?;
//! let gateway = Arc::new(HttpGateway::new(config.gateway.clone())?);
//! let controller = AnalysisWorkflowController::new(gateway, config);
//!
//! // Photo rendered at 800x600 on screen
//! let source = ImageIOService::load_source_image("forearm.jpg", Some((800.0, 600.0)))?;
//! controller.select_image(source).await;
//! controller.finalize_crop(CropRegion::new(100.0, 100.0, 200.0, 200.0)).await?;
//!
//! if let Some(summary) = controller.analyze().await?.completed() {
//!     println!("{} ({}%)", summary.overall, summary.confidence);
//!     for finding in &summary.findings {
//!         println!("  {} {}% [{}]", finding.condition, finding.probability, finding.severity);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bar and subscriber setup
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: log file output for the CLI
//!
//! Library-only usage:
//!
//! ```toml
//! [dependencies]
//! dermascan = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod crop;
pub mod error;
pub mod gateway;
pub mod interpreter;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod workflow;

pub use config::{
    CropConfig, DermaScanConfig, DermaScanConfigBuilder, GatewayConfig, InterpretationThresholds,
    ProgressConfig,
};
pub use crop::{CropTransformEngine, NativeRect};
pub use error::{DermaScanError, Result};
pub use gateway::{ClassificationGateway, HttpGateway, MockGateway, MockOutcome};
pub use interpreter::ResultInterpreter;
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTicker, ProgressUpdate, ReportIOService,
};
pub use types::{
    AnalysisData, AnalysisSummary, ClassificationResult, CropRegion, CroppedImage, Finding,
    ModelInfo, Product, ReportDocument, ServiceStatus, Severity, SourceImage,
};
pub use workflow::{AnalysisWorkflowController, Dispatch, Notification, WorkflowState};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingGuard, TracingOutput};

use std::path::Path;
use std::sync::Arc;

/// Crop, classify and summarize one image file against the configured service
///
/// The image is treated as displayed at native size, so `region` is in native
/// pixels. `None` selects the default centered square.
///
/// # Examples
/// ```rust,no_run
/// use dermascan::{analyze_image_file, DermaScanConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let summary = analyze_image_file("lesion.png", None, &DermaScanConfig::default()).await?;
/// println!("{}", summary.overall);
/// # Ok(())
/// # }
/// ```
pub async fn analyze_image_file<P: AsRef<Path>>(
    path: P,
    region: Option<CropRegion>,
    config: &DermaScanConfig,
) -> Result<AnalysisSummary> {
    let source = ImageIOService::load_source_image(path, None)?;
    let gateway = Arc::new(HttpGateway::new(config.gateway.clone())?);
    analyze_source(gateway, source, region, config).await
}

/// Same as [`analyze_image_file`] with an injected gateway and decoded image
pub async fn analyze_source(
    gateway: Arc<dyn ClassificationGateway>,
    source: SourceImage,
    region: Option<CropRegion>,
    config: &DermaScanConfig,
) -> Result<AnalysisSummary> {
    let controller = AnalysisWorkflowController::with_reporter(
        gateway,
        config.clone(),
        Arc::new(ConsoleProgressReporter::new(false)),
    );
    controller.select_image(source).await;

    let region = match region {
        Some(region) => region,
        None => controller
            .default_crop_region()
            .await
            .ok_or_else(|| DermaScanError::invalid_image("no image selected"))?,
    };
    controller.finalize_crop(region).await?;

    match controller.analyze().await? {
        Dispatch::Completed(summary) => Ok(summary),
        Dispatch::Ignored | Dispatch::Superseded => Err(DermaScanError::invalid_config(
            "analysis did not settle on this session",
        )),
    }
}
