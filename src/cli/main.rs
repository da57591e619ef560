//! Skin analysis CLI
//!
//! Crops a photograph, classifies the region through the remote service and
//! prints findings, recommendations and product suggestions. Optionally
//! downloads the printable report.

use super::config::CliConfigBuilder;
use crate::{
    error::DermaScanError,
    gateway::{ClassificationGateway, HttpGateway},
    services::{ImageIOService, ProcessingStage, ProgressReporter, ProgressUpdate},
    tracing_config::{init_cli_tracing, spans, TracingFormat, TracingOutput},
    types::{AnalysisSummary, CropRegion},
    workflow::{AnalysisWorkflowController, Dispatch, WorkflowState},
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Instrument};

/// Skin image analysis client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "dermascan")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Photograph of the skin area to analyze
    #[arg(value_name = "IMAGE")]
    pub image: Option<PathBuf>,

    /// Crop rectangle in display pixels as X,Y,W,H [default: centered square, half the shorter side]
    #[arg(long, value_name = "X,Y,W,H", allow_hyphen_values = true)]
    pub crop: Option<String>,

    /// Size the image is displayed at, as WIDTHxHEIGHT [default: native size]
    #[arg(long, value_name = "WxH")]
    pub display_size: Option<String>,

    /// Classification service base URL [default: http://localhost:5000/api]
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// JPEG quality for the uploaded crop (1-100) [default: 90]
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Generate and download a PDF report after the analysis
    #[arg(long)]
    pub report: bool,

    /// Patient name printed on the report
    #[arg(long)]
    pub patient_name: Option<String>,

    /// Directory for downloaded reports [default: user download folder]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name for the downloaded report [default: medical_report_<timestamp>.pdf]
    #[arg(long, value_name = "NAME")]
    pub report_name: Option<String>,

    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,

    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Check whether the classification service is reachable and exit
    #[arg(long)]
    pub check_service: bool,

    /// Show the deployed model and exit
    #[arg(long)]
    pub model_info: bool,

    /// Log output format: console, compact or json (json needs the tracing-json feature)
    #[arg(long, value_name = "FORMAT", default_value = "console")]
    pub log_format: String,

    /// Write logs to this file instead of stderr (needs the tracing-files feature)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Progress reporter drawing an indicatif bar for the analyzing stage
pub struct IndicatifProgressReporter {
    bar: ProgressBar,
}

impl IndicatifProgressReporter {
    #[must_use]
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new(100);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for IndicatifProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.bar.set_position(u64::from(update.progress));
        self.bar.set_message(update.description);
    }

    fn report_transition(&self, from: WorkflowState, to: WorkflowState) {
        debug!(%from, %to, "Workflow transition");
        if to == WorkflowState::Analyzing {
            self.bar.reset();
            self.bar.set_message(ProcessingStage::Analyzing.description());
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.bar.abandon_with_message(format!("{} failed", stage.description()));
        tracing::error!(stage = ?stage, "{}", error);
    }
}

#[derive(Serialize)]
struct CliOutput<'a> {
    summary: &'a AnalysisSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_path: Option<&'a PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_error: Option<String>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let session_id = uuid::Uuid::new_v4().to_string();

    let log_format = TracingFormat::from_name(&cli.log_format).context("Invalid --log-format")?;
    let log_output =
        TracingOutput::for_log_file(cli.log_file.as_deref()).context("Invalid --log-file")?;
    let _tracing_guard = init_cli_tracing(cli.verbose, &session_id, log_format, log_output)
        .context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let span = spans::session(&session_id, &config.gateway.base_url);
    run(cli, config).instrument(span).await
}

async fn run(cli: Cli, config: crate::config::DermaScanConfig) -> Result<()> {
    let gateway = Arc::new(
        HttpGateway::new(config.gateway.clone()).context("Failed to create HTTP client")?,
    );

    if cli.check_service {
        let status = gateway.probe().await;
        if status.is_available() {
            println!("Classification service at {} is available", config.gateway.base_url);
            return Ok(());
        }
        bail!("Classification service at {} is unavailable", config.gateway.base_url);
    }

    if cli.model_info {
        let model = gateway.model_info().await.context("Failed to get model info")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&model)?);
        } else {
            println!("Model:   {}", model.model_type);
            println!("Device:  {}", model.device);
            println!("Classes: {} ({})", model.num_classes, model.class_names.join(", "));
        }
        return Ok(());
    }

    let Some(image_path) = cli.image.as_ref() else {
        bail!("An input image is required");
    };

    let display_size = cli
        .display_size
        .as_deref()
        .map(CliConfigBuilder::parse_display_size)
        .transpose()?;

    let reporter = Arc::new(IndicatifProgressReporter::new(!cli.json));
    let controller =
        AnalysisWorkflowController::with_reporter(gateway, config, reporter.clone());

    let cropped = async {
        let source = ImageIOService::load_source_image(image_path, display_size)
            .with_context(|| format!("Failed to load {}", image_path.display()))?;
        let (native_w, native_h) = source.native_size();
        info!(native_w, native_h, "Loaded image");
        controller.select_image(source).await;

        let region = match &cli.crop {
            Some(spec) => CropRegion::parse(spec)?,
            None => controller
                .default_crop_region()
                .await
                .context("No image selected")?,
        };
        info!(%region, "Cropping");
        controller.start_crop().await?;
        controller.finalize_crop(region).await.context("Failed to crop image")
    }
    .instrument(spans::image_processing(image_path))
    .await?;
    debug!(width = cropped.width, height = cropped.height, "Crop ready");

    let outcome = controller.analyze().await;
    reporter.finish();
    let summary = match outcome.context("Analysis failed")? {
        Dispatch::Completed(summary) => summary,
        Dispatch::Ignored | Dispatch::Superseded => bail!("Analysis did not complete"),
    };

    let report = if cli.report {
        let outcome = controller
            .request_report(cli.patient_name.as_deref(), cli.report_name.as_deref())
            .instrument(spans::report(cli.patient_name.as_deref()))
            .await;
        match outcome {
            Ok(dispatch) => dispatch.completed().map_or(ReportOutcome::Skipped, ReportOutcome::Saved),
            Err(error) => ReportOutcome::Failed(error),
        }
    } else {
        ReportOutcome::Skipped
    };

    // The analysis is always shown, even when the report step failed
    println!("{}", render_output(&summary, &report, cli.json)?.trim_end());

    if let ReportOutcome::Failed(error) = report {
        return Err(anyhow::Error::new(error).context("Report was not saved"));
    }
    Ok(())
}

/// Result of the optional report step
#[derive(Debug)]
enum ReportOutcome {
    Skipped,
    Saved(PathBuf),
    Failed(DermaScanError),
}

fn render_output(summary: &AnalysisSummary, report: &ReportOutcome, json: bool) -> Result<String> {
    if json {
        let report_error = match report {
            ReportOutcome::Failed(error) => Some(error.to_string()),
            ReportOutcome::Skipped | ReportOutcome::Saved(_) => None,
        };
        let output = CliOutput {
            summary,
            report_path: match report {
                ReportOutcome::Saved(path) => Some(path),
                ReportOutcome::Skipped | ReportOutcome::Failed(_) => None,
            },
            report_error,
        };
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let mut out = render_summary(summary)?;
    match report {
        ReportOutcome::Saved(path) => {
            writeln!(out)?;
            write!(out, "Report saved to {}", path.display())?;
        },
        ReportOutcome::Failed(error) => {
            writeln!(out)?;
            write!(out, "Report generation failed: {} (the analysis above is unaffected)", error)?;
        },
        ReportOutcome::Skipped => {},
    }
    Ok(out)
}

fn render_summary(summary: &AnalysisSummary) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{} ({}% confidence)", summary.overall, summary.confidence)?;
    if !summary.meets_threshold {
        writeln!(out, "Low confidence result; consider consulting a dermatologist.")?;
    }

    writeln!(out)?;
    writeln!(out, "Findings:")?;
    for finding in &summary.findings {
        writeln!(
            out,
            "  {:<24} {:>3}%  {}",
            finding.condition, finding.probability, finding.severity
        )?;
    }

    writeln!(out)?;
    writeln!(out, "Recommendations:")?;
    for (i, recommendation) in summary.recommendations.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, recommendation)?;
    }

    writeln!(out)?;
    writeln!(out, "Suggested products:")?;
    for product in &summary.products {
        writeln!(
            out,
            "  {} by {} ({:.1}/5, {})",
            product.name, product.brand, product.rating, product.price
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "dermascan",
            "arm.jpg",
            "--crop",
            "100,100,200,200",
            "--display-size",
            "800x600",
            "--report",
            "--patient-name",
            "Jane Doe",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.image, Some(PathBuf::from("arm.jpg")));
        assert_eq!(cli.crop.as_deref(), Some("100,100,200,200"));
        assert!(cli.report);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, "console");
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn test_cli_parses_log_options() {
        let cli = Cli::try_parse_from([
            "dermascan",
            "--check-service",
            "--log-format",
            "compact",
            "--log-file",
            "/tmp/dermascan.log",
        ])
        .unwrap();
        assert_eq!(TracingFormat::from_name(&cli.log_format).unwrap(), TracingFormat::Compact);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/dermascan.log")));
    }

    fn sample_summary() -> AnalysisSummary {
        crate::ResultInterpreter::default().summarize(&crate::MockGateway::sample_result())
    }

    #[test]
    fn test_failed_report_still_shows_analysis() {
        let report = ReportOutcome::Failed(DermaScanError::report_failed(
            "Report generation failed: Internal Server Error",
        ));
        let text = render_output(&sample_summary(), &report, false).unwrap();
        assert!(text.starts_with("Acne Detected (82% confidence)"));
        assert!(text.contains("Recommendations:"));
        assert!(text.contains("Report generation failed: Internal Server Error"));
        assert!(!text.contains("Report saved to"));
    }

    #[test]
    fn test_failed_report_json_keeps_summary() {
        let report = ReportOutcome::Failed(DermaScanError::report_failed("Invalid image data"));
        let json = render_output(&sample_summary(), &report, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["overall"], "Acne Detected");
        assert_eq!(value["report_error"], "Invalid image data");
        assert!(value.get("report_path").is_none());
    }

    #[test]
    fn test_saved_report_output() {
        let report = ReportOutcome::Saved(PathBuf::from("/tmp/medical_report.pdf"));
        let text = render_output(&sample_summary(), &report, false).unwrap();
        assert!(text.contains("Report saved to /tmp/medical_report.pdf"));

        let json = render_output(&sample_summary(), &ReportOutcome::Skipped, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("report_path").is_none());
        assert!(value.get("report_error").is_none());
    }

    #[test]
    fn test_hidden_reporter_accepts_updates() {
        let reporter = IndicatifProgressReporter::new(false);
        reporter.report_progress(ProgressUpdate::new(
            ProcessingStage::Analyzing,
            40,
            tokio::time::Instant::now(),
        ));
        reporter.report_transition(WorkflowState::Cropped, WorkflowState::Analyzing);
        reporter.finish();
    }
}
