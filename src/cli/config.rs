//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{config::DermaScanConfig, types::CropRegion};
use anyhow::{bail, Context, Result};

/// Convert CLI arguments to a validated `DermaScanConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and apply flag overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<DermaScanConfig> {
        let mut config = match &cli.config {
            Some(path) => DermaScanConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => DermaScanConfig::default(),
        };

        if let Some(url) = &cli.api_url {
            config.gateway.base_url = url.clone();
        }
        if let Some(timeout) = cli.timeout {
            config.gateway.timeout_secs = timeout;
        }
        if let Some(dir) = &cli.output_dir {
            config.gateway.download_dir = Some(dir.clone());
        }
        if let Some(quality) = cli.jpeg_quality {
            config.crop.jpeg_quality = quality;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate flag combinations clap cannot express
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.image.is_none() && !(cli.check_service || cli.model_info) {
            bail!("An input image is required unless --check-service or --model-info is given");
        }
        if (cli.patient_name.is_some() || cli.report_name.is_some()) && !cli.report {
            bail!("--patient-name and --report-name require --report");
        }
        if let Some(crop) = &cli.crop {
            CropRegion::parse(crop).context("Invalid --crop")?;
        }
        if let Some(size) = &cli.display_size {
            Self::parse_display_size(size)?;
        }
        Ok(())
    }

    /// Parse `WIDTHxHEIGHT`
    pub(crate) fn parse_display_size(spec: &str) -> Result<(f64, f64)> {
        let Some((w, h)) = spec.split_once(|c: char| c == 'x' || c == 'X') else {
            bail!("Display size must look like 800x600 (got '{}')", spec);
        };
        let width: f64 = w.trim().parse().with_context(|| format!("Invalid display width '{}'", w))?;
        let height: f64 = h.trim().parse().with_context(|| format!("Invalid display height '{}'", h))?;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            bail!("Display size must be positive (got '{}')", spec);
        }
        Ok((width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dermascan").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_display_size_parsing() {
        assert_eq!(CliConfigBuilder::parse_display_size("800x600").unwrap(), (800.0, 600.0));
        assert_eq!(CliConfigBuilder::parse_display_size("640.5X480").unwrap(), (640.5, 480.0));
        assert!(CliConfigBuilder::parse_display_size("800").is_err());
        assert!(CliConfigBuilder::parse_display_size("0x600").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "photo.jpg",
            "--api-url",
            "https://derma.example.org/api",
            "--output-dir",
            "/tmp/reports",
            "--jpeg-quality",
            "75",
        ]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.gateway.base_url, "https://derma.example.org/api");
        assert_eq!(config.gateway.download_dir, Some(PathBuf::from("/tmp/reports")));
        assert_eq!(config.crop.jpeg_quality, 75);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"gateway": {{"base_url": "http://10.0.0.2:5000/api", "timeout_secs": 30}}}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = parse(&["photo.jpg", "--config", &path, "--timeout", "10"]);
        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.gateway.base_url, "http://10.0.0.2:5000/api");
        assert_eq!(config.gateway.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let cli = parse(&["photo.jpg", "--jpeg-quality", "0"]);
        assert!(CliConfigBuilder::from_cli(&cli).is_err());
    }

    #[test]
    fn test_validate_cli_combinations() {
        assert!(CliConfigBuilder::validate_cli(&parse(&["--check-service"])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&[])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["a.jpg", "--patient-name", "Jane"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&parse(&["a.jpg", "--report", "--patient-name", "Jane"])).is_ok());
        assert!(CliConfigBuilder::validate_cli(&parse(&["a.jpg", "--crop", "1,2,3"])).is_err());
    }
}
