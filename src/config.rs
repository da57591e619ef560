//! Configuration types for the analysis workflow
//!
//! All thresholds and timings are plain configuration. None of them is derived
//! from clinical validation; they reproduce the behavior of the hosted service.

use crate::error::{DermaScanError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default classification service endpoint
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Fixed lossy quality for cropped uploads (the 0.9 factor on a 0-100 scale)
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Connection settings for the remote classification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL including the `/api` prefix
    pub base_url: String,
    /// Request timeout in seconds (applies to every call)
    pub timeout_secs: u64,
    /// Directory for downloaded reports (None = user download folder)
    pub download_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 120,
            download_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Resolve the effective download directory
    #[must_use]
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Crop engine settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Minimum crop width in display pixels
    pub min_width: f64,
    /// Minimum crop height in display pixels
    pub min_height: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            min_width: 100.0,
            min_height: 100.0,
        }
    }
}

/// Probability thresholds used by the result interpreter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretationThresholds {
    /// Lower bound (inclusive) of the High severity band
    pub high_severity: f64,
    /// Lower bound (inclusive) of the Medium severity band
    pub medium_severity: f64,
    /// Minimum confidence (inclusive) for the advisory threshold flag
    pub confidence: f64,
}

impl Default for InterpretationThresholds {
    fn default() -> Self {
        Self {
            high_severity: 0.7,
            medium_severity: 0.4,
            confidence: 0.7,
        }
    }
}

/// Synthetic progress counter settings for the analyzing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Increment per tick (percent)
    pub step: u8,
    /// Tick interval in milliseconds
    pub interval_ms: u64,
    /// Ceiling while the remote call is outstanding (percent)
    pub cap: u8,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            step: 10,
            interval_ms: 300,
            cap: 90,
        }
    }
}

/// Complete configuration for an analysis session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DermaScanConfig {
    pub gateway: GatewayConfig,
    pub crop: CropConfig,
    pub thresholds: InterpretationThresholds,
    pub progress: ProgressConfig,
}

impl DermaScanConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use dermascan::DermaScanConfig;
    ///
    /// let config = DermaScanConfig::builder()
    ///     .base_url("http://10.0.0.5:5000/api")
    ///     .jpeg_quality(85)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.crop.jpeg_quality, 85);
    /// ```
    #[must_use]
    pub fn builder() -> DermaScanConfigBuilder {
        DermaScanConfigBuilder::default()
    }

    /// Load configuration from a JSON file; missing sections take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DermaScanError::file_io_error("read config file", path, &e))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Empty or non-HTTP base URL, zero timeout
    /// - JPEG quality outside 1-100
    /// - Non-positive minimum crop size
    /// - Thresholds outside [0, 1] or medium band above the high band
    /// - Zero progress step/interval or cap above 100
    pub fn validate(&self) -> Result<()> {
        let url = self.gateway.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DermaScanError::invalid_config(format!(
                "base URL must start with http:// or https:// (got '{}')",
                self.gateway.base_url
            )));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(DermaScanError::config_value_error(
                "request timeout",
                0,
                "1+ seconds",
                Some(120),
            ));
        }

        if !(1..=100).contains(&self.crop.jpeg_quality) {
            return Err(DermaScanError::config_value_error(
                "JPEG quality",
                self.crop.jpeg_quality,
                "1-100",
                Some(DEFAULT_JPEG_QUALITY),
            ));
        }
        if self.crop.min_width <= 0.0 || self.crop.min_height <= 0.0 {
            return Err(DermaScanError::invalid_config(
                "minimum crop size must be positive",
            ));
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("high severity threshold", t.high_severity),
            ("medium severity threshold", t.medium_severity),
            ("confidence threshold", t.confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DermaScanError::config_value_error(name, value, "0.0-1.0", None));
            }
        }
        if t.medium_severity > t.high_severity {
            return Err(DermaScanError::invalid_config(
                "medium severity threshold must not exceed the high severity threshold",
            ));
        }

        let p = &self.progress;
        if p.step == 0 || p.interval_ms == 0 {
            return Err(DermaScanError::invalid_config(
                "progress step and interval must be non-zero",
            ));
        }
        if p.cap > 100 {
            return Err(DermaScanError::config_value_error("progress cap", p.cap, "0-100", Some(90)));
        }

        Ok(())
    }
}

/// Builder for `DermaScanConfig`
#[derive(Debug, Default)]
pub struct DermaScanConfigBuilder {
    config: DermaScanConfig,
}

impl DermaScanConfigBuilder {
    /// Set service base URL
    #[must_use]
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.gateway.base_url = url.into();
        self
    }

    /// Set request timeout
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.gateway.timeout_secs = secs;
        self
    }

    /// Set report download directory
    #[must_use]
    pub fn download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.gateway.download_dir = Some(dir.into());
        self
    }

    /// Set JPEG quality (clamped to 1-100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.crop.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set minimum crop size in display pixels
    #[must_use]
    pub fn min_crop_size(mut self, width: f64, height: f64) -> Self {
        self.config.crop.min_width = width;
        self.config.crop.min_height = height;
        self
    }

    /// Set interpretation thresholds
    #[must_use]
    pub fn thresholds(mut self, thresholds: InterpretationThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// Set progress simulation parameters
    #[must_use]
    pub fn progress(mut self, progress: ProgressConfig) -> Self {
        self.config.progress = progress;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<DermaScanConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = DermaScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.crop.jpeg_quality, 90);
        assert_eq!(config.progress.cap, 90);
    }

    #[test]
    fn test_builder_clamps_quality() {
        let config = DermaScanConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(config.crop.jpeg_quality, 1);
        let config = DermaScanConfig::builder().jpeg_quality(200).build().unwrap();
        assert_eq!(config.crop.jpeg_quality, 100);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = DermaScanConfig::default();
        config.gateway.base_url = "localhost:5000".to_string();
        assert!(config.validate().is_err());

        let mut config = DermaScanConfig::default();
        config.crop.jpeg_quality = 101;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("JPEG quality"));
        assert!(err.contains("1-100"));

        let mut config = DermaScanConfig::default();
        config.thresholds.medium_severity = 0.8;
        assert!(config.validate().is_err());

        let mut config = DermaScanConfig::default();
        config.progress.step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"gateway": {{"base_url": "https://derma.example.org/api"}}, "thresholds": {{"confidence": 0.8}}}}"#
        )
        .unwrap();

        let config = DermaScanConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.gateway.base_url, "https://derma.example.org/api");
        assert_eq!(config.gateway.timeout_secs, 120);
        assert!((config.thresholds.confidence - 0.8).abs() < f64::EPSILON);
        assert!((config.thresholds.high_severity - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_explicit_download_dir_wins() {
        let config = DermaScanConfig::builder().download_dir("/tmp/reports").build().unwrap();
        assert_eq!(
            config.gateway.resolved_download_dir(),
            PathBuf::from("/tmp/reports")
        );
    }
}
