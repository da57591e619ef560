//! Core data types for the skin analysis workflow

use crate::error::{DermaScanError, Result};
use base64::Engine as _;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Decoded raster image together with the size it is displayed at
///
/// Native dimensions always come from the decoded pixels; display dimensions
/// describe the on-screen rendering the user drew a crop rectangle on.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: Arc<DynamicImage>,
    display_width: f64,
    display_height: f64,
}

impl SourceImage {
    /// Wrap a decoded image rendered at `display_width` x `display_height`
    ///
    /// # Errors
    /// - Zero-sized decoded image
    /// - Non-positive or non-finite display dimensions
    pub fn new(image: DynamicImage, display_width: f64, display_height: f64) -> Result<Self> {
        let (native_width, native_height) = image.dimensions();
        if native_width == 0 || native_height == 0 {
            return Err(DermaScanError::invalid_image("decoded image has no pixels"));
        }
        if !(display_width.is_finite() && display_height.is_finite())
            || display_width <= 0.0
            || display_height <= 0.0
        {
            return Err(DermaScanError::invalid_image(format!(
                "display size must be positive (got {}x{})",
                display_width, display_height
            )));
        }

        Ok(Self {
            image: Arc::new(image),
            display_width,
            display_height,
        })
    }

    /// Wrap an image displayed at its native resolution
    pub fn at_native_size(image: DynamicImage) -> Result<Self> {
        let (w, h) = image.dimensions();
        Self::new(image, f64::from(w), f64::from(h))
    }

    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    #[must_use]
    pub fn display_size(&self) -> (f64, f64) {
        (self.display_width, self.display_height)
    }

    #[must_use]
    pub fn native_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Axis-aligned rectangle in display pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Centered square covering `fraction` of the shorter display side
    #[must_use]
    pub fn centered_square(display_width: f64, display_height: f64, fraction: f64) -> Self {
        let side = display_width.min(display_height) * fraction.clamp(0.0, 1.0);
        Self {
            x: (display_width - side) / 2.0,
            y: (display_height - side) / 2.0,
            width: side,
            height: side,
        }
    }

    /// Parse `X,Y,W,H`
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<f64> = spec
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| {
                DermaScanError::invalid_config(format!("invalid crop '{}': {}", spec, e))
            })?;
        match parts.as_slice() {
            [x, y, w, h] => Ok(Self::new(*x, *y, *w, *h)),
            _ => Err(DermaScanError::invalid_config(format!(
                "crop must have 4 comma-separated values X,Y,W,H (got '{}')",
                spec
            ))),
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Encoded native-resolution pixels of a finalized crop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CroppedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

impl CroppedImage {
    /// Encode as a `data:` URL, the wire format expected by the service
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Raw output of one classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Condition name to probability in [0, 1]
    pub predictions: BTreeMap<String, f64>,
    pub primary_condition: String,
    pub confidence: f64,
    /// Label order used by the model
    #[serde(default)]
    pub class_names: Vec<String>,
}

/// Presentation band derived from a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// One user-facing line of the analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub condition: String,
    /// Integer percent, 0-100
    pub probability: u8,
    pub severity: Severity,
}

/// Suggested skincare product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub brand: String,
    pub rating: f64,
    pub price: String,
}

/// Aggregate view consumed by the presentation layer and report generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// `"<primary condition> Detected"`
    pub overall: String,
    pub primary_condition: String,
    /// Integer percent, 0-100
    pub confidence: u8,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub products: Vec<Product>,
    pub meets_threshold: bool,
}

/// `analysis_data` payload of a report request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    pub predictions: BTreeMap<String, f64>,
    pub primary_condition: String,
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub products: Vec<Product>,
}

/// Opaque binary document returned by the report endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl ReportDocument {
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Outcome of a liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Available,
    Unavailable,
}

impl ServiceStatus {
    #[must_use]
    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

/// `GET /model-info` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub device: String,
}
