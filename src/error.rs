//! Error types for skin-image analysis operations

use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, DermaScanError>;

/// Error taxonomy for the crop engine, the classification gateway and the workflow controller
#[derive(Error, Debug)]
pub enum DermaScanError {
    /// Crop rectangle maps outside the native image bounds
    #[error("Crop region out of bounds: {0}")]
    OutOfBoundsCrop(String),

    /// Crop rectangle smaller than the configured minimum
    #[error("Crop region too small: {0}")]
    CropTooSmall(String),

    /// Source image unusable (zero dimensions, undecodable data)
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Drawing surface for the cropped pixels could not be allocated
    #[error("No rendering context: {0}")]
    NoRenderingContext(String),

    /// Lossy encoder produced no output
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Service could not be reached at all (connection refused or timed out)
    #[error("Classification service unavailable: {0}")]
    Unavailable(String),

    /// Remote service refused or failed the classification request
    #[error("{0}")]
    ClassificationRejected(String),

    /// Remote service refused or failed the report request
    #[error("{0}")]
    ReportGenerationFailed(String),

    /// Analysis requested while the last probe marked the service unavailable
    #[error("Classification service is unavailable; check the connection and try again")]
    ServiceUnavailable,

    /// Operation not valid in the current workflow state
    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transport errors outside the classify/report contract
    #[error("Network error: {0}")]
    Network(String),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DermaScanError {
    /// Create a new out-of-bounds crop error
    pub fn out_of_bounds<S: Into<String>>(msg: S) -> Self {
        Self::OutOfBoundsCrop(msg.into())
    }

    /// Create a new invalid image error
    pub fn invalid_image<S: Into<String>>(msg: S) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new classification rejection
    pub fn classification_rejected<S: Into<String>>(reason: S) -> Self {
        Self::ClassificationRejected(reason.into())
    }

    /// Create a new report generation failure
    pub fn report_failed<S: Into<String>>(reason: S) -> Self {
        Self::ReportGenerationFailed(reason.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create network error with operation context
    pub fn network_error(operation: &str, error: &reqwest::Error) -> Self {
        Self::Network(format!("{}: {}", operation, error))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether the user can recover by simply repeating the action
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_)
                | Self::ClassificationRejected(_)
                | Self::ReportGenerationFailed(_)
                | Self::ServiceUnavailable
                | Self::Network(_)
        )
    }
}
