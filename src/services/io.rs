//! File I/O for source photographs and downloaded reports
//!
//! Kept apart from the workflow so the controller and the gateways never touch
//! the filesystem directly.

use crate::{
    error::{DermaScanError, Result},
    types::{ReportDocument, SourceImage},
};
use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::path::{Path, PathBuf};

/// Service for loading source images from disk
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content sniffing when the extension does not match the
    /// actual encoding (phone exports often carry the wrong suffix).
    ///
    /// # Examples
    /// ```rust,no_run
    /// use dermascan::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("forearm.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(DermaScanError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                tracing::debug!(
                    path = %path_ref.display(),
                    error = %e,
                    "Extension-based loading failed, attempting content-based detection"
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    DermaScanError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    DermaScanError::invalid_image(format!(
                        "Failed to load '{}' ({} bytes). Extension error: {}. Content error: {}",
                        path_ref.display(),
                        data.len(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Load an image and attach its display size
    ///
    /// `display_size` of `None` means the image is shown at native resolution.
    pub fn load_source_image<P: AsRef<Path>>(
        path: P,
        display_size: Option<(f64, f64)>,
    ) -> Result<SourceImage> {
        let image = Self::load_image(path)?;
        match display_size {
            Some((width, height)) => SourceImage::new(image, width, height),
            None => SourceImage::at_native_size(image),
        }
    }
}

/// Timestamped report name, `medical_report_<YYYYMMDDTHHMMSS>.pdf`
#[must_use]
pub fn default_report_filename(now: DateTime<Utc>) -> String {
    format!("medical_report_{}.pdf", now.format("%Y%m%dT%H%M%S"))
}

/// Service for persisting generated reports
pub struct ReportIOService;

impl ReportIOService {
    /// Write `report` into `dir`, creating the directory if needed
    ///
    /// Only the final path component of `suggested_name` is used, so a
    /// caller-supplied name can never escape `dir`.
    ///
    /// # Returns
    /// The full path of the written file
    pub fn save_report<P: AsRef<Path>>(
        report: &ReportDocument,
        dir: P,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let file_name = Self::resolve_file_name(suggested_name, Utc::now());

        std::fs::create_dir_all(dir)
            .map_err(|e| DermaScanError::file_io_error("create download directory", dir, &e))?;

        let path = dir.join(file_name);
        std::fs::write(&path, &report.bytes)
            .map_err(|e| DermaScanError::file_io_error("write report", &path, &e))?;

        tracing::info!(path = %path.display(), bytes = report.len(), "Report saved");
        Ok(path)
    }

    fn resolve_file_name(suggested_name: Option<&str>, now: DateTime<Utc>) -> String {
        suggested_name
            .map(str::trim)
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map_or_else(|| default_report_filename(now), str::to_string)
    }
}
