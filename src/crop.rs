//! Display-space crop to native-resolution JPEG extraction
//!
//! The user draws a rectangle over a possibly downscaled on-screen rendering.
//! This module maps that rectangle into the decoded image's pixel grid with
//! independent horizontal and vertical scale factors, copies the covered
//! native pixels onto a fresh surface and encodes them with fixed JPEG
//! parameters, so identical inputs always produce identical bytes.

use crate::{
    config::CropConfig,
    error::{DermaScanError, Result},
    types::{CropRegion, CroppedImage, SourceImage},
};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, GenericImageView, Pixel, RgbImage};
use tracing::{debug, instrument};

/// Slack for floating-point edge comparisons, in pixels
const EDGE_TOLERANCE: f64 = 1e-6;

/// Rectangle in native pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Converts display-space crop rectangles into encoded native-resolution crops
#[derive(Debug, Clone, Copy, Default)]
pub struct CropTransformEngine {
    config: CropConfig,
}

impl CropTransformEngine {
    #[must_use]
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    /// Check minimum size and display-space containment
    ///
    /// # Errors
    /// - `CropTooSmall` when either side is below the configured minimum
    /// - `OutOfBoundsCrop` for non-finite values, a negative origin, or a
    ///   rectangle extending past the display bounds
    pub fn validate_region(&self, image: &SourceImage, region: &CropRegion) -> Result<()> {
        let values = [region.x, region.y, region.width, region.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DermaScanError::out_of_bounds(format!(
                "crop {} has non-finite coordinates",
                region
            )));
        }

        if region.width < self.config.min_width || region.height < self.config.min_height {
            return Err(DermaScanError::CropTooSmall(format!(
                "{}x{} is below the {}x{} minimum",
                region.width, region.height, self.config.min_width, self.config.min_height
            )));
        }

        let (display_width, display_height) = image.display_size();
        if region.x < -EDGE_TOLERANCE
            || region.y < -EDGE_TOLERANCE
            || region.right() > display_width + EDGE_TOLERANCE
            || region.bottom() > display_height + EDGE_TOLERANCE
        {
            return Err(DermaScanError::out_of_bounds(format!(
                "crop {} exceeds display bounds {}x{}",
                region, display_width, display_height
            )));
        }

        Ok(())
    }

    /// Map a display-space rectangle into native pixel space
    ///
    /// Each of `x, y, width, height` is multiplied by its axis scale factor and
    /// rounded. Requests reaching outside the native image are rejected rather
    /// than clipped; a rounding overhang below one pixel is absorbed by moving
    /// the origin, which keeps the output size exactly `round(w*sx) x round(h*sy)`.
    pub fn native_rect(image: &SourceImage, region: &CropRegion) -> Result<NativeRect> {
        let (display_width, display_height) = image.display_size();
        let (native_width, native_height) = image.native_size();
        let scale_x = f64::from(native_width) / display_width;
        let scale_y = f64::from(native_height) / display_height;

        let left = region.x * scale_x;
        let top = region.y * scale_y;
        let width = region.width * scale_x;
        let height = region.height * scale_y;

        if left < -EDGE_TOLERANCE
            || top < -EDGE_TOLERANCE
            || left + width > f64::from(native_width) + EDGE_TOLERANCE
            || top + height > f64::from(native_height) + EDGE_TOLERANCE
        {
            return Err(DermaScanError::out_of_bounds(format!(
                "native rectangle {:.1}x{:.1}+{:.1}+{:.1} exceeds {}x{}",
                width, height, left, top, native_width, native_height
            )));
        }

        let rect_width = width.round().max(0.0) as u32;
        let rect_height = height.round().max(0.0) as u32;
        if rect_width == 0 || rect_height == 0 {
            return Err(DermaScanError::NoRenderingContext(format!(
                "crop {} maps to an empty native surface",
                region
            )));
        }

        let rect_x = (left.round().max(0.0) as u32).min(native_width.saturating_sub(rect_width));
        let rect_y = (top.round().max(0.0) as u32).min(native_height.saturating_sub(rect_height));

        Ok(NativeRect {
            x: rect_x,
            y: rect_y,
            width: rect_width.min(native_width),
            height: rect_height.min(native_height),
        })
    }

    /// Extract the native pixels under `region` and encode them as JPEG
    ///
    /// # Errors
    /// - `CropTooSmall` / `OutOfBoundsCrop` from region validation
    /// - `NoRenderingContext` when the output surface cannot be allocated
    /// - `EncodingFailed` when the encoder fails or writes nothing
    #[instrument(level = "debug", skip(self, image, region), fields(region = %region))]
    pub fn extract_region(
        &self,
        image: &SourceImage,
        region: &CropRegion,
        quality: u8,
    ) -> Result<CroppedImage> {
        if !(1..=100).contains(&quality) {
            return Err(DermaScanError::config_value_error(
                "JPEG quality",
                quality,
                "1-100",
                Some(crate::config::DEFAULT_JPEG_QUALITY),
            ));
        }

        self.validate_region(image, region)?;
        let rect = Self::native_rect(image, region)?;
        debug!(
            x = rect.x,
            y = rect.y,
            width = rect.width,
            height = rect.height,
            "Mapped crop to native space"
        );

        let surface = render_surface(image.image(), rect)?;
        let bytes = encode_jpeg(&surface, quality)?;

        debug!(encoded_bytes = bytes.len(), "Encoded cropped region");
        Ok(CroppedImage {
            bytes,
            width: rect.width,
            height: rect.height,
            mime_type: "image/jpeg",
        })
    }
}

/// Copy `rect` of `source` onto a newly allocated RGB surface
fn render_surface(source: &DynamicImage, rect: NativeRect) -> Result<RgbImage> {
    let len = (rect.width as usize)
        .checked_mul(rect.height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| {
            DermaScanError::NoRenderingContext(format!(
                "{}x{} surface size overflows",
                rect.width, rect.height
            ))
        })?;

    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(len).map_err(|e| {
        DermaScanError::NoRenderingContext(format!(
            "cannot allocate {}x{} surface: {}",
            rect.width, rect.height, e
        ))
    })?;
    buffer.resize(len, 0);

    let mut surface = RgbImage::from_raw(rect.width, rect.height, buffer).ok_or_else(|| {
        DermaScanError::NoRenderingContext("surface buffer size mismatch".to_string())
    })?;

    let view = source.view(rect.x, rect.y, rect.width, rect.height);
    for (dx, dy, pixel) in view.pixels() {
        surface.put_pixel(dx, dy, pixel.to_rgb());
    }

    Ok(surface)
}

fn encode_jpeg(surface: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
        encoder
            .encode_image(surface)
            .map_err(|e| DermaScanError::EncodingFailed(format!("JPEG encoder: {}", e)))?;
    }

    if bytes.is_empty() {
        return Err(DermaScanError::EncodingFailed(
            "encoder produced no output".to_string(),
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn source(native: (u32, u32), display: (f64, f64)) -> SourceImage {
        let img = RgbImage::from_fn(native.0, native.1, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        SourceImage::new(DynamicImage::ImageRgb8(img), display.0, display.1).unwrap()
    }

    #[test]
    fn test_uniform_scale_mapping() {
        let image = source((3200, 2400), (800.0, 600.0));
        let rect =
            CropTransformEngine::native_rect(&image, &CropRegion::new(100.0, 100.0, 200.0, 200.0))
                .unwrap();
        assert_eq!(
            rect,
            NativeRect {
                x: 400,
                y: 400,
                width: 800,
                height: 800
            }
        );
    }

    #[test]
    fn test_non_uniform_scale_mapping() {
        let image = source((1000, 300), (500.0, 300.0));
        let rect =
            CropTransformEngine::native_rect(&image, &CropRegion::new(50.0, 20.0, 100.0, 100.0))
                .unwrap();
        assert_eq!(rect.x, 100);
        assert_eq!(rect.y, 20);
        assert_eq!(rect.width, 200);
        assert_eq!(rect.height, 100);
    }

    #[test]
    fn test_rounding_overhang_is_absorbed() {
        // 0.5 * 3 = 1.5 rounds to 2, 99.5 * 3 = 298.5 rounds to 299: 2 + 299 > 300
        let image = source((300, 300), (100.0, 100.0));
        let rect =
            CropTransformEngine::native_rect(&image, &CropRegion::new(0.5, 0.5, 99.5, 99.5))
                .unwrap();
        assert_eq!(rect.width, 299);
        assert_eq!(rect.x + rect.width, 300);
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let engine = CropTransformEngine::default();
        let image = source((400, 400), (200.0, 200.0));
        let err = engine
            .extract_region(&image, &CropRegion::new(150.0, 0.0, 100.0, 100.0), 90)
            .unwrap_err();
        assert!(matches!(err, DermaScanError::OutOfBoundsCrop(_)));

        let err = engine
            .extract_region(&image, &CropRegion::new(-1.0, 0.0, 100.0, 100.0), 90)
            .unwrap_err();
        assert!(matches!(err, DermaScanError::OutOfBoundsCrop(_)));
    }

    #[test]
    fn test_too_small_is_rejected() {
        let engine = CropTransformEngine::default();
        let image = source((400, 400), (400.0, 400.0));
        let err = engine
            .extract_region(&image, &CropRegion::new(0.0, 0.0, 99.0, 200.0), 90)
            .unwrap_err();
        assert!(matches!(err, DermaScanError::CropTooSmall(_)));
    }

    #[test]
    fn test_invalid_quality_is_rejected() {
        let engine = CropTransformEngine::default();
        let image = source((400, 400), (400.0, 400.0));
        let err = engine
            .extract_region(&image, &CropRegion::new(0.0, 0.0, 100.0, 100.0), 0)
            .unwrap_err();
        assert!(matches!(err, DermaScanError::InvalidConfig(_)));
    }

    #[test]
    fn test_output_is_jpeg_with_native_dimensions() {
        let engine = CropTransformEngine::default();
        let image = source((640, 480), (320.0, 240.0));
        let cropped = engine
            .extract_region(&image, &CropRegion::new(10.0, 20.0, 150.0, 120.0), 90)
            .unwrap();

        assert_eq!(cropped.dimensions(), (300, 240));
        assert_eq!(cropped.mime_type, "image/jpeg");
        assert_eq!(&cropped.bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&cropped.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (300, 240));
    }

    #[test]
    fn test_copied_pixels_come_from_native_region() {
        // Left half red, right half blue; crop the right half only
        let img = RgbImage::from_fn(400, 200, |x, _| {
            if x < 200 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let image = SourceImage::new(DynamicImage::ImageRgb8(img), 200.0, 100.0).unwrap();
        let engine = CropTransformEngine::default();
        let cropped = engine
            .extract_region(&image, &CropRegion::new(100.0, 0.0, 100.0, 100.0), 95)
            .unwrap();

        let decoded = image::load_from_memory(&cropped.bytes).unwrap().to_rgb8();
        let center = decoded.get_pixel(100, 100);
        assert!(center[2] > 200, "expected blue, got {:?}", center);
        assert!(center[0] < 50, "expected blue, got {:?}", center);
    }
}
