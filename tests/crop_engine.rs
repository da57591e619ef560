//! Integration tests for display-space to native-resolution cropping
//!
//! Covers scale invariance, determinism and bounds rejection using synthetic
//! images with known pixel patterns.

use dermascan::{
    config::CropConfig,
    crop::CropTransformEngine,
    error::DermaScanError,
    types::{CropRegion, SourceImage},
};
use image::{DynamicImage, GenericImageView, RgbImage};

/// Horizontal and vertical gradient so every crop has distinct content
fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let mut image = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ]);
    }
    DynamicImage::ImageRgb8(image)
}

fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).expect("crop output should decode")
}

#[test]
fn test_end_to_end_crop_dimensions() {
    let source = SourceImage::new(gradient_image(3200, 2400), 800.0, 600.0).unwrap();
    let engine = CropTransformEngine::default();

    let cropped = engine
        .extract_region(&source, &CropRegion::new(100.0, 100.0, 200.0, 200.0), 90)
        .unwrap();

    assert_eq!(cropped.dimensions(), (800, 800));
    assert_eq!(cropped.mime_type, "image/jpeg");
    assert_eq!(&cropped.bytes[..2], &[0xFF, 0xD8]);
    assert_eq!(decode(&cropped.bytes).dimensions(), (800, 800));
}

#[test]
fn test_scale_invariance_across_geometries() {
    let engine = CropTransformEngine::default();
    let cases = [
        // (native w, native h, display w, display h, region)
        (1000, 500, 1000.0, 500.0, CropRegion::new(10.0, 20.0, 150.0, 120.0)),
        (1200, 900, 400.0, 300.0, CropRegion::new(50.0, 40.0, 120.0, 100.0)),
        // Non-uniform scaling: 2x horizontally, 3x vertically
        (800, 900, 400.0, 300.0, CropRegion::new(0.0, 0.0, 100.0, 100.0)),
        (997, 601, 333.3, 200.7, CropRegion::new(12.3, 45.6, 111.1, 123.4)),
    ];

    for (nw, nh, dw, dh, region) in cases {
        let source = SourceImage::new(gradient_image(nw, nh), dw, dh).unwrap();
        let cropped = engine.extract_region(&source, &region, 90).unwrap();

        let expected_w = (region.width * f64::from(nw) / dw).round() as u32;
        let expected_h = (region.height * f64::from(nh) / dh).round() as u32;
        assert_eq!(
            cropped.dimensions(),
            (expected_w, expected_h),
            "native {}x{} display {}x{} region {}",
            nw,
            nh,
            dw,
            dh,
            region
        );
        assert_eq!(decode(&cropped.bytes).dimensions(), (expected_w, expected_h));
    }
}

#[test]
fn test_output_is_deterministic() {
    let source = SourceImage::new(gradient_image(640, 480), 320.0, 240.0).unwrap();
    let engine = CropTransformEngine::default();
    let region = CropRegion::new(30.0, 20.0, 150.0, 140.0);

    let first = engine.extract_region(&source, &region, 90).unwrap();
    let second = engine.extract_region(&source, &region, 90).unwrap();
    assert_eq!(first, second);

    let lower_quality = engine.extract_region(&source, &region, 40).unwrap();
    assert_eq!(lower_quality.dimensions(), first.dimensions());
    assert_ne!(lower_quality.bytes, first.bytes);
}

#[test]
fn test_regions_past_the_edge_are_rejected() {
    let source = SourceImage::new(gradient_image(800, 600), 400.0, 300.0).unwrap();
    let engine = CropTransformEngine::default();

    for region in [
        CropRegion::new(350.0, 0.0, 100.0, 100.0),
        CropRegion::new(0.0, 250.0, 100.0, 100.0),
        CropRegion::new(-1.0, 0.0, 100.0, 100.0),
        CropRegion::new(0.0, 0.0, 401.0, 300.0),
        CropRegion::new(f64::NAN, 0.0, 100.0, 100.0),
    ] {
        let err = engine.extract_region(&source, &region, 90).unwrap_err();
        assert!(
            matches!(err, DermaScanError::OutOfBoundsCrop(_)),
            "{} gave {:?}",
            region,
            err
        );
    }
}

#[test]
fn test_full_frame_crop_is_accepted() {
    let source = SourceImage::new(gradient_image(801, 601), 400.0, 300.0).unwrap();
    let engine = CropTransformEngine::default();
    let cropped = engine
        .extract_region(&source, &CropRegion::new(0.0, 0.0, 400.0, 300.0), 90)
        .unwrap();
    assert_eq!(cropped.dimensions(), (801, 601));
}

#[test]
fn test_minimum_size_is_configurable() {
    let source = SourceImage::at_native_size(gradient_image(300, 300)).unwrap();
    let region = CropRegion::new(0.0, 0.0, 50.0, 50.0);

    let err = CropTransformEngine::default()
        .extract_region(&source, &region, 90)
        .unwrap_err();
    assert!(matches!(err, DermaScanError::CropTooSmall(_)));

    let relaxed = CropTransformEngine::new(CropConfig {
        min_width: 10.0,
        min_height: 10.0,
        ..CropConfig::default()
    });
    assert_eq!(
        relaxed.extract_region(&source, &region, 90).unwrap().dimensions(),
        (50, 50)
    );
}

#[test]
fn test_crop_preserves_native_pixels() {
    // Solid quadrants survive JPEG well enough to check which one was cropped
    let mut image = RgbImage::from_pixel(400, 400, image::Rgb([0, 0, 255]));
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if x >= 200 && y < 200 {
            *pixel = image::Rgb([255, 0, 0]);
        }
    }
    let source = SourceImage::new(DynamicImage::ImageRgb8(image), 200.0, 200.0).unwrap();
    let engine = CropTransformEngine::default();

    let cropped = engine
        .extract_region(&source, &CropRegion::new(100.0, 0.0, 100.0, 100.0), 95)
        .unwrap();
    let decoded = decode(&cropped.bytes).to_rgb8();
    let center = decoded.get_pixel(100, 100);
    assert!(center[0] > 200 && center[2] < 60, "expected red, got {:?}", center);
}
