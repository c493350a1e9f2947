use std::f64::consts::PI;

use image::{GrayImage, Luma, Rgb, RgbImage};

use donut_mask_lib::{
    process, process_batch, segment_bitmap, DiagnosticArtifact, DonutMaskError, FailureKind,
    PipelineConfig, PipelineResult, Raster, Segmentation,
};

fn distance(x: u32, y: u32, cx: f64, cy: f64) -> f64 {
    ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt()
}

/// Foreground wherever `inside` holds for the pixel's distance to any of the centers
fn bitmap(width: u32, height: u32, shapes: &[(f64, f64, f64, f64)]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let set = shapes.iter().any(|&(cx, cy, outer, inner)| {
            let d = distance(x, y, cx, cy);
            d <= outer && d >= inner
        });
        if set { Luma([255]) } else { Luma([0]) }
    })
}

/// Dark ring stroke on a white photo
fn ring_photo(size: u32, outer: f64, inner: f64) -> RgbImage {
    let c = size as f64 / 2.0;
    RgbImage::from_fn(size, size, |x, y| {
        let d = distance(x, y, c, c);
        if d >= inner && d <= outer { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
    })
}

fn count(mask: &GrayImage) -> f64 {
    mask.pixels().filter(|p| p[0] != 0).count() as f64
}

fn expect_success(result: PipelineResult) -> Segmentation {
    match result {
        PipelineResult::Success(segmentation) => segmentation,
        PipelineResult::Failure { kind, .. } => panic!("expected success, got {:?}", kind),
    }
}

fn within(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() / expected <= tolerance
}

#[test]
fn single_ring_yields_hole_and_background_masks() {
    let cleaned = bitmap(300, 300, &[(150.0, 150.0, 100.0, 39.5)]);
    let normalized = RgbImage::from_pixel(300, 300, Rgb([220, 200, 180]));
    let config = PipelineConfig::default();

    let segmentation = expect_success(segment_bitmap(&normalized, cleaned, &config).unwrap());

    let inner_area = count(&segmentation.inner_mask);
    let outer_interior = 300.0 * 300.0 - count(&segmentation.outer_mask);
    assert!(within(inner_area, PI * 40.0 * 40.0, 0.05), "inner area {}", inner_area);
    assert!(within(outer_interior, PI * 100.0 * 100.0, 0.05), "outer interior {}", outer_interior);

    let candidate = &segmentation.candidate;
    assert!(candidate.inner_area < candidate.outer_area);
    assert!(candidate.inner_area >= config.min_hole_area_fraction * 300.0 * 300.0);
}

#[test]
fn mask_composition_reconstructs_the_outer_interior() {
    let cleaned = bitmap(300, 300, &[(150.0, 150.0, 100.0, 39.5)]);
    let normalized = RgbImage::from_pixel(300, 300, Rgb([10, 20, 30]));
    let segmentation =
        expect_success(segment_bitmap(&normalized, cleaned, &PipelineConfig::default()).unwrap());

    for (x, y, body) in segmentation.body_mask.enumerate_pixels() {
        let body = body[0] != 0;
        let inner = segmentation.inner_mask.get_pixel(x, y)[0] != 0;
        let outside = segmentation.outer_mask.get_pixel(x, y)[0] != 0;

        assert!(!(body && inner), "body and hole overlap at ({}, {})", x, y);
        assert_eq!(body || inner, !outside, "region mismatch at ({}, {})", x, y);
    }

    // Painted images: hole and background filled black, ring untouched
    assert_eq!(segmentation.body_only_image.get_pixel(150, 150), &Rgb([0, 0, 0]));
    assert_eq!(segmentation.body_only_image.get_pixel(2, 2), &Rgb([0, 0, 0]));
    assert_eq!(segmentation.body_only_image.get_pixel(150, 80), &Rgb([10, 20, 30]));
    assert_eq!(segmentation.inner_filled_image.get_pixel(2, 2), &Rgb([10, 20, 30]));
    assert_eq!(segmentation.outer_filled_image.get_pixel(150, 150), &Rgb([10, 20, 30]));
}

#[test]
fn blank_image_reports_no_boundaries() {
    let raster = Raster::Color(RgbImage::from_pixel(120, 80, Rgb([255, 255, 255])));
    let config = PipelineConfig { target_width: 120, ..PipelineConfig::default() };

    match process(&raster, &config).unwrap() {
        PipelineResult::Failure { kind, diagnostic_artifact } => {
            assert_eq!(kind, FailureKind::NoBoundariesFound);
            match diagnostic_artifact {
                DiagnosticArtifact::CleanedBitmap(bitmap) => {
                    assert_eq!(bitmap.dimensions(), (120, 80));
                    assert!(bitmap.pixels().all(|p| p[0] == 0));
                }
                other => panic!("unexpected artifact {:?}", other),
            }
        }
        PipelineResult::Success(_) => panic!("blank image cannot contain a donut"),
    }
}

#[test]
fn solid_disk_reports_no_donut() {
    let cleaned = bitmap(200, 200, &[(100.0, 100.0, 60.0, 0.0)]);
    let normalized = RgbImage::from_pixel(200, 200, Rgb([0, 0, 0]));
    let result = segment_bitmap(&normalized, cleaned, &PipelineConfig::default()).unwrap();

    assert_eq!(result.failure_kind(), Some(FailureKind::NoDonutFound));
    match result {
        PipelineResult::Failure { diagnostic_artifact: DiagnosticArtifact::BoundaryOverlay(overlay), .. } => {
            assert_eq!(overlay.dimensions(), (200, 200));
            assert!(overlay.pixels().any(|p| *p == Rgb([0, 255, 0])));
            assert_eq!(overlay.get_pixel(100, 100), &Rgb([0, 0, 0]));
        }
        other => panic!("unexpected outcome {:?}", other.failure_kind()),
    }
}

#[test]
fn larger_of_two_rings_is_selected() {
    let cleaned = bitmap(
        400,
        200,
        &[(300.0, 100.0, 50.0, 20.0), (100.0, 100.0, 80.0, 30.0)],
    );
    let normalized = RgbImage::from_pixel(400, 200, Rgb([255, 255, 255]));
    let segmentation =
        expect_success(segment_bitmap(&normalized, cleaned, &PipelineConfig::default()).unwrap());

    assert!(within(segmentation.candidate.outer_area, PI * 80.0 * 80.0, 0.05));
    assert_eq!(segmentation.inner_mask.get_pixel(100, 100)[0], 255);
    assert_eq!(segmentation.inner_mask.get_pixel(300, 100)[0], 0);
    // The smaller ring counts as background
    assert_eq!(segmentation.outer_mask.get_pixel(300, 60)[0], 255);
}

#[test]
fn ring_stroke_photo_is_segmented_end_to_end() {
    let raster = Raster::Color(ring_photo(200, 70.0, 60.0));
    let config = PipelineConfig { target_width: 200, ..PipelineConfig::default() };

    let segmentation = expect_success(process(&raster, &config).unwrap());

    assert_eq!(segmentation.inner_mask.dimensions(), (200, 200));
    assert_eq!(segmentation.inner_mask.get_pixel(100, 100)[0], 255);
    assert_eq!(segmentation.outer_mask.get_pixel(5, 5)[0], 255);
    assert_eq!(segmentation.body_mask.get_pixel(100, 35)[0], 255);

    let inner_area = count(&segmentation.inner_mask);
    assert!(within(inner_area, PI * 60.0 * 60.0, 0.2), "inner area {}", inner_area);
}

#[test]
fn repeated_runs_are_identical() {
    let raster = Raster::Color(ring_photo(160, 55.0, 46.0));
    let config = PipelineConfig { target_width: 160, ..PipelineConfig::default() };

    let first = process(&raster, &config).unwrap();
    let second = process(&raster, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn normalization_keeps_the_aspect_ratio() {
    let raster = Raster::Gray(GrayImage::from_pixel(1000, 501, Luma([255])));
    let result = process(&raster, &PipelineConfig::default()).unwrap();

    match result {
        PipelineResult::Failure { diagnostic_artifact: DiagnosticArtifact::CleanedBitmap(bitmap), .. } => {
            let (width, height) = bitmap.dimensions();
            assert_eq!(width, 800);
            let expected = 800.0 * 501.0 / 1000.0;
            assert!((height as f64 - expected).abs() <= 1.0);
        }
        other => panic!("unexpected outcome {:?}", other.failure_kind()),
    }
}

#[test]
fn empty_raster_is_invalid() {
    let raster = Raster::Color(RgbImage::new(0, 0));
    assert!(matches!(
        process(&raster, &PipelineConfig::default()),
        Err(DonutMaskError::InvalidImage(_))
    ));
}

#[test]
fn invalid_config_is_rejected_before_processing() {
    let raster = Raster::Color(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
    let config = PipelineConfig { threshold_block_size: 14, ..PipelineConfig::default() };
    assert!(matches!(process(&raster, &config), Err(DonutMaskError::Config(_))));
}

#[test]
fn mismatched_bitmap_is_invalid() {
    let normalized = RgbImage::new(50, 50);
    let cleaned = GrayImage::new(40, 50);
    assert!(matches!(
        segment_bitmap(&normalized, cleaned, &PipelineConfig::default()),
        Err(DonutMaskError::InvalidImage(_))
    ));
}

#[test]
fn one_bad_image_does_not_affect_the_batch() {
    let rasters = vec![
        Raster::Color(ring_photo(200, 70.0, 60.0)),
        Raster::Color(RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]))),
        Raster::Color(RgbImage::new(0, 0)),
    ];
    let config = PipelineConfig { target_width: 200, ..PipelineConfig::default() };

    let parallel = process_batch(&rasters, &config, true);
    assert_eq!(parallel.len(), 3);
    assert!(parallel[0].as_ref().unwrap().is_success());
    assert_eq!(
        parallel[1].as_ref().unwrap().failure_kind(),
        Some(FailureKind::NoBoundariesFound)
    );
    assert!(matches!(parallel[2], Err(DonutMaskError::InvalidImage(_))));

    let sequential = process_batch(&rasters, &config, false);
    assert_eq!(parallel[0].as_ref().unwrap(), sequential[0].as_ref().unwrap());
    assert_eq!(parallel[1].as_ref().unwrap(), sequential[1].as_ref().unwrap());
}
