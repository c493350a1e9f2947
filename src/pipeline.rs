use image::{GrayImage, RgbImage};
use log::{debug, info};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::contours::extract_hierarchy;
use crate::donut::{select_donut_pair, DonutCandidate};
use crate::errors::{DonutMaskError, FailureKind, Result};
use crate::image_utils::{normalize_raster, preprocess, Raster};
use crate::masks::{apply_masks, composite_masks, draw_boundaries};
use crate::morphology::clean_bitmap;
use crate::threshold::adaptive_threshold_inv;

/// Everything produced for an image in which a donut was found
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub inner_mask: GrayImage,
    pub outer_mask: GrayImage,
    pub body_mask: GrayImage,
    pub inner_filled_image: RgbImage,
    pub outer_filled_image: RgbImage,
    pub body_only_image: RgbImage,
    /// The selected outer/inner boundary pair
    pub candidate: DonutCandidate,
    /// Bitmap after thresholding and cleanup, kept for debugging
    pub cleaned_bitmap: GrayImage,
}

/// Image offered to the caller when segmentation gives up
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticArtifact {
    /// The cleaned bitmap in which nothing could be traced
    CleanedBitmap(GrayImage),
    /// The normalized image with every traced boundary drawn on it
    BoundaryOverlay(RgbImage),
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    Success(Segmentation),
    Failure {
        kind: FailureKind,
        diagnostic_artifact: DiagnosticArtifact,
    },
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PipelineResult::Success(_) => None,
            PipelineResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Run the full pipeline on one raster.
///
/// `Err` is reserved for unusable input or configuration; a picture without
/// a recognizable donut comes back as `Ok(PipelineResult::Failure { .. })`.
pub fn process(raster: &Raster, config: &PipelineConfig) -> Result<PipelineResult> {
    config.validate()?;

    // Step 1: Normalize width
    let normalized = normalize_raster(raster, config.target_width)?;
    let (width, height) = normalized.dimensions();
    debug!("Normalized {:?} -> {}x{}", raster.dimensions(), width, height);

    // Step 2: Intensity + blur
    let gray = preprocess(&normalized, config.blur_kernel_size);

    // Step 3: Binarize
    let binary = adaptive_threshold_inv(&gray, config.threshold_block_size, config.threshold_constant);

    // Step 4: Morphological cleanup
    let cleaned = clean_bitmap(&binary, config)?;

    segment_bitmap(&normalized, cleaned, config)
}

/// Stages after cleanup: trace boundaries, pick the donut, build masks.
///
/// `cleaned` must have the same dimensions as `normalized`.
pub fn segment_bitmap(
    normalized: &RgbImage,
    cleaned: GrayImage,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    let (width, height) = normalized.dimensions();
    if cleaned.dimensions() != (width, height) {
        return Err(DonutMaskError::InvalidImage(format!(
            "bitmap is {:?} but the image is {}x{}",
            cleaned.dimensions(),
            width,
            height
        )));
    }

    // Step 5: Boundary hierarchy
    let hierarchy = match extract_hierarchy(&cleaned) {
        Ok(hierarchy) => hierarchy,
        Err(kind) => {
            return Ok(PipelineResult::Failure {
                kind,
                diagnostic_artifact: DiagnosticArtifact::CleanedBitmap(cleaned),
            });
        }
    };

    // Step 6: Donut pair selection
    let candidate = match select_donut_pair(&hierarchy, width, height, config.min_hole_area_fraction) {
        Ok(candidate) => candidate,
        Err(kind) => {
            let overlay = draw_boundaries(
                normalized,
                hierarchy.boundaries(),
                config.diagnostic_boundary_color,
                config.diagnostic_line_thickness,
            );
            return Ok(PipelineResult::Failure {
                kind,
                diagnostic_artifact: DiagnosticArtifact::BoundaryOverlay(overlay),
            });
        }
    };

    info!(
        "Selected donut: outer boundary #{} (area {:.1}), inner boundary #{} (area {:.1})",
        candidate.outer_index, candidate.outer_area, candidate.inner_index, candidate.inner_area
    );

    // Step 7: Masks and painted images
    let masks = composite_masks(&candidate, width, height);
    let painted = apply_masks(normalized, &masks, config.fill_color);

    Ok(PipelineResult::Success(Segmentation {
        inner_mask: masks.inner,
        outer_mask: masks.outer,
        body_mask: masks.body,
        inner_filled_image: painted.inner_filled,
        outer_filled_image: painted.outer_filled,
        body_only_image: painted.body_only,
        candidate,
        cleaned_bitmap: cleaned,
    }))
}

/// Process many rasters independently; one result per input, in input order
pub fn process_batch(rasters: &[Raster], config: &PipelineConfig, parallel: bool) -> Vec<Result<PipelineResult>> {
    if parallel {
        rasters.par_iter().map(|raster| process(raster, config)).collect()
    } else {
        rasters.iter().map(|raster| process(raster, config)).collect()
    }
}
