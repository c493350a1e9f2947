use std::fs;
use std::path::Path;
use csv::Writer;
use serde::Serialize;

use crate::config::{Config, DEBUG_CONTOURS_DIR, DEBUG_THRESH_DIR, MASKED_IMAGES_DIR, MONOCHROME_MASKS_DIR};
use crate::errors::Result;
use crate::image_io::{save_gray_image, save_rgb_image};
use crate::image_utils::count_foreground;
use crate::pipeline::{DiagnosticArtifact, PipelineResult};

/// One row of the run report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageReport {
    pub file: String,
    pub status: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub outer_area: Option<f64>,
    pub inner_area: Option<f64>,
    pub inner_mask_pixels: Option<u64>,
    pub message: String,
}

impl ImageReport {
    /// Summarize a pipeline outcome
    pub fn from_result(file: &str, result: &PipelineResult) -> Self {
        match result {
            PipelineResult::Success(segmentation) => {
                let (width, height) = segmentation.inner_mask.dimensions();
                Self {
                    file: file.to_string(),
                    status: "success".to_string(),
                    width: Some(width),
                    height: Some(height),
                    outer_area: Some(segmentation.candidate.outer_area),
                    inner_area: Some(segmentation.candidate.inner_area),
                    inner_mask_pixels: Some(count_foreground(&segmentation.inner_mask)),
                    message: String::new(),
                }
            }
            PipelineResult::Failure { kind, diagnostic_artifact } => {
                let (width, height) = match diagnostic_artifact {
                    DiagnosticArtifact::CleanedBitmap(bitmap) => bitmap.dimensions(),
                    DiagnosticArtifact::BoundaryOverlay(overlay) => overlay.dimensions(),
                };
                Self {
                    file: file.to_string(),
                    status: kind.label().to_string(),
                    width: Some(width),
                    height: Some(height),
                    outer_area: None,
                    inner_area: None,
                    inner_mask_pixels: None,
                    message: kind.to_string(),
                }
            }
        }
    }

    /// Row for an image that could not be loaded or processed at all
    pub fn from_error(file: &str, message: impl Into<String>) -> Self {
        Self {
            file: file.to_string(),
            status: "error".to_string(),
            width: None,
            height: None,
            outer_area: None,
            inner_area: None,
            inner_mask_pixels: None,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Persist masks, painted images and diagnostics for one image.
///
/// With `debug` set, the cleaned bitmap of a successful run is saved too.
pub fn save_pipeline_outputs(
    result: &PipelineResult,
    filename: &str,
    config: &Config,
    debug: bool,
) -> Result<()> {
    let base = Path::new(&config.output_base_dir);

    match result {
        PipelineResult::Success(segmentation) => {
            if config.save_monochrome_masks {
                let dir = base.join(MONOCHROME_MASKS_DIR);
                fs::create_dir_all(&dir)?;
                save_gray_image(&segmentation.inner_mask, dir.join(format!("{}_mask_inner_monochrome.png", filename)))?;
                save_gray_image(&segmentation.outer_mask, dir.join(format!("{}_mask_outer_monochrome.png", filename)))?;
                save_gray_image(&segmentation.body_mask, dir.join(format!("{}_mask_donut_body_monochrome.png", filename)))?;
            }

            if config.save_masked_images {
                let dir = base.join(MASKED_IMAGES_DIR);
                fs::create_dir_all(&dir)?;
                save_rgb_image(&segmentation.inner_filled_image, dir.join(format!("{}_masked_inner_area.png", filename)))?;
                save_rgb_image(&segmentation.outer_filled_image, dir.join(format!("{}_masked_outer_area.png", filename)))?;
                save_rgb_image(&segmentation.body_only_image, dir.join(format!("{}_donut_only.png", filename)))?;
            }

            if debug {
                let dir = base.join(DEBUG_THRESH_DIR);
                fs::create_dir_all(&dir)?;
                save_gray_image(&segmentation.cleaned_bitmap, dir.join(format!("{}_thresh.png", filename)))?;
            }
        }
        PipelineResult::Failure { diagnostic_artifact, .. } => {
            if !config.save_diagnostics {
                return Ok(());
            }

            match diagnostic_artifact {
                DiagnosticArtifact::CleanedBitmap(bitmap) => {
                    let dir = base.join(DEBUG_THRESH_DIR);
                    fs::create_dir_all(&dir)?;
                    save_gray_image(bitmap, dir.join(format!("{}_thresh.png", filename)))?;
                }
                DiagnosticArtifact::BoundaryOverlay(overlay) => {
                    let dir = base.join(DEBUG_CONTOURS_DIR);
                    fs::create_dir_all(&dir)?;
                    save_rgb_image(overlay, dir.join(format!("{}_contours.png", filename)))?;
                }
            }
        }
    }

    Ok(())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the per-image run report as CSV
pub fn write_summary_csv<P: AsRef<Path>>(reports: &[ImageReport], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    // Create directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(output_path)?;

    writer.write_record([
        "File",
        "Status",
        "Width",
        "Height",
        "Outer_Area",
        "Inner_Area",
        "Inner_Mask_Pixels",
        "Message",
    ])?;

    for report in reports {
        writer.write_record(&[
            report.file.clone(),
            report.status.clone(),
            optional(report.width),
            optional(report.height),
            report.outer_area.map(|a| format!("{:.1}", a)).unwrap_or_default(),
            report.inner_area.map(|a| format!("{:.1}", a)).unwrap_or_default(),
            optional(report.inner_mask_pixels),
            report.message.clone(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

/// Write the per-image run report as pretty-printed JSON
pub fn write_summary_json<P: AsRef<Path>>(reports: &[ImageReport], output_path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(reports)?;
    fs::write(output_path, content)?;
    Ok(())
}
