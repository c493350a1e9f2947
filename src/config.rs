use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::errors::{DonutMaskError, Result};

/// Output sub-directories created under `output_base_dir`
pub const MONOCHROME_MASKS_DIR: &str = "monochrome_masks";
pub const MASKED_IMAGES_DIR: &str = "masked_images";
pub const DEBUG_THRESH_DIR: &str = "debug_thresh";
pub const DEBUG_CONTOURS_DIR: &str = "debug_contours";

/// Application configuration: where to read, where to write, and the
/// per-image pipeline parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    // Which outputs to persist
    #[serde(default = "default_true")]
    pub save_monochrome_masks: bool,

    #[serde(default = "default_true")]
    pub save_masked_images: bool,

    #[serde(default = "default_true")]
    pub save_diagnostics: bool,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Shape of the structuring element used by the morphological cleaner
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KernelShape {
    /// Full square, every cell set
    Square,
    /// Disc inscribed in the square
    Ellipse,
}

/// Parameters for a single run of the segmentation pipeline.
///
/// Passed by reference into every stage; nothing in the pipeline reads
/// configuration from anywhere else.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_target_width")]
    pub target_width: u32,

    #[serde(default = "default_blur_kernel_size")]
    pub blur_kernel_size: u32,

    // Adaptive threshold parameters
    #[serde(default = "default_threshold_block_size")]
    pub threshold_block_size: u32,

    #[serde(default = "default_threshold_constant")]
    pub threshold_constant: f64,

    // Morphological cleanup parameters
    #[serde(default = "default_morph_kernel_size")]
    pub morph_kernel_size: u32,

    #[serde(default = "default_morph_kernel_shape")]
    pub morph_kernel_shape: KernelShape,

    #[serde(default = "default_opening_iterations")]
    pub opening_iterations: u32,

    #[serde(default = "default_closing_iterations")]
    pub closing_iterations: u32,

    /// Smallest accepted hole, as a fraction of the normalized pixel count
    #[serde(default = "default_min_hole_area_fraction")]
    pub min_hole_area_fraction: f64,

    #[serde(default = "default_fill_color")]
    pub fill_color: [u8; 3],

    // Diagnostic overlay parameters
    #[serde(default = "default_diagnostic_boundary_color")]
    pub diagnostic_boundary_color: [u8; 3],

    #[serde(default = "default_diagnostic_line_thickness")]
    pub diagnostic_line_thickness: u32,
}

fn default_parallel() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_target_width() -> u32 {
    800
}

fn default_blur_kernel_size() -> u32 {
    7
}

fn default_threshold_block_size() -> u32 {
    15
}

fn default_threshold_constant() -> f64 {
    5.0
}

fn default_morph_kernel_size() -> u32 {
    5
}

fn default_morph_kernel_shape() -> KernelShape {
    KernelShape::Square
}

fn default_opening_iterations() -> u32 {
    1
}

fn default_closing_iterations() -> u32 {
    2
}

fn default_min_hole_area_fraction() -> f64 {
    0.001
}

fn default_fill_color() -> [u8; 3] {
    [0, 0, 0]
}

fn default_diagnostic_boundary_color() -> [u8; 3] {
    [0, 255, 0]
}

fn default_diagnostic_line_thickness() -> u32 {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_width: default_target_width(),
            blur_kernel_size: default_blur_kernel_size(),
            threshold_block_size: default_threshold_block_size(),
            threshold_constant: default_threshold_constant(),
            morph_kernel_size: default_morph_kernel_size(),
            morph_kernel_shape: default_morph_kernel_shape(),
            opening_iterations: default_opening_iterations(),
            closing_iterations: default_closing_iterations(),
            min_hole_area_fraction: default_min_hole_area_fraction(),
            fill_color: default_fill_color(),
            diagnostic_boundary_color: default_diagnostic_boundary_color(),
            diagnostic_line_thickness: default_diagnostic_line_thickness(),
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline parameters
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(DonutMaskError::Config(
                "target_width must be > 0".to_string(),
            ));
        }

        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(DonutMaskError::Config(format!(
                "blur_kernel_size must be odd and > 0 (got {})",
                self.blur_kernel_size
            )));
        }

        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(DonutMaskError::Config(format!(
                "threshold_block_size must be odd and >= 3 (got {})",
                self.threshold_block_size
            )));
        }

        if !self.threshold_constant.is_finite() {
            return Err(DonutMaskError::Config(
                "threshold_constant must be a finite number".to_string(),
            ));
        }

        if self.morph_kernel_size == 0 {
            return Err(DonutMaskError::Config(
                "morph_kernel_size must be > 0".to_string(),
            ));
        }

        if !self.min_hole_area_fraction.is_finite()
            || self.min_hole_area_fraction < 0.0
            || self.min_hole_area_fraction >= 1.0
        {
            return Err(DonutMaskError::Config(
                "min_hole_area_fraction must be in [0.0, 1.0)".to_string(),
            ));
        }

        if self.diagnostic_line_thickness == 0 {
            return Err(DonutMaskError::Config(
                "diagnostic_line_thickness must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            use_parallel: default_parallel(),
            image_extensions: default_image_extensions(),
            save_monochrome_masks: true,
            save_masked_images: true,
            save_diagnostics: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DonutMaskError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| DonutMaskError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Check input path exists
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(DonutMaskError::InvalidPath(input_path));
        }

        if self.image_extensions.is_empty() {
            return Err(DonutMaskError::Config(
                "image_extensions must list at least one extension".to_string(),
            ));
        }

        self.pipeline.validate()
    }

    /// Create the output directory tree
    pub fn create_output_dirs(&self) -> Result<()> {
        let base = PathBuf::from(&self.output_base_dir);

        let mut dirs = Vec::new();
        if self.save_monochrome_masks {
            dirs.push(base.join(MONOCHROME_MASKS_DIR));
        }
        if self.save_masked_images {
            dirs.push(base.join(MASKED_IMAGES_DIR));
        }
        if self.save_diagnostics {
            dirs.push(base.join(DEBUG_THRESH_DIR));
            dirs.push(base.join(DEBUG_CONTOURS_DIR));
        }
        dirs.push(base);

        for dir in dirs {
            fs::create_dir_all(&dir).map_err(|e| {
                DonutMaskError::Io(io::Error::new(
                    ErrorKind::Other,
                    format!("Failed to create output directory {}: {}", dir.display(), e),
                ))
            })?;
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_width, 800);
        assert_eq!(config.blur_kernel_size, 7);
        assert_eq!(config.threshold_block_size, 15);
        assert_eq!(config.threshold_constant, 5.0);
        assert_eq!(config.morph_kernel_size, 5);
        assert_eq!(config.opening_iterations, 1);
        assert_eq!(config.closing_iterations, 2);
        assert_eq!(config.min_hole_area_fraction, 0.001);
        assert_eq!(config.fill_color, [0, 0, 0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn even_block_size_is_rejected() {
        let config = PipelineConfig {
            threshold_block_size: 14,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(DonutMaskError::Config(_))));
    }

    #[test]
    fn even_blur_kernel_is_rejected() {
        let config = PipelineConfig {
            blur_kernel_size: 6,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn hole_fraction_out_of_range_is_rejected() {
        let config = PipelineConfig {
            min_hole_area_fraction: 1.5,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            min_hole_area_fraction: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let toml_str = r#"
            input_path = "images"
            output_base_dir = "out"

            [pipeline]
            target_width = 640
            morph_kernel_shape = "ellipse"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline.target_width, 640);
        assert_eq!(config.pipeline.morph_kernel_shape, KernelShape::Ellipse);
        assert_eq!(config.pipeline.threshold_block_size, 15);
        assert!(config.use_parallel);
        assert!(config.image_extensions.iter().any(|e| e == "png"));
    }

    #[test]
    fn missing_pipeline_table_uses_defaults() {
        let toml_str = r#"
            input_path = "images"
            output_base_dir = "out"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.pipeline, config.pipeline);
        assert_eq!(parsed.output_base_dir, config.output_base_dir);
    }
}
