use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for DonutMask
#[derive(Error, Debug)]
pub enum DonutMaskError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Failed to serialize configuration: {0}")]
    ConfigSave(#[from] toml::ser::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Recoverable, per-image segmentation failures.
///
/// These never abort a batch; they travel inside `PipelineResult::Failure`
/// together with a diagnostic artifact.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    #[error("no boundaries found in the cleaned bitmap")]
    NoBoundariesFound,

    #[error("no outer boundary / inner hole pair satisfied the donut heuristic")]
    NoDonutFound,
}

impl FailureKind {
    /// Short machine-friendly label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::NoBoundariesFound => "no_boundaries_found",
            FailureKind::NoDonutFound => "no_donut_found",
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, DonutMaskError>;
