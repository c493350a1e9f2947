// src/lib.rs - Library interface for DonutMask

pub mod config;
pub mod contours;
pub mod donut;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod masks;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod threshold;

// Re-export commonly used types and functions
pub use errors::{DonutMaskError, FailureKind, Result};
pub use config::{Config, KernelShape, PipelineConfig};
pub use image_utils::Raster;
pub use pipeline::{
    process,
    process_batch,
    segment_bitmap,
    DiagnosticArtifact,
    PipelineResult,
    Segmentation,
};
pub use image_io::{InputImage, load_image};

// Re-export the individual stages
pub use image_utils::{normalize_raster, preprocess};
pub use threshold::adaptive_threshold_inv;
pub use morphology::{apply_opening, apply_closing, clean_bitmap};
pub use contours::{
    extract_hierarchy,
    Boundary,
    BoundaryHierarchy,
    BoundaryKind,
    HierarchyEntry,
};
pub use donut::{find_donut_candidates, select_donut_pair, DonutCandidate};
pub use masks::{apply_masks, composite_masks, draw_boundaries, MaskSet, MaskedImages};
