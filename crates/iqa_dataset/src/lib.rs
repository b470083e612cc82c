//! Dataset builders for full-reference image quality assessment benchmarks.
//!
//! This crate provides utilities for:
//! - Loading `image_pairs_mos.csv` metadata tables with exclusion filters
//! - Resolving reference/distorted image paths per benchmark layout
//! - Lazy, restartable (reference, distorted, MOS) sample iteration
//! - File-level integrity summaries
//! - Burn tensor conversion (feature `burn-runtime`)

pub mod builder;
pub mod generator;
pub mod layout;
pub mod metadata;
pub mod types;
pub mod validation;

#[cfg(feature = "burn-runtime")]
pub mod burn_adapter;

pub use builder::{DatasetBuilder, IqaDataset};
pub use generator::{decode_rgb, generate, load_sample, SampleIter};
pub use layout::{DatasetLayout, DistortedDir, LayoutPaths, PathResolver, METADATA_FILE};
pub use metadata::{load_metadata, MetadataTable};
pub use types::*;
pub use validation::{
    summarize, summarize_with_thresholds, validate_summary, DatasetSummary, ValidationOutcome,
    ValidationReport, ValidationThresholds,
};
