//! Image processing stages of the SNR pipeline
//!
//! Each stage is a plain function over immutable inputs: normalization,
//! Otsu thresholding, connected-region extraction, mask building, background
//! clustering and the final SNR estimate.

pub mod cluster;
pub mod image;
pub mod mask;
pub mod normalize;
pub mod segment;
pub mod snr;
pub mod synthetic;
pub mod thresholding;

// Re-export key functionality for easier access
pub use cluster::{cluster_background, ClusterAssignment, ClusterError, ClusterLabel, ClusterStrategy};
pub use image::{load_image, Image, ImageError};
pub use mask::{build_masks, Mask, MaskPair};
pub use normalize::{normalize, NormalizeError, NormalizeMode, NormalizeOptions};
pub use segment::{extract_regions, fill_holes, select_object, BoundingBox, Region, RegionOptions, SegmentError};
pub use snr::{estimate_snr, SnrError, SnrEstimate};
pub use thresholding::{binarize, otsu_threshold, Binarized, Threshold, ThresholdError, ThresholdStrategy};
