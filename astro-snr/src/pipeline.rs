//! End-to-end SNR estimation for a single frame
//!
//! normalize -> threshold -> extract regions -> build masks -> cluster
//! background -> estimate SNR. Each stage fails fast; the first error aborts
//! the run and is reported with the stage that raised it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SnrConfig;
use crate::image_proc::{
    binarize, build_masks, cluster_background, estimate_snr, extract_regions, fill_holes,
    normalize, select_object, ClusterError, Image, MaskPair, NormalizeError, Region,
    SegmentError, SnrError, ThresholdError,
};

/// Stage-tagged pipeline failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("thresholding failed: {0}")]
    Threshold(#[from] ThresholdError),

    #[error("region extraction failed: {0}")]
    Segment(#[from] SegmentError),

    #[error("background clustering failed: {0}")]
    Cluster(#[from] ClusterError),

    #[error("SNR estimation failed: {0}")]
    Snr(#[from] SnrError),
}

impl PipelineError {
    /// Name of the stage that raised the error
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Normalize(_) => "normalize",
            PipelineError::Threshold(_) => "threshold",
            PipelineError::Segment(_) => "segment",
            PipelineError::Cluster(_) => "cluster",
            PipelineError::Snr(_) => "snr",
        }
    }
}

/// Scalar result plus the intermediate statistics behind it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnrReport {
    pub snr: f64,
    /// Intensity at which the foreground class began
    pub threshold: f64,
    /// Connected regions surviving the area filter
    pub region_count: usize,
    pub object_area: usize,
    pub signal_mean: f64,
    pub background_pixels: usize,
    pub dark_pixels: usize,
    pub dark_mean: f64,
    pub dark_std: f64,
}

/// Report plus the normalized frame, selected region and masks
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: SnrReport,
    pub image: Image,
    pub object: Region,
    pub masks: MaskPair,
}

/// Runs the SNR pipeline with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct SnrPipeline {
    config: SnrConfig,
}

impl SnrPipeline {
    pub fn new(config: SnrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnrConfig {
        &self.config
    }

    /// Estimate the SNR of the dominant object in `image`.
    pub fn run(&self, image: &Image) -> Result<PipelineOutput, PipelineError> {
        let (height, width) = image.dim();
        log::debug!("Running SNR pipeline on {width}x{height} frame");

        let normalized = normalize(image, &self.config.normalize)?;
        let binarized = binarize(&normalized, &self.config.threshold)?;
        let regions = extract_regions(&binarized.mask, &self.config.regions)?;

        let mut object = select_object(&regions)
            .cloned()
            .ok_or(SegmentError::NoRegionFound {
                foreground: binarized.mask.count(),
                min_area: self.config.regions.min_area,
            })?;
        if self.config.regions.fill_holes {
            object = fill_holes(&object, normalized.dim());
        }
        log::debug!(
            "Selected region {} with area {} at {:?}",
            object.label,
            object.area,
            object.bbox
        );

        let masks = build_masks(&object, normalized.dim());
        let signal = masks.object.select(&normalized);
        let background = masks.background.select(&normalized);

        let clusters = cluster_background(&background, &self.config.cluster)?;
        let dark = clusters.dark_samples(&background);

        let estimate = estimate_snr(&signal, &dark)?;

        let report = SnrReport {
            snr: estimate.snr,
            threshold: binarized.threshold.value(),
            region_count: regions.len(),
            object_area: object.area,
            signal_mean: estimate.signal.mean,
            background_pixels: background.len(),
            dark_pixels: estimate.dark.count,
            dark_mean: estimate.dark.mean,
            dark_std: estimate.dark.std_dev,
        };
        log::info!(
            "SNR {:.2} (signal {:.2}, dark {:.2} +/- {:.2})",
            report.snr,
            report.signal_mean,
            report.dark_mean,
            report.dark_std
        );

        Ok(PipelineOutput {
            report,
            image: normalized,
            object,
            masks,
        })
    }
}

/// Run the pipeline with default settings
pub fn estimate_image_snr(image: &Image) -> Result<PipelineOutput, PipelineError> {
    SnrPipeline::default().run(image)
}
