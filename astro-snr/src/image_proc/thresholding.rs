//! Global thresholding of normalized frames
//!
//! Otsu's method picks the histogram split that maximizes between-class
//! variance, separating bright sources from sky. The histogram spans the
//! frame's own `[min, max]`, so any frame with two distinct intensities has at
//! least two occupied bins and a well-defined split.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::image::Image;
use super::mask::Mask;

/// Default number of histogram bins
pub const DEFAULT_BINS: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("every pixel has intensity {value}, no class separation possible")]
    DegenerateHistogram { value: f64 },

    #[error("histogram needs at least 2 bins, got {0}")]
    InvalidBins(usize),

    #[error("image has no pixels")]
    EmptyImage,
}

/// How the binarization cutoff is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdStrategy {
    /// Otsu's method over a histogram of `bins` bins
    Otsu { bins: usize },
    /// Caller-supplied cutoff; pixels `>= value` are foreground
    Fixed { value: f64 },
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        ThresholdStrategy::Otsu { bins: DEFAULT_BINS }
    }
}

/// Linear binning of `[min, max]` into `bins` bins centred on
/// `min + i / scale`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBinning {
    pub min: f64,
    pub scale: f64,
    pub bins: usize,
}

impl HistogramBinning {
    /// Bin index of an intensity, clamped into range
    pub fn bin(&self, value: f64) -> usize {
        let bin = ((value - self.min) * self.scale).round().max(0.0) as usize;
        bin.min(self.bins - 1)
    }
}

/// Result of Otsu's method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsuThreshold {
    /// Last bin of the background class; bins above it are foreground
    pub split_bin: usize,
    /// Lowest intensity that lands in the foreground class
    pub value: f64,
    /// Between-class variance at the chosen split, in bin units
    pub between_class_variance: f64,
    pub binning: HistogramBinning,
}

/// A resolved cutoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Otsu(OtsuThreshold),
    Fixed(f64),
}

impl Threshold {
    /// Intensity at which the foreground class begins
    pub fn value(&self) -> f64 {
        match self {
            Threshold::Otsu(otsu) => otsu.value,
            Threshold::Fixed(value) => *value,
        }
    }

    /// Foreground test. Otsu classifies by bin so the mask agrees exactly
    /// with the histogram split.
    pub fn is_foreground(&self, value: f64) -> bool {
        match self {
            Threshold::Otsu(otsu) => otsu.binning.bin(value) > otsu.split_bin,
            Threshold::Fixed(cutoff) => value >= *cutoff,
        }
    }
}

/// Binary mask together with the cutoff that produced it
#[derive(Debug, Clone)]
pub struct Binarized {
    pub threshold: Threshold,
    pub mask: Mask,
}

/// Build a histogram of `image` spanning its own intensity range.
///
/// Returns `None` for an empty or flat image.
pub fn histogram(image: &Image, bins: usize) -> Option<(Vec<u32>, HistogramBinning)> {
    let (min, max, _) = image.min_max_mean().ok()?;
    if max == min || bins < 2 {
        return None;
    }

    let binning = HistogramBinning {
        min,
        scale: (bins as f64 - 1.0) / (max - min),
        bins,
    };

    let mut counts = vec![0u32; bins];
    for &pixel in image.view().iter() {
        counts[binning.bin(pixel)] += 1;
    }

    Some((counts, binning))
}

/// Calculate Otsu's threshold for a normalized image
///
/// Scans every split `t` (bins `0..=t` background, `t+1..` foreground) and
/// keeps the first one with the largest between-class variance
/// `w_bg * w_fg * (mean_bg - mean_fg)^2`.
///
/// # Errors
/// * [`ThresholdError::DegenerateHistogram`] - all pixels share one intensity
/// * [`ThresholdError::InvalidBins`] - fewer than 2 bins
/// * [`ThresholdError::EmptyImage`] - no pixels
pub fn otsu_threshold(image: &Image, bins: usize) -> Result<OtsuThreshold, ThresholdError> {
    if bins < 2 {
        return Err(ThresholdError::InvalidBins(bins));
    }
    let (min, max, _) = image
        .min_max_mean()
        .map_err(|_| ThresholdError::EmptyImage)?;
    if max == min {
        return Err(ThresholdError::DegenerateHistogram { value: min });
    }

    let (counts, binning) =
        histogram(image, bins).ok_or(ThresholdError::DegenerateHistogram { value: min })?;

    let total_pixels = image.len() as f64;
    let weighted_total: f64 = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut cum_count = 0.0;
    let mut cum_weighted = 0.0;
    let mut best_split = 0;
    let mut max_variance = 0.0;

    for (t, &count) in counts.iter().enumerate().take(bins - 1) {
        cum_count += count as f64;
        cum_weighted += t as f64 * count as f64;

        if cum_count == 0.0 || cum_count == total_pixels {
            continue;
        }

        let w_bg = cum_count / total_pixels;
        let w_fg = 1.0 - w_bg;
        let mean_bg = cum_weighted / cum_count;
        let mean_fg = (weighted_total - cum_weighted) / (total_pixels - cum_count);

        let variance = w_bg * w_fg * (mean_bg - mean_fg).powi(2);
        if variance > max_variance {
            max_variance = variance;
            best_split = t;
        }
    }

    Ok(OtsuThreshold {
        split_bin: best_split,
        value: binning.min + (best_split as f64 + 0.5) / binning.scale,
        between_class_variance: max_variance,
        binning,
    })
}

/// Apply a resolved threshold, marking foreground pixels
pub fn apply_threshold(image: &Image, threshold: &Threshold) -> Mask {
    Mask::from_array(image.view().mapv(|pixel| threshold.is_foreground(pixel)))
}

/// Resolve `strategy` against `image` and produce the foreground mask.
pub fn binarize(image: &Image, strategy: &ThresholdStrategy) -> Result<Binarized, ThresholdError> {
    let threshold = match *strategy {
        ThresholdStrategy::Otsu { bins } => Threshold::Otsu(otsu_threshold(image, bins)?),
        ThresholdStrategy::Fixed { value } => Threshold::Fixed(value),
    };
    let mask = apply_threshold(image, &threshold);

    log::debug!(
        "Threshold {:.3} marks {} of {} pixels as foreground",
        threshold.value(),
        mask.count(),
        image.len()
    );

    Ok(Binarized { threshold, mask })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array2};

    fn image(pixels: Array2<f64>) -> Image {
        Image::new(pixels).unwrap()
    }

    #[test]
    fn test_apply_fixed_threshold() {
        let img = image(arr2(&[[0.1, 0.9], [0.5, 0.2]]));
        let mask = apply_threshold(&img, &Threshold::Fixed(0.5));

        assert!(!mask.get(0, 0));
        assert!(mask.get(0, 1));
        // At-threshold pixels are foreground
        assert!(mask.get(1, 0));
        assert!(!mask.get(1, 1));
    }

    #[test]
    fn test_otsu_separates_bimodal_image() {
        let mut pixels = Array2::from_elem((10, 10), 40.0);
        for i in 0..10 {
            pixels[[i, 0]] = 45.0;
        }
        for i in 4..7 {
            for j in 4..7 {
                pixels[[i, j]] = 230.0;
            }
        }
        let img = image(pixels);

        let otsu = otsu_threshold(&img, DEFAULT_BINS).unwrap();
        assert!(otsu.value > 45.0 && otsu.value < 230.0);

        let binarized = binarize(&img, &ThresholdStrategy::default()).unwrap();
        assert_eq!(binarized.mask.count(), 9);
        assert!(binarized.mask.get(5, 5));
    }

    #[test]
    fn test_otsu_two_levels() {
        let img = image(arr2(&[[10.0, 10.0], [200.0, 200.0]]));
        let binarized = binarize(&img, &ThresholdStrategy::default()).unwrap();

        assert!(!binarized.mask.get(0, 0));
        assert!(binarized.mask.get(1, 0));
        assert!(binarized.mask.get(1, 1));
    }

    #[test]
    fn test_otsu_closely_spaced_values() {
        // Values closer together than one 0-255 bin still separate because
        // the histogram spans the frame's own range.
        let img = image(arr2(&[[100.0, 100.0, 100.01]]));
        let binarized = binarize(&img, &ThresholdStrategy::default()).unwrap();
        assert_eq!(binarized.mask.count(), 1);
        assert!(binarized.mask.get(0, 2));
    }

    #[test]
    fn test_otsu_is_deterministic() {
        let pixels = Array2::from_shape_fn((16, 16), |(i, j)| ((i * 31 + j * 17) % 97) as f64);
        let img = image(pixels);

        let first = otsu_threshold(&img, DEFAULT_BINS).unwrap();
        let second = otsu_threshold(&img, DEFAULT_BINS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_uniform_image_is_degenerate() {
        let img = image(Array2::from_elem((5, 5), 255.0));
        assert_eq!(
            binarize(&img, &ThresholdStrategy::default()).unwrap_err(),
            ThresholdError::DegenerateHistogram { value: 255.0 }
        );
    }

    #[test]
    fn test_invalid_bins() {
        let img = image(arr2(&[[0.0, 1.0]]));
        assert_eq!(
            otsu_threshold(&img, 1),
            Err(ThresholdError::InvalidBins(1))
        );
    }

    #[test]
    fn test_histogram_counts() {
        let img = image(arr2(&[[0.0, 0.0], [1.0, 2.0]]));
        let (counts, binning) = histogram(&img, 3).unwrap();

        assert_eq!(counts, vec![2, 1, 1]);
        assert_eq!(binning.bin(2.0), 2);
        assert_eq!(binning.bin(5.0), 2);
        assert!(histogram(&image(Array2::from_elem((2, 2), 3.0)), 3).is_none());
    }
}
