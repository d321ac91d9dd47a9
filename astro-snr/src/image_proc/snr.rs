//! Signal-to-noise ratio of a segmented object against a dark-sky reference.
//!
//! # Methodology
//!
//! 1. **Signal**: mean intensity of the object-mask pixels
//! 2. **Background level**: mean of the dark background cluster
//! 3. **Noise**: population standard deviation of the dark cluster
//! 4. **SNR**: (signal mean - background level) / noise
//!
//! A dark cluster with zero spread gives no noise estimate; that is reported
//! as an error rather than an infinite ratio. Objects fainter than the dark
//! reference produce a negative SNR, which is returned as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::{SampleStats, StatsError};

/// Errors from SNR calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnrError {
    /// Dark cluster has a single unique value.
    #[error("dark cluster has zero spread (all {count} pixels at {level:.3}), SNR undefined")]
    ZeroNoise {
        /// Dark cluster level.
        level: f64,
        /// Dark cluster pixel count.
        count: usize,
    },

    /// Signal samples could not be summarised.
    #[error("signal statistics failed: {0}")]
    Signal(StatsError),

    /// Dark samples could not be summarised.
    #[error("dark cluster statistics failed: {0}")]
    Dark(StatsError),
}

/// SNR with the statistics it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnrEstimate {
    pub snr: f64,
    pub signal: SampleStats,
    pub dark: SampleStats,
}

/// Compute `(mean(signal) - mean(dark)) / std(dark)`.
///
/// # Errors
///
/// * [`SnrError::ZeroNoise`] - every dark sample has the same value
/// * [`SnrError::Signal`] / [`SnrError::Dark`] - empty or NaN samples
pub fn estimate_snr(signal: &[f64], dark: &[f64]) -> Result<SnrEstimate, SnrError> {
    let signal_stats = SampleStats::from_samples(signal).map_err(SnrError::Signal)?;
    let dark_stats = SampleStats::from_samples(dark).map_err(SnrError::Dark)?;

    // A flat cluster can still leave an ulp-sized std from the mean's rounding
    if dark_stats.is_constant() || dark_stats.std_dev == 0.0 {
        return Err(SnrError::ZeroNoise {
            level: dark_stats.min,
            count: dark_stats.count,
        });
    }

    let snr = (signal_stats.mean - dark_stats.mean) / dark_stats.std_dev;
    if snr < 0.0 {
        log::warn!(
            "Object mean {:.3} is below dark level {:.3}, SNR is negative",
            signal_stats.mean,
            dark_stats.mean
        );
    }

    Ok(SnrEstimate {
        snr,
        signal: signal_stats,
        dark: dark_stats,
    })
}
