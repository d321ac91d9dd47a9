//! Summary statistics over pixel samples
//!
//! Min, max and mean are gathered in a single pass; the population variance
//! needs a second pass over the same samples. NaN samples abort the scan and
//! are reported with their index.

use num_traits::float::Float;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for sample statistics
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("NaN value encountered at index {0}")]
    NaNEncountered(usize),
    #[error("No data provided (empty sample set)")]
    NoData,
}

/// Summary of a set of intensity samples.
///
/// `std_dev` is the population standard deviation (divides by `count`), which
/// is what the SNR noise floor is defined against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl SampleStats {
    /// Compute statistics from a slice of samples.
    ///
    /// # Returns
    /// * `Err(StatsError::NoData)` - If the slice is empty
    /// * `Err(StatsError::NaNEncountered(index))` - At the first NaN sample
    pub fn from_samples<T: Float>(data: &[T]) -> Result<Self, StatsError> {
        let (min, max, mean) = min_max_mean(data)?;
        let variance = variance_about(data, mean);

        Ok(Self {
            count: data.len(),
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// True when every sample had the same value
    pub fn is_constant(&self) -> bool {
        self.min == self.max
    }
}

/// Single pass over `data` for (min, max, mean)
pub fn min_max_mean<T: Float>(data: &[T]) -> Result<(f64, f64, f64), StatsError> {
    if data.is_empty() {
        return Err(StatsError::NoData);
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;

    for (index, value) in data.iter().enumerate() {
        let value = value.to_f64().ok_or(StatsError::NaNEncountered(index))?;
        if value.is_nan() {
            return Err(StatsError::NaNEncountered(index));
        }
        min = min.min(value);
        max = max.max(value);
        sum += value;
    }

    Ok((min, max, sum / data.len() as f64))
}

/// Arithmetic mean of `data`
pub fn mean<T: Float>(data: &[T]) -> Result<f64, StatsError> {
    Ok(min_max_mean(data)?.2)
}

/// Population variance about a precomputed mean (second pass)
fn variance_about<T: Float>(data: &[T], mean: f64) -> f64 {
    let sum_squared_diff: f64 = data
        .iter()
        .filter_map(|v| v.to_f64())
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum();

    sum_squared_diff / data.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_stats() {
        let stats = SampleStats::from_samples(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]).unwrap();

        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.count, 8);
        // 31 / 8
        assert_relative_eq!(stats.mean, 3.875, epsilon = 1e-12);
    }

    #[test]
    fn test_population_std_dev() {
        // Mean = 5, Variance = 4, StdDev = 2
        let data = [2.0_f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = SampleStats::from_samples(&data).unwrap();

        assert_relative_eq!(stats.mean, 5.0, epsilon = 1e-12);
        assert_relative_eq!(stats.std_dev, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_f32_samples() {
        let stats = SampleStats::from_samples(&[1.0_f32, 2.0, 3.0]).unwrap();
        assert_relative_eq!(stats.mean, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nan_reports_index() {
        let result = SampleStats::from_samples(&[1.0, 2.0, f64::NAN, 3.0]);
        assert_eq!(result, Err(StatsError::NaNEncountered(2)));
    }

    #[test]
    fn test_no_data() {
        let empty: [f64; 0] = [];
        assert_eq!(SampleStats::from_samples(&empty), Err(StatsError::NoData));
        assert_eq!(mean(&empty), Err(StatsError::NoData));
    }

    #[test]
    fn test_constant_samples() {
        let stats = SampleStats::from_samples(&[42.0; 5]).unwrap();
        assert!(stats.is_constant());
        assert_eq!(stats.std_dev, 0.0);
    }
}
