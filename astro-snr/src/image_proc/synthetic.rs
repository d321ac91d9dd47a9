//! Reproducible synthetic frames for validating the SNR pipeline.
//!
//! Provides seeded Gaussian noise fields and a simple scene generator: a
//! square object of constant intensity on a noisy sky. Identical inputs and
//! seed always produce identical frames.

use std::ops::Range;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::image::Image;

#[derive(Error, Debug)]
pub enum SyntheticError {
    #[error("invalid noise distribution: {0}")]
    Noise(#[from] NormalError),

    #[error("object of size {size} centred at ({row}, {col}) does not fit a {height}x{width} frame")]
    ObjectOutOfBounds {
        size: usize,
        row: usize,
        col: usize,
        height: usize,
        width: usize,
    },

    #[error("background and object levels must be finite and non-negative")]
    InvalidLevel,
}

/// Generate a 2D array of normally distributed values.
///
/// # Arguments
/// * `size` - Tuple of (height, width)
/// * `mean` - Mean of the normal distribution
/// * `std_dev` - Standard deviation of the normal distribution
/// * `seed` - Random seed for deterministic output
///
/// # Example
/// ```
/// use astro_snr::image_proc::synthetic::simple_normal_array;
///
/// let noise = simple_normal_array((10, 10), 100.0, 10.0, 42).unwrap();
/// assert_eq!(noise.dim(), (10, 10));
/// ```
pub fn simple_normal_array(
    size: (usize, usize),
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> Result<Array2<f64>, SyntheticError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal_dist = Normal::new(mean, std_dev)?;
    Ok(Array2::from_shape_fn(size, |_| normal_dist.sample(&mut rng)))
}

/// Square object of constant intensity on a noisy background
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSpec {
    pub height: usize,
    pub width: usize,
    /// Mean sky level
    pub background: f64,
    /// Gaussian sky noise sigma
    pub noise_std: f64,
    /// Intensity of every object pixel
    pub object_level: f64,
    /// Side length of the square object
    pub object_size: usize,
    /// Object centre as (row, col)
    pub object_center: (usize, usize),
    pub seed: u64,
}

impl Default for SceneSpec {
    fn default() -> Self {
        Self {
            height: 10,
            width: 10,
            background: 50.0,
            noise_std: 5.0,
            object_level: 250.0,
            object_size: 3,
            object_center: (5, 5),
            seed: 42,
        }
    }
}

impl SceneSpec {
    /// Rows and columns covered by the object, as half-open ranges
    pub fn object_extent(&self) -> Result<(Range<usize>, Range<usize>), SyntheticError> {
        let (row, col) = self.object_center;
        let half = self.object_size / 2;
        let out_of_bounds = SyntheticError::ObjectOutOfBounds {
            size: self.object_size,
            row,
            col,
            height: self.height,
            width: self.width,
        };

        let (Some(row_start), Some(col_start)) = (row.checked_sub(half), col.checked_sub(half))
        else {
            return Err(out_of_bounds);
        };
        let row_end = row_start + self.object_size;
        let col_end = col_start + self.object_size;
        if self.object_size == 0 || row_end > self.height || col_end > self.width {
            return Err(out_of_bounds);
        }

        Ok((row_start..row_end, col_start..col_end))
    }
}

/// Render `spec` into an [`Image`]. Noisy sky samples are floored at zero.
pub fn render_scene(spec: &SceneSpec) -> Result<Image, SyntheticError> {
    let levels_valid = [spec.background, spec.object_level]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
    if !levels_valid {
        return Err(SyntheticError::InvalidLevel);
    }

    let (rows, cols) = spec.object_extent()?;
    let mut pixels = simple_normal_array(
        (spec.height, spec.width),
        spec.background,
        spec.noise_std,
        spec.seed,
    )?
    .mapv(|v| v.max(0.0));

    for row in rows {
        for col in cols.clone() {
            pixels[[row, col]] = spec.object_level;
        }
    }

    Ok(Image::from_validated(pixels))
}
