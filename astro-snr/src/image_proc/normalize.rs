//! Linear intensity rescaling
//!
//! Maps raw detector counts onto a fixed ceiling so the threshold and
//! clustering stages see a known intensity range regardless of bit depth.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::image::Image;

/// Default ceiling, matching 8-bit display range
pub const DEFAULT_CEILING: f64 = 255.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("image has no pixels")]
    EmptyImage,

    #[error("maximum intensity is zero, cannot rescale")]
    ZeroPeak,

    #[error("all pixels equal {value}, min-max rescaling undefined")]
    ZeroDynamicRange { value: f64 },

    #[error("intensity range {range:e} is too small to rescale onto the ceiling")]
    ScaleOverflow { range: f64 },

    #[error("ceiling must be finite and positive, got {0}")]
    InvalidCeiling(f64),
}

/// How intensities are mapped onto `[0, ceiling]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// `v * ceiling / max`; the minimum keeps its proportional position
    #[default]
    PeakScale,
    /// `(v - min) * ceiling / (max - min)`; the minimum is floored to zero
    MinMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub mode: NormalizeMode,
    pub ceiling: f64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            mode: NormalizeMode::default(),
            ceiling: DEFAULT_CEILING,
        }
    }
}

/// Rescale `image` so its maximum sample lands on `options.ceiling`.
///
/// # Errors
/// * [`NormalizeError::EmptyImage`] - zero pixels
/// * [`NormalizeError::ZeroPeak`] - peak scaling of an all-zero image
/// * [`NormalizeError::ZeroDynamicRange`] - min-max scaling of a flat image
/// * [`NormalizeError::ScaleOverflow`] - range so small that `ceiling / range` overflows
pub fn normalize(image: &Image, options: &NormalizeOptions) -> Result<Image, NormalizeError> {
    let ceiling = options.ceiling;
    if !ceiling.is_finite() || ceiling <= 0.0 {
        return Err(NormalizeError::InvalidCeiling(ceiling));
    }

    let (min, max, _) = image
        .min_max_mean()
        .map_err(|_| NormalizeError::EmptyImage)?;

    let rescaled = match options.mode {
        NormalizeMode::PeakScale => {
            if max == 0.0 {
                return Err(NormalizeError::ZeroPeak);
            }
            let scale = checked_scale(ceiling, max)?;
            image.view().mapv(|v| (v * scale).min(ceiling))
        }
        NormalizeMode::MinMax => {
            if max == min {
                return Err(NormalizeError::ZeroDynamicRange { value: max });
            }
            let scale = checked_scale(ceiling, max - min)?;
            image.view().mapv(|v| ((v - min) * scale).clamp(0.0, ceiling))
        }
    };

    log::debug!(
        "Normalized {:?} range [{min:.3}, {max:.3}] onto [0, {ceiling}]",
        options.mode
    );

    // Finite, non-negative input times a finite positive scale stays valid.
    Ok(Image::from_validated(rescaled))
}

/// `ceiling / range`, rejecting ranges so small the factor overflows
fn checked_scale(ceiling: f64, range: f64) -> Result<f64, NormalizeError> {
    let scale = ceiling / range;
    if scale.is_finite() {
        Ok(scale)
    } else {
        Err(NormalizeError::ScaleOverflow { range })
    }
}
