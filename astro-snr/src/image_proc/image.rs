//! Grayscale intensity frames and conversion to/from the `image` crate

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use ndarray::{Array2, ArrayView2};
use thiserror::Error;

use crate::stats::{min_max_mean, StatsError};

/// Errors raised while constructing or decoding an [`Image`]
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("non-finite intensity {value} at row {row}, column {col}")]
    NonFinite { row: usize, col: usize, value: f64 },

    #[error("negative intensity {value} at row {row}, column {col}")]
    Negative { row: usize, col: usize, value: f64 },
}

/// Immutable grid of non-negative, finite intensity samples.
///
/// Stored row-major with shape `(height, width)`, so `pixels[[row, col]]`
/// addresses the pixel at image coordinate `(x = col, y = row)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: Array2<f64>,
}

impl Image {
    /// Wrap an array after checking every sample is finite and non-negative
    pub fn new(pixels: Array2<f64>) -> Result<Self, ImageError> {
        for ((row, col), &value) in pixels.indexed_iter() {
            if !value.is_finite() {
                return Err(ImageError::NonFinite { row, col, value });
            }
            if value < 0.0 {
                return Err(ImageError::Negative { row, col, value });
            }
        }
        Ok(Self { pixels })
    }

    /// Wrap samples a stage has already produced from a valid image
    pub(crate) fn from_validated(pixels: Array2<f64>) -> Self {
        debug_assert!(pixels.iter().all(|v| v.is_finite() && *v >= 0.0));
        Self { pixels }
    }

    /// Build an image from 8-bit samples
    pub fn from_u8(pixels: &Array2<u8>) -> Self {
        Self {
            pixels: pixels.mapv(f64::from),
        }
    }

    /// Build an image from 16-bit samples
    pub fn from_u16(pixels: &Array2<u16>) -> Self {
        Self {
            pixels: pixels.mapv(f64::from),
        }
    }

    /// Samples as a read-only view, shape `(height, width)`
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.pixels.view()
    }

    /// Shape as `(height, width)`
    pub fn dim(&self) -> (usize, usize) {
        self.pixels.dim()
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Total number of pixels
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// (min, max, mean) of all samples
    pub fn min_max_mean(&self) -> Result<(f64, f64, f64), StatsError> {
        match self.pixels.as_slice() {
            Some(slice) => min_max_mean(slice),
            None => min_max_mean(&self.pixels.iter().copied().collect::<Vec<_>>()),
        }
    }

    /// Consume the image, returning the underlying array
    pub fn into_array(self) -> Array2<f64> {
        self.pixels
    }

    /// Render to 8-bit grayscale, clamping to `[0, 255]`
    pub fn to_gray_image(&self) -> GrayImage {
        array2_to_gray_image(&self.pixels.mapv(|v| v.round().clamp(0.0, 255.0) as u8))
    }
}

/// Decode a grayscale frame from disk.
///
/// 16-bit luma sources keep their full depth; every other pixel format is
/// converted to 8-bit luma.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let decoded = image::open(path.as_ref())?;
    log::debug!(
        "Decoded {} ({}x{}, {:?})",
        path.as_ref().display(),
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    let image = match decoded {
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
            let luma = decoded.to_luma16();
            let (width, height) = luma.dimensions();
            let samples = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
                luma.get_pixel(x as u32, y as u32)[0]
            });
            Image::from_u16(&samples)
        }
        other => Image::from_u8(&gray_image_to_array2(&other.to_luma8())),
    };

    Ok(image)
}

/// Converts an ndarray Array2<u8> to an image::GrayImage
///
/// Array indices `[y, x]` map to pixel coordinates `(x, y)`; array dimensions
/// are (height, width) while image dimensions are (width, height).
pub fn array2_to_gray_image(arr: &Array2<u8>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut img = GrayImage::new(width as u32, height as u32);

    for ((y, x), &value) in arr.indexed_iter() {
        img.put_pixel(x as u32, y as u32, Luma([value]));
    }

    img
}

/// Inverse of [`array2_to_gray_image`]
pub fn gray_image_to_array2(img: &GrayImage) -> Array2<u8> {
    let (width, height) = img.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        img.get_pixel(x as u32, y as u32)[0]
    })
}
