//! Boolean pixel masks and the object/background partition
//!
//! The object mask holds exactly the pixels of the selected region; the
//! background mask is its pixelwise complement, so every pixel belongs to
//! exactly one of the two.

use image::GrayImage;
use ndarray::{Array2, ArrayView2, Zip};

use super::image::{array2_to_gray_image, Image};
use super::segment::Region;

/// 2D boolean grid, shape `(height, width)`; `true` marks membership
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    cells: Array2<bool>,
}

impl Mask {
    /// Mask with no pixels set
    pub fn empty(dim: (usize, usize)) -> Self {
        Self {
            cells: Array2::from_elem(dim, false),
        }
    }

    pub fn from_array(cells: Array2<bool>) -> Self {
        Self { cells }
    }

    /// Mask from a list of `(row, col)` coordinates
    pub fn from_pixels(dim: (usize, usize), pixels: &[(usize, usize)]) -> Self {
        let mut mask = Self::empty(dim);
        for &(row, col) in pixels {
            mask.cells[[row, col]] = true;
        }
        mask
    }

    pub fn view(&self) -> ArrayView2<'_, bool> {
        self.cells.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[[row, col]]
    }

    /// Number of pixels set
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&set| set).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&set| set)
    }

    /// Pixelwise NOT
    pub fn complement(&self) -> Self {
        Self {
            cells: self.cells.mapv(|set| !set),
        }
    }

    /// Intensities of `image` under this mask, in raster order
    ///
    /// # Panics
    /// If the image and mask dimensions differ.
    pub fn select(&self, image: &Image) -> Vec<f64> {
        assert_eq!(
            self.dim(),
            image.dim(),
            "mask and image dimensions must match"
        );
        let image = image.view();
        self.cells
            .iter()
            .zip(image.iter())
            .filter_map(|(&set, &v)| set.then_some(v))
            .collect()
    }

    /// Render as 0/255 grayscale for inspection
    pub fn to_gray_image(&self) -> GrayImage {
        array2_to_gray_image(&self.cells.mapv(|set| if set { 255u8 } else { 0 }))
    }
}

/// Object mask and its complement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPair {
    pub object: Mask,
    pub background: Mask,
}

impl MaskPair {
    /// True when every pixel is in exactly one of the two masks
    pub fn is_partition(&self) -> bool {
        self.object.dim() == self.background.dim()
            && Zip::from(self.object.view())
                .and(self.background.view())
                .all(|&obj, &bg| obj != bg)
    }
}

/// Build the object mask from `region` and derive the background mask.
pub fn build_masks(region: &Region, dim: (usize, usize)) -> MaskPair {
    let object = Mask::from_pixels(dim, &region.pixels);
    let background = object.complement();

    debug_assert!(MaskPair {
        object: object.clone(),
        background: background.clone(),
    }
    .is_partition());

    MaskPair { object, background }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::segment::{extract_regions, RegionOptions};
    use ndarray::arr2;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_build_masks_exact_region() {
        let mask = Mask::from_array(arr2(&[
            [false, true, false],
            [false, true, false],
            [false, false, false],
        ]));
        let regions = extract_regions(&mask, &RegionOptions::default()).unwrap();
        let pair = build_masks(&regions[0], mask.dim());

        assert_eq!(pair.object, mask);
        assert_eq!(pair.object.count(), 2);
        assert_eq!(pair.background.count(), 7);
        assert!(pair.is_partition());
    }

    #[test]
    fn test_random_masks_partition_grid() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let rows = rng.random_range(1..24);
            let cols = rng.random_range(1..24);
            let density: f64 = rng.random_range(0.05..0.95);
            let cells = Array2::from_shape_fn((rows, cols), |_| rng.random_bool(density));
            let mask = Mask::from_array(cells);

            let Ok(regions) = extract_regions(&mask, &RegionOptions::default()) else {
                assert!(mask.is_empty());
                continue;
            };

            for region in &regions {
                let pair = build_masks(region, mask.dim());
                assert!(pair.is_partition());
                assert_eq!(pair.object.count(), region.area);
                assert_eq!(pair.object.count() + pair.background.count(), rows * cols);
            }
        }
    }

    #[test]
    fn test_overlapping_masks_are_not_partition() {
        let object = Mask::from_array(arr2(&[[true, false]]));
        let pair = MaskPair {
            background: Mask::from_array(arr2(&[[true, true]])),
            object,
        };
        assert!(!pair.is_partition());
    }

    #[test]
    fn test_select_raster_order() {
        let image = Image::new(arr2(&[[1.0, 2.0], [3.0, 4.0]])).unwrap();
        let mask = Mask::from_array(arr2(&[[false, true], [true, true]]));

        assert_eq!(mask.select(&image), vec![2.0, 3.0, 4.0]);
        assert_eq!(mask.complement().select(&image), vec![1.0]);
    }

    #[test]
    fn test_to_gray_image() {
        let mask = Mask::from_array(arr2(&[[true, false]]));
        let img = mask.to_gray_image();
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(1, 0)[0], 0);
    }
}
