//! Connected-region extraction from binary masks
//!
//! Components use 8-connectivity: diagonal neighbours belong to the same
//! region. Regions are ranked by area, largest first, and ties keep the
//! raster-scan order in which their first pixel was met.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ndarray::{Array2, ArrayView2};

use super::mask::Mask;

/// 8-connectivity neighboring offsets as (d_row, d_col)
const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const NEIGHBORS_4: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("no foreground region found ({foreground} foreground pixels, minimum area {min_area})")]
    NoRegionFound { foreground: usize, min_area: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionOptions {
    /// Components smaller than this are dropped
    pub min_area: usize,
    /// Add background pixels fully enclosed by the selected object to it
    pub fill_holes: bool,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            min_area: 1,
            fill_holes: false,
        }
    }
}

/// Bounding box for a region, inclusive of its edge pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left column
    pub x_min: usize,
    /// Top row
    pub y_min: usize,
    pub width: usize,
    pub height: usize,
}

impl BoundingBox {
    pub fn new(x_min: usize, y_min: usize, width: usize, height: usize) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }

    /// One past the right-most column
    pub fn x_max(&self) -> usize {
        self.x_min + self.width
    }

    /// One past the bottom row
    pub fn y_max(&self) -> usize {
        self.y_min + self.height
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.x_min..self.x_max()).contains(&col) && (self.y_min..self.y_max()).contains(&row)
    }
}

/// A connected set of foreground pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Component label from [`connected_components`]
    pub label: u32,
    /// Member pixels as `(row, col)`, in raster order
    pub pixels: Vec<(usize, usize)>,
    /// Pixel count
    pub area: usize,
    pub bbox: BoundingBox,
}

impl Region {
    fn from_pixels(label: u32, pixels: Vec<(usize, usize)>) -> Self {
        let (mut y_min, mut x_min) = (usize::MAX, usize::MAX);
        let (mut y_max, mut x_max) = (0, 0);
        for &(row, col) in &pixels {
            y_min = y_min.min(row);
            x_min = x_min.min(col);
            y_max = y_max.max(row);
            x_max = x_max.max(col);
        }

        Self {
            label,
            area: pixels.len(),
            bbox: BoundingBox::new(x_min, y_min, x_max - x_min + 1, y_max - y_min + 1),
            pixels,
        }
    }
}

fn offset(
    (row, col): (usize, usize),
    (d_row, d_col): (isize, isize),
    (rows, cols): (usize, usize),
) -> Option<(usize, usize)> {
    let r = row.checked_add_signed(d_row)?;
    let c = col.checked_add_signed(d_col)?;
    (r < rows && c < cols).then_some((r, c))
}

/// Find connected components in a binary mask
///
/// Uses an 8-connectivity flood fill. Labels start at 1 in raster order of
/// each component's first pixel; background stays 0.
///
/// # Returns
/// The label image and the number of components
pub fn connected_components(mask: ArrayView2<bool>) -> (Array2<u32>, u32) {
    let dim = mask.dim();
    let mut labels = Array2::zeros(dim);
    let mut label_counter = 0;
    let mut stack = Vec::new();

    for ((i, j), &set) in mask.indexed_iter() {
        if !set || labels[[i, j]] != 0 {
            continue;
        }

        label_counter += 1;
        labels[[i, j]] = label_counter;
        stack.push((i, j));

        while let Some(pixel) = stack.pop() {
            for &delta in &NEIGHBORS_8 {
                if let Some((ny, nx)) = offset(pixel, delta, dim) {
                    if mask[[ny, nx]] && labels[[ny, nx]] == 0 {
                        labels[[ny, nx]] = label_counter;
                        stack.push((ny, nx));
                    }
                }
            }
        }
    }

    (labels, label_counter)
}

/// Group labelled pixels into regions, ordered by label
pub fn components_to_regions(labels: ArrayView2<u32>, num_labels: u32) -> Vec<Region> {
    let mut members: Vec<Vec<(usize, usize)>> = vec![Vec::new(); num_labels as usize];

    for ((i, j), &label) in labels.indexed_iter() {
        if label > 0 {
            members[label as usize - 1].push((i, j));
        }
    }

    members
        .into_iter()
        .zip(1..)
        .filter(|(pixels, _)| !pixels.is_empty())
        .map(|(pixels, label)| Region::from_pixels(label, pixels))
        .collect()
}

/// Extract regions from `mask`, largest first.
///
/// # Errors
/// [`SegmentError::NoRegionFound`] when the mask has no foreground pixels or
/// every component is smaller than `options.min_area`.
pub fn extract_regions(mask: &Mask, options: &RegionOptions) -> Result<Vec<Region>, SegmentError> {
    let (labels, num_labels) = connected_components(mask.view());
    let mut regions = components_to_regions(labels.view(), num_labels);

    regions.retain(|region| region.area >= options.min_area);
    // Stable: equal areas stay in label (raster) order
    regions.sort_by(|a, b| b.area.cmp(&a.area));

    if regions.is_empty() {
        return Err(SegmentError::NoRegionFound {
            foreground: mask.count(),
            min_area: options.min_area,
        });
    }

    log::debug!(
        "Found {} regions (of {num_labels} components), largest area {}",
        regions.len(),
        regions[0].area
    );

    Ok(regions)
}

/// The dominant region: the first of a ranked list
pub fn select_object(regions: &[Region]) -> Option<&Region> {
    regions.first()
}

/// Add enclosed holes to `region`.
///
/// A hole is a non-member pixel that cannot reach the image border through
/// other non-member pixels using 4-connectivity, the dual of the region's
/// 8-connectivity.
pub fn fill_holes(region: &Region, dim: (usize, usize)) -> Region {
    let (rows, cols) = dim;
    let member = Mask::from_pixels(dim, &region.pixels);
    let mut outside = Array2::from_elem(dim, false);
    let mut stack = Vec::new();

    // Anything outside the bounding box already reaches the border
    for ((i, j), &is_member) in member.view().indexed_iter() {
        let on_border = i == 0 || j == 0 || i + 1 == rows || j + 1 == cols;
        if (on_border || !region.bbox.contains(i, j)) && !is_member {
            outside[[i, j]] = true;
            stack.push((i, j));
        }
    }

    while let Some(pixel) = stack.pop() {
        for &delta in &NEIGHBORS_4 {
            if let Some((ny, nx)) = offset(pixel, delta, dim) {
                if !member.get(ny, nx) && !outside[[ny, nx]] {
                    outside[[ny, nx]] = true;
                    stack.push((ny, nx));
                }
            }
        }
    }

    let pixels: Vec<(usize, usize)> = member
        .view()
        .indexed_iter()
        .filter(|&(idx, &is_member)| is_member || !outside[idx])
        .map(|(idx, _)| idx)
        .collect();

    if pixels.len() > region.area {
        log::debug!(
            "Filled {} enclosed pixels in region {}",
            pixels.len() - region.area,
            region.label
        );
    }

    Region::from_pixels(region.label, pixels)
}
