//! Two-cluster partition of background intensities
//!
//! Background pixels mix true sky with faint flux from the object's wings
//! and unrelated sources. Splitting them into two 1-D clusters and keeping
//! the darker one gives a noise reference with less contamination.
//!
//! Both strategies are deterministic. Lloyd's k-means starts from the sample
//! minimum and maximum rather than random seeds; the optimal split scans every
//! cut of the sorted samples.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of clusters the background is split into
pub const NUM_CLUSTERS: usize = 2;

/// Default Lloyd iteration cap
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("background has {pixels} pixels, need at least {required} to form two clusters")]
    InsufficientBackground { pixels: usize, required: usize },

    #[error("all {pixels} background pixels equal {value}, clustering undefined")]
    UniformBackground { pixels: usize, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// Lloyd iterations from min/max initial centroids
    KMeans { max_iterations: usize },
    /// Exact minimum within-cluster sum of squares over sorted cuts
    OptimalSplit,
}

impl Default for ClusterStrategy {
    fn default() -> Self {
        ClusterStrategy::KMeans {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLabel {
    Dark,
    Bright,
}

/// Per-sample labels plus the two centroids, `dark_centroid <= bright_centroid`
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// One label per input sample, same order
    pub labels: Vec<ClusterLabel>,
    pub dark_centroid: f64,
    pub bright_centroid: f64,
    /// Lloyd iterations run (0 for the optimal split)
    pub iterations: usize,
}

impl ClusterAssignment {
    /// Samples carrying `label`, in input order
    ///
    /// # Panics
    /// If `values` is not the slice the assignment was computed from.
    pub fn samples(&self, values: &[f64], label: ClusterLabel) -> Vec<f64> {
        assert_eq!(values.len(), self.labels.len());
        values
            .iter()
            .zip(&self.labels)
            .filter_map(|(&v, &l)| (l == label).then_some(v))
            .collect()
    }

    /// The dark (noise reference) samples
    pub fn dark_samples(&self, values: &[f64]) -> Vec<f64> {
        self.samples(values, ClusterLabel::Dark)
    }

    pub fn count(&self, label: ClusterLabel) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }
}

/// Partition `values` into dark and bright clusters.
///
/// # Errors
/// * [`ClusterError::InsufficientBackground`] - fewer than `2 * NUM_CLUSTERS` samples
/// * [`ClusterError::UniformBackground`] - fewer than 2 distinct values
pub fn cluster_background(
    values: &[f64],
    strategy: &ClusterStrategy,
) -> Result<ClusterAssignment, ClusterError> {
    let required = 2 * NUM_CLUSTERS;
    if values.len() < required {
        return Err(ClusterError::InsufficientBackground {
            pixels: values.len(),
            required,
        });
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min == max {
        return Err(ClusterError::UniformBackground {
            pixels: values.len(),
            value: min,
        });
    }

    let assignment = match *strategy {
        ClusterStrategy::KMeans { max_iterations } => kmeans(values, min, max, max_iterations),
        ClusterStrategy::OptimalSplit => optimal_split(values),
    };

    log::debug!(
        "Background clusters: dark {:.3} ({} px), bright {:.3} ({} px) after {} iterations",
        assignment.dark_centroid,
        assignment.count(ClusterLabel::Dark),
        assignment.bright_centroid,
        assignment.count(ClusterLabel::Bright),
        assignment.iterations
    );

    Ok(assignment)
}

fn nearest(value: f64, dark: f64, bright: f64) -> ClusterLabel {
    // Equidistant samples go dark
    if (value - dark).abs() <= (bright - value).abs() {
        ClusterLabel::Dark
    } else {
        ClusterLabel::Bright
    }
}

/// Mean of each cluster under `labels`, keeping `fallback` for an empty one
fn cluster_means(values: &[f64], labels: &[ClusterLabel], fallback: (f64, f64)) -> (f64, f64) {
    let (mut dark_sum, mut dark_n, mut bright_sum, mut bright_n) = (0.0, 0usize, 0.0, 0usize);
    for (&v, &label) in values.iter().zip(labels) {
        match label {
            ClusterLabel::Dark => {
                dark_sum += v;
                dark_n += 1;
            }
            ClusterLabel::Bright => {
                bright_sum += v;
                bright_n += 1;
            }
        }
    }
    // min always stays dark and max bright, so neither count is zero
    let dark = if dark_n > 0 {
        dark_sum / dark_n as f64
    } else {
        fallback.0
    };
    let bright = if bright_n > 0 {
        bright_sum / bright_n as f64
    } else {
        fallback.1
    };
    (dark, bright)
}

fn kmeans(values: &[f64], min: f64, max: f64, max_iterations: usize) -> ClusterAssignment {
    let mut dark = min;
    let mut bright = max;
    let mut labels: Vec<ClusterLabel> = values.iter().map(|&v| nearest(v, dark, bright)).collect();
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        (dark, bright) = cluster_means(values, &labels, (dark, bright));

        let mut changed = false;
        for (label, &v) in labels.iter_mut().zip(values) {
            let next = nearest(v, dark, bright);
            if next != *label {
                *label = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Labels may have moved on the last pass, or no pass ran at all
    let (dark_centroid, bright_centroid) = cluster_means(values, &labels, (dark, bright));

    ClusterAssignment {
        labels,
        dark_centroid,
        bright_centroid,
        iterations,
    }
}

fn optimal_split(values: &[f64]) -> ClusterAssignment {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mut prefix_sum = Vec::with_capacity(n + 1);
    let mut prefix_sq = Vec::with_capacity(n + 1);
    prefix_sum.push(0.0);
    prefix_sq.push(0.0);
    for &v in &sorted {
        prefix_sum.push(prefix_sum[prefix_sum.len() - 1] + v);
        prefix_sq.push(prefix_sq[prefix_sq.len() - 1] + v * v);
    }

    let sse = |from: usize, to: usize| {
        let count = (to - from) as f64;
        let sum = prefix_sum[to] - prefix_sum[from];
        let sq = prefix_sq[to] - prefix_sq[from];
        (sq - sum * sum / count).max(0.0)
    };

    // Cut k puts sorted[..k] in the dark cluster; never split equal values
    let mut best_cut = 0;
    let mut best_cost = f64::INFINITY;
    for k in 1..n {
        if sorted[k - 1] == sorted[k] {
            continue;
        }
        let cost = sse(0, k) + sse(k, n);
        if cost < best_cost {
            best_cost = cost;
            best_cut = k;
        }
    }

    let cut_value = sorted[best_cut - 1];
    let labels = values
        .iter()
        .map(|&v| {
            if v <= cut_value {
                ClusterLabel::Dark
            } else {
                ClusterLabel::Bright
            }
        })
        .collect();

    ClusterAssignment {
        labels,
        dark_centroid: prefix_sum[best_cut] / best_cut as f64,
        bright_centroid: (prefix_sum[n] - prefix_sum[best_cut]) / (n - best_cut) as f64,
        iterations: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn two_levels() -> Vec<f64> {
        // Interleave so labels must follow values, not positions
        (0..100)
            .map(|i| if i % 2 == 0 { 10.0 } else { 200.0 })
            .collect()
    }

    fn both_strategies() -> [ClusterStrategy; 2] {
        [ClusterStrategy::default(), ClusterStrategy::OptimalSplit]
    }

    #[test]
    fn test_separated_groups() {
        let values = two_levels();

        for strategy in both_strategies() {
            let assignment = cluster_background(&values, &strategy).unwrap();
            let dark = assignment.dark_samples(&values);

            assert_eq!(dark.len(), 50);
            assert!(dark.iter().all(|&v| v == 10.0));
            assert_eq!(assignment.dark_centroid, 10.0);
            assert_eq!(assignment.bright_centroid, 200.0);
        }
    }

    #[test]
    fn test_noisy_groups_split_at_gap() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let low = Normal::new(20.0, 2.0).unwrap();
        let high = Normal::new(120.0, 4.0).unwrap();
        let mut values: Vec<f64> = (0..300).map(|_| low.sample(&mut rng)).collect();
        values.extend((0..100).map(|_| high.sample(&mut rng)));

        for strategy in both_strategies() {
            let assignment = cluster_background(&values, &strategy).unwrap();
            assert_eq!(assignment.count(ClusterLabel::Dark), 300);
            assert!(assignment.labels[..300]
                .iter()
                .all(|&l| l == ClusterLabel::Dark));
            assert_relative_eq!(assignment.dark_centroid, 20.0, epsilon = 0.5);
        }
    }

    #[test]
    fn test_centroids_ordered() {
        let values = [5.0, 6.0, 7.0, 50.0, 51.0, 3.0, 52.0];
        for strategy in both_strategies() {
            let assignment = cluster_background(&values, &strategy).unwrap();
            assert!(assignment.dark_centroid < assignment.bright_centroid);
            assert_eq!(
                assignment.dark_samples(&values),
                vec![5.0, 6.0, 7.0, 3.0]
            );
        }
    }

    #[test]
    fn test_repeatable() {
        let values: Vec<f64> = (0..500).map(|i| ((i * 7919) % 251) as f64).collect();
        for strategy in both_strategies() {
            let first = cluster_background(&values, &strategy).unwrap();
            let second = cluster_background(&values, &strategy).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_optimal_split_no_worse_than_kmeans() {
        // k-means converges to a local optimum; the exact split can only be
        // as good or better.
        let values = [1.0, 2.0, 3.0, 4.0, 10.0, 11.0, 30.0, 31.0, 32.0];
        let wcss = |a: &ClusterAssignment| -> f64 {
            values
                .iter()
                .zip(&a.labels)
                .map(|(&v, &l)| {
                    let c = match l {
                        ClusterLabel::Dark => a.dark_centroid,
                        ClusterLabel::Bright => a.bright_centroid,
                    };
                    (v - c).powi(2)
                })
                .sum()
        };

        let km = cluster_background(&values, &ClusterStrategy::default()).unwrap();
        let exact = cluster_background(&values, &ClusterStrategy::OptimalSplit).unwrap();
        assert!(wcss(&exact) <= wcss(&km) + 1e-9);
    }

    #[test]
    fn test_centroids_are_cluster_means() {
        let values = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        for max_iterations in [0, 1, DEFAULT_MAX_ITERATIONS] {
            let assignment =
                cluster_background(&values, &ClusterStrategy::KMeans { max_iterations }).unwrap();
            assert_eq!(assignment.count(ClusterLabel::Dark), 3);
            assert_relative_eq!(assignment.dark_centroid, 2.0, epsilon = 1e-12);
            assert_relative_eq!(assignment.bright_centroid, 11.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_too_few_pixels() {
        assert_eq!(
            cluster_background(&[1.0, 2.0, 3.0], &ClusterStrategy::default()),
            Err(ClusterError::InsufficientBackground {
                pixels: 3,
                required: 4
            })
        );
    }

    #[test]
    fn test_uniform_background() {
        assert_eq!(
            cluster_background(&[7.0; 10], &ClusterStrategy::OptimalSplit),
            Err(ClusterError::UniformBackground {
                pixels: 10,
                value: 7.0
            })
        );
    }
}
