//! Object segmentation and signal-to-noise estimation for astronomical frames
//!
//! Given one grayscale frame, the pipeline finds the dominant bright object
//! with Otsu thresholding and 8-connected region extraction, splits the
//! remaining background into dark and bright clusters, and reports
//! `(mean(object) - mean(dark)) / std(dark)`.
//!
//! ```
//! use astro_snr::image_proc::synthetic::{render_scene, SceneSpec};
//! use astro_snr::pipeline::SnrPipeline;
//!
//! let image = render_scene(&SceneSpec::default()).unwrap();
//! let output = SnrPipeline::default().run(&image).unwrap();
//! assert_eq!(output.report.object_area, 9);
//! assert!(output.report.snr > 10.0);
//! ```

pub mod config;
pub mod image_proc;
pub mod pipeline;
pub mod stats;

pub use config::{ConfigError, SnrConfig};
pub use image_proc::{load_image, Image};
pub use pipeline::{estimate_image_snr, PipelineError, PipelineOutput, SnrPipeline, SnrReport};
