//! Signal-to-noise estimator for a single astronomical frame
//!
//! Finds the brightest connected object, estimates the sky noise from the
//! darker half of the background and prints the SNR.
//!
//! # Usage
//!
//! ```bash
//! # Estimate SNR of an image on disk
//! cargo run --release --bin snr_calc -- estimate frame.png
//!
//! # Use the exact background split and keep the masks for inspection
//! cargo run --release --bin snr_calc -- estimate frame.png --cluster optimal-split --save-masks out/
//!
//! # Run on a synthetic 64x64 frame
//! cargo run --release --bin snr_calc -- synthetic --size 64 --object-size 5 --noise-std 8
//!
//! # Dump the default configuration as a starting point for --config
//! cargo run --release --bin snr_calc -- default-config > snr.json
//! ```
//!
//! Set `RUST_LOG=debug` to see per-stage diagnostics.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use astro_snr::image_proc::normalize::NormalizeMode;
use astro_snr::image_proc::synthetic::{render_scene, SceneSpec};
use astro_snr::image_proc::{load_image, ClusterStrategy, Image, ThresholdStrategy};
use astro_snr::pipeline::{PipelineOutput, SnrPipeline};
use astro_snr::SnrConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the SNR of the dominant object in an image file
    Estimate {
        /// Grayscale image to analyse
        image: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a synthetic frame and estimate its SNR
    Synthetic {
        /// Frame side length in pixels
        #[arg(long, default_value = "10")]
        size: usize,

        /// Side length of the square object
        #[arg(long, default_value = "3")]
        object_size: usize,

        /// Object intensity
        #[arg(long, default_value = "250.0")]
        object_level: f64,

        /// Mean sky level
        #[arg(long, default_value = "50.0")]
        background: f64,

        /// Sky noise sigma
        #[arg(long, default_value = "5.0")]
        noise_std: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        #[command(flatten)]
        pipeline: PipelineArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the default configuration as JSON
    DefaultConfig,
}

#[derive(Args)]
struct PipelineArgs {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Intensity normalization mode
    #[arg(long, value_enum)]
    normalize: Option<NormalizeArg>,

    /// Otsu histogram bins
    #[arg(long, conflicts_with = "fixed_threshold")]
    bins: Option<usize>,

    /// Use a fixed threshold on the normalized frame instead of Otsu
    #[arg(long)]
    fixed_threshold: Option<f64>,

    /// Background clustering strategy
    #[arg(long, value_enum)]
    cluster: Option<ClusterArg>,

    /// Minimum region area in pixels
    #[arg(long)]
    min_area: Option<usize>,

    /// Include pixels enclosed by the object in the object mask
    #[arg(long)]
    fill_holes: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Write original.png, object_mask.png and background_mask.png here
    #[arg(long)]
    save_masks: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum NormalizeArg {
    Peak,
    MinMax,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClusterArg {
    KMeans,
    OptimalSplit,
}

impl PipelineArgs {
    fn to_config(&self) -> Result<SnrConfig> {
        let mut config = match &self.config {
            Some(path) => SnrConfig::load_json(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SnrConfig::default(),
        };

        if let Some(mode) = self.normalize {
            config.normalize.mode = match mode {
                NormalizeArg::Peak => NormalizeMode::PeakScale,
                NormalizeArg::MinMax => NormalizeMode::MinMax,
            };
        }
        if let Some(bins) = self.bins {
            config.threshold = ThresholdStrategy::Otsu { bins };
        }
        if let Some(value) = self.fixed_threshold {
            config.threshold = ThresholdStrategy::Fixed { value };
        }
        if let Some(cluster) = self.cluster {
            config.cluster = match cluster {
                ClusterArg::KMeans => ClusterStrategy::default(),
                ClusterArg::OptimalSplit => ClusterStrategy::OptimalSplit,
            };
        }
        if let Some(min_area) = self.min_area {
            config.regions.min_area = min_area;
        }
        if self.fill_holes {
            config.regions.fill_holes = true;
        }

        Ok(config)
    }
}

fn save_masks(dir: &Path, output: &PipelineOutput) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let images = [
        ("original.png", output.image.to_gray_image()),
        ("object_mask.png", output.masks.object.to_gray_image()),
        ("background_mask.png", output.masks.background.to_gray_image()),
    ];
    for (name, img) in images {
        let path = dir.join(name);
        img.save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Saved {}", path.display());
    }

    Ok(())
}

fn run(image: &Image, pipeline: &PipelineArgs, output: &OutputArgs) -> Result<()> {
    let pipeline = SnrPipeline::new(pipeline.to_config()?);
    log::debug!("Pipeline config: {:?}", pipeline.config());
    let result = pipeline
        .run(image)
        .with_context(|| "SNR pipeline aborted")?;

    if let Some(dir) = &output.save_masks {
        save_masks(dir, &result)?;
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&result.report)?);
    } else {
        println!("Estimated SNR: {:.2}", result.report.snr);
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            image,
            pipeline,
            output,
        } => {
            let frame =
                load_image(&image).with_context(|| format!("reading {}", image.display()))?;
            run(&frame, &pipeline, &output)
        }
        Commands::Synthetic {
            size,
            object_size,
            object_level,
            background,
            noise_std,
            seed,
            pipeline,
            output,
        } => {
            let spec = SceneSpec {
                height: size,
                width: size,
                background,
                noise_std,
                object_level,
                object_size,
                object_center: (size / 2, size / 2),
                seed,
            };
            let frame = render_scene(&spec).context("rendering synthetic frame")?;
            run(&frame, &pipeline, &output)
        }
        Commands::DefaultConfig => {
            println!("{}", SnrConfig::default().to_json()?);
            Ok(())
        }
    }
}
