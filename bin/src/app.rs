//! Application related stuff

use brdf_core::fourier::{ConvergencePolicy, FourierConfig};
use brdf_core::pbrt::Float;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect, validate, generate and plot Fourier BSDF tables.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Options {
    /// Number of worker threads.
    #[arg(
        long = "nthreads",
        short = 't',
        value_name = "NUM",
        default_value_t = 1,
        global = true,
        help = "Use specified number of threads."
    )]
    n_threads: usize,

    /// Interpolation weight threshold.
    #[arg(
        long = "weight-threshold",
        value_name = "FLOAT",
        default_value_t = 1e-4,
        global = true,
        help = "Skip grid cells whose interpolation weight is below this value."
    )]
    pub weight_threshold: Float,

    /// Root finder tolerance.
    #[arg(
        long,
        value_name = "FLOAT",
        default_value_t = 1e-6,
        global = true,
        help = "Relative residual at which the azimuth root finder stops."
    )]
    pub tolerance: f64,

    /// Root finder iteration cap.
    #[arg(
        long = "max-iterations",
        value_name = "NUM",
        default_value_t = 40,
        global = true,
        help = "Maximum number of azimuth root finder iterations."
    )]
    pub max_iterations: usize,

    /// Replace failed samples with cosine-weighted samples.
    #[arg(
        long,
        global = true,
        help = "Replace samples whose root finder fails with cosine-weighted samples."
    )]
    pub fallback: bool,

    /// The command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Commands.
#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Print table metadata and directional albedo estimates.
    Info {
        /// Path to the table.
        file: PathBuf,

        /// Monte-Carlo samples per albedo estimate.
        #[arg(long, value_name = "NUM", default_value_t = 4096)]
        samples: usize,
    },

    /// Validate sampling against evaluation for every outgoing elevation.
    Check {
        /// Path to the table.
        file: PathBuf,

        /// Samples per outgoing elevation.
        #[arg(long, value_name = "NUM", default_value_t = 4096)]
        samples: usize,

        /// Random sequence seed.
        #[arg(long, value_name = "NUM", default_value_t = 0)]
        seed: u64,
    },

    /// Write a synthetic reciprocal glossy table.
    Generate {
        /// Output path.
        out: PathBuf,

        /// Number of elevation cosines.
        #[arg(long = "mu-count", value_name = "NUM", default_value_t = 16)]
        mu_count: usize,

        /// Maximum Fourier order.
        #[arg(long, value_name = "NUM", default_value_t = 16)]
        order: usize,

        /// Number of channels (1 or 3).
        #[arg(long, value_name = "NUM", default_value_t = 1)]
        channels: usize,

        /// Phong exponent of the lobe.
        #[arg(long, value_name = "FLOAT", default_value_t = 20.0)]
        exponent: Float,

        /// Albedo of the lobe at normal incidence.
        #[arg(long, value_name = "FLOAT", default_value_t = 0.8)]
        albedo: Float,

        /// Relative index of refraction stored in the header.
        #[arg(long, value_name = "FLOAT", default_value_t = 1.5)]
        eta: Float,
    },

    /// Render the luminance over the incoming hemisphere to a PNG.
    Plot {
        /// Path to the table.
        file: PathBuf,

        /// Output PNG path.
        out: PathBuf,

        /// Outgoing elevation cosine.
        #[arg(long = "mu-o", value_name = "FLOAT", default_value_t = 0.7)]
        mu_o: Float,

        /// Image width and height in pixels.
        #[arg(long, value_name = "NUM", default_value_t = 256)]
        size: u32,
    },
}

impl Options {
    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = num_cpus::get();
        match self.n_threads {
            0 => {
                warn!("Invalid nthreads");
                1
            }
            n if n > max_threads => {
                warn!("Num threads > max logical CPUs {}", max_threads);
                max_threads
            }
            n => n,
        }
    }

    /// Returns the interpolation and sampling tunables.
    pub fn config(&self) -> FourierConfig {
        let policy = if self.fallback {
            ConvergencePolicy::CosineFallback
        } else {
            ConvergencePolicy::Report
        };
        FourierConfig::default()
            .with_weight_threshold(self.weight_threshold)
            .with_tolerance(self.tolerance)
            .with_max_iterations(self.max_iterations)
            .with_policy(policy)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
