use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::debug;
use volmetrics_core::config::{EvalConfig, OutputConfig};
use volmetrics_core::io::SliceAxes;
use volmetrics_core::normalize::{Normalization, PeakSource};
use volmetrics_core::{evaluate, AbortHandle};

use crate::reporter::ConsoleReporter;
use crate::summary::print_eval_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum NormalizationArg {
    /// Per-slice min-max rescale to integers (0..2^bits-1)
    Quantize,
    /// Raw samples against a run-wide peak
    Raw,
}

#[derive(Args)]
pub struct EvalArgs {
    /// Ground-truth NPY volume
    #[arg(required_unless_present = "config")]
    pub ground_truth: Option<PathBuf>,

    /// Reconstructed/denoised NPY volume
    #[arg(required_unless_present = "config")]
    pub reconstructed: Option<PathBuf>,

    /// Evaluation config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Per-slice normalization
    #[arg(long, value_enum, default_value = "quantize")]
    pub normalization: NormalizationArg,

    /// Quantization depth in bits
    #[arg(long, default_value = "8")]
    pub bits: u8,

    /// Fixed peak for raw mode (default: ground-truth global maximum)
    #[arg(long)]
    pub peak: Option<f64>,

    /// Volume axes forming the 2D slice; the other two are iterated
    #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"], default_values_t = [0usize, 1])]
    pub slice_axes: Vec<usize>,

    /// Slices between interim reports
    #[arg(long, default_value = "10000")]
    pub report_every: usize,

    /// Worker threads (1 = strictly sequential)
    #[arg(short = 'j', long, default_value = "1")]
    pub workers: usize,

    /// Write per-slice scores as CSV
    #[arg(long)]
    pub per_slice_csv: Option<PathBuf>,

    /// Write the final summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

pub fn run(args: &EvalArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid evaluation config")?
    } else {
        build_config_from_args(args)?
    };
    debug!(?config, "Resolved evaluation config");

    print_eval_summary(&config);

    let reporter = ConsoleReporter::new(config.output.per_slice_csv.as_deref())?;
    let result = evaluate(&config, &reporter, AbortHandle::new());
    reporter.close()?;

    let summary = result.with_context(|| {
        format!(
            "Evaluation of {} against {} failed",
            config.reconstructed.display(),
            config.ground_truth.display()
        )
    })?;

    if let Some(ref path) = config.output.summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        println!("\nSummary saved to {}", path.display());
    }

    Ok(())
}

fn build_config_from_args(args: &EvalArgs) -> Result<EvalConfig> {
    let ground_truth = args
        .ground_truth
        .clone()
        .context("Missing ground-truth path")?;
    let reconstructed = args
        .reconstructed
        .clone()
        .context("Missing reconstructed path")?;

    let normalization = match args.normalization {
        NormalizationArg::Quantize => Normalization::BoundedQuantization { bits: args.bits },
        NormalizationArg::Raw => Normalization::RawFloat,
    };
    let peak = match args.peak {
        Some(v) => PeakSource::Fixed(v),
        None => PeakSource::GlobalMax,
    };

    Ok(EvalConfig {
        ground_truth,
        reconstructed,
        report_every: args.report_every,
        workers: args.workers,
        peak,
        axes: SliceAxes {
            rows: args.slice_axes[0],
            cols: args.slice_axes[1],
        },
        normalization,
        output: OutputConfig {
            per_slice_csv: args.per_slice_csv.clone(),
            summary_json: args.summary_json.clone(),
        },
    })
}
