use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_REPORT_EVERY;
use crate::error::{EvalError, Result};
use crate::io::SliceAxes;
use crate::normalize::{Normalization, PeakSource};

/// Everything needed to run one evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub ground_truth: PathBuf,
    pub reconstructed: PathBuf,
    /// Slices between interim progress reports.
    #[serde(default = "default_report_every")]
    pub report_every: usize,
    /// Worker threads; 1 keeps a single slice pair resident.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub peak: PeakSource,
    #[serde(default)]
    pub axes: SliceAxes,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Optional machine-readable outputs besides the console lines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// One `index,i,j,psnr,ssim` row per slice.
    pub per_slice_csv: Option<PathBuf>,
    /// Final summary as JSON.
    pub summary_json: Option<PathBuf>,
}

fn default_report_every() -> usize {
    DEFAULT_REPORT_EVERY
}

fn default_workers() -> usize {
    1
}

impl EvalConfig {
    pub fn new(ground_truth: impl AsRef<Path>, reconstructed: impl AsRef<Path>) -> Self {
        Self {
            ground_truth: ground_truth.as_ref().to_path_buf(),
            reconstructed: reconstructed.as_ref().to_path_buf(),
            report_every: default_report_every(),
            workers: default_workers(),
            peak: PeakSource::default(),
            axes: SliceAxes::default(),
            normalization: Normalization::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.report_every == 0 {
            return Err(EvalError::InvalidConfig(
                "report_every must be at least 1".into(),
            ));
        }
        if self.workers == 0 {
            return Err(EvalError::InvalidConfig("workers must be at least 1".into()));
        }
        if let PeakSource::Fixed(v) = self.peak {
            if !(v > 0.0 && v.is_finite()) {
                return Err(EvalError::InvalidConfig(format!(
                    "fixed peak must be positive and finite, got {v}"
                )));
            }
        }
        self.axes.validate()?;
        self.normalization.validate()
    }
}
