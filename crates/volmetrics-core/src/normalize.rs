use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{DEFAULT_QUANTIZATION_BITS, MAX_QUANTIZATION_BITS};
use crate::error::{EvalError, Result};
use crate::io::Volume;

/// Per-slice rescaling applied before metrics are computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Normalization {
    /// Min-max rescale each slice to `[0, 2^bits - 1]` and round to integers.
    /// Differences smaller than one quantum are lost.
    BoundedQuantization { bits: u8 },
    /// Compare raw samples against the run-wide peak.
    RawFloat,
}

impl Default for Normalization {
    fn default() -> Self {
        Self::BoundedQuantization {
            bits: DEFAULT_QUANTIZATION_BITS,
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoundedQuantization { bits } => write!(f, "Bounded Quantization ({bits}-bit)"),
            Self::RawFloat => write!(f, "Raw Float"),
        }
    }
}

impl Normalization {
    pub fn validate(&self) -> Result<()> {
        if let Self::BoundedQuantization { bits } = *self {
            if bits == 0 || bits > MAX_QUANTIZATION_BITS {
                return Err(EvalError::InvalidConfig(format!(
                    "quantization depth must be 1..={MAX_QUANTIZATION_BITS} bits, got {bits}"
                )));
            }
        }
        Ok(())
    }
}

/// Where the dynamic-range reference for raw-float comparison comes from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakSource {
    Fixed(f64),
    /// Maximum finite sample of the ground-truth volume.
    GlobalMax,
}

impl Default for PeakSource {
    fn default() -> Self {
        Self::GlobalMax
    }
}

impl fmt::Display for PeakSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => write!(f, "Fixed ({v})"),
            Self::GlobalMax => write!(f, "Global Max"),
        }
    }
}

/// A slice pair ready for metric computation.
#[derive(Clone, Debug)]
pub struct PreparedPair {
    pub ground_truth: Array2<f64>,
    pub reconstructed: Array2<f64>,
    pub peak: f64,
}

/// Normalization policy bound to the peak value for one run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalizer {
    normalization: Normalization,
    peak: f64,
}

impl Normalizer {
    /// Bind a policy to an explicit peak. Quantization always uses its own
    /// range as the peak and ignores `raw_peak`.
    pub fn new(normalization: Normalization, raw_peak: f64) -> Result<Self> {
        normalization.validate()?;
        let peak = match normalization {
            Normalization::BoundedQuantization { bits } => f64::from(max_level(bits)),
            Normalization::RawFloat => raw_peak,
        };
        if !(peak > 0.0 && peak.is_finite()) {
            return Err(EvalError::InvalidConfig(format!(
                "peak value must be positive and finite, got {peak}"
            )));
        }
        Ok(Self {
            normalization,
            peak,
        })
    }

    /// Resolve the run-wide peak. The ground truth is only scanned when
    /// raw-float comparison asks for its global maximum.
    pub fn resolve(
        normalization: Normalization,
        source: PeakSource,
        ground_truth: &Volume,
    ) -> Result<Self> {
        let raw_peak = match (normalization, source) {
            (Normalization::BoundedQuantization { .. }, _) => 0.0,
            (Normalization::RawFloat, PeakSource::Fixed(v)) => v,
            (Normalization::RawFloat, PeakSource::GlobalMax) => {
                let max = ground_truth.global_max()?;
                info!(peak = max, path = %ground_truth.path().display(), "Computed global peak");
                max
            }
        };
        Self::new(normalization, raw_peak)
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    pub fn prepare(&self, ground_truth: Array2<f64>, reconstructed: Array2<f64>) -> PreparedPair {
        match self.normalization {
            Normalization::BoundedQuantization { bits } => PreparedPair {
                ground_truth: quantize(&ground_truth, bits),
                reconstructed: quantize(&reconstructed, bits),
                peak: self.peak,
            },
            Normalization::RawFloat => PreparedPair {
                ground_truth,
                reconstructed,
                peak: self.peak,
            },
        }
    }
}

fn max_level(bits: u8) -> u32 {
    (1u32 << bits) - 1
}

/// Min-max rescale to `[0, 2^bits - 1]`, round half to even, and cast to
/// an unsigned integer. NaN maps to 0 and infinities saturate; a constant
/// slice maps to all zeros.
pub fn quantize(slice: &Array2<f64>, bits: u8) -> Array2<f64> {
    let levels = f64::from(max_level(bits));
    let (min, max) = slice
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return Array2::zeros(slice.dim());
    }
    let range = max - min;

    slice.mapv(|v| {
        let mut x = v - min;
        if range != 0.0 {
            x /= range;
        }
        let q: u32 =
            num_traits::cast((x * levels).round_ties_even().clamp(0.0, levels)).unwrap_or(0);
        f64::from(q)
    })
}
