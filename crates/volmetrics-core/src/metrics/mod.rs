pub mod psnr;
pub mod ssim;

use ndarray::ArrayViewD;

use crate::error::{EvalError, Result};

pub use psnr::{mse, psnr, psnr_2d};
pub use ssim::{ssim, ssim_2d};

/// Shared precondition for every metric: equal shapes, rank 2 or
/// rank 3 with a trailing channel axis, and a usable peak.
fn check_pair(a: &ArrayViewD<f64>, b: &ArrayViewD<f64>, peak: f64) -> Result<()> {
    check_shapes(a, b)?;
    check_peak(peak)
}

fn check_shapes(a: &ArrayViewD<f64>, b: &ArrayViewD<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(EvalError::ShapeMismatch {
            left: a.shape().to_vec(),
            right: b.shape().to_vec(),
        });
    }
    if !matches!(a.ndim(), 2 | 3) {
        return Err(EvalError::UnsupportedRank {
            ndim: a.ndim(),
            shape: a.shape().to_vec(),
        });
    }
    Ok(())
}

fn check_peak(peak: f64) -> Result<()> {
    if peak > 0.0 && peak.is_finite() {
        Ok(())
    } else {
        Err(EvalError::InvalidConfig(format!(
            "peak value must be positive and finite, got {peak}"
        )))
    }
}
