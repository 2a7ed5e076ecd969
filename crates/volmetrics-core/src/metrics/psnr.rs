use ndarray::{ArrayBase, ArrayView2, ArrayViewD, Data, Dimension, Zip};

use crate::error::Result;

use super::{check_pair, check_shapes};

/// Mean squared error between two slices of equal shape.
pub fn mse<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    let a = a.view().into_dyn();
    let b = b.view().into_dyn();
    check_shapes(&a, &b)?;
    Ok(squared_error_mean(&a, &b))
}

fn squared_error_mean(a: &ArrayViewD<f64>, b: &ArrayViewD<f64>) -> f64 {
    let sum = Zip::from(a).and(b).fold(0.0f64, |acc, &x, &y| {
        let d = x - y;
        acc + d * d
    });
    sum / a.len() as f64
}

/// Peak signal-to-noise ratio in dB.
///
/// Identical inputs (MSE == 0) yield `f64::INFINITY`.
pub fn psnr<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>, peak: f64) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    let a = a.view().into_dyn();
    let b = b.view().into_dyn();
    check_pair(&a, &b, peak)?;
    Ok(psnr_from_mse(squared_error_mean(&a, &b), peak))
}

/// PSNR for single-channel slices.
pub fn psnr_2d(a: ArrayView2<f64>, b: ArrayView2<f64>, peak: f64) -> Result<f64> {
    psnr(&a, &b, peak)
}

fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * (peak / mse.sqrt()).log10()
}
