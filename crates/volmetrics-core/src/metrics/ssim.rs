use ndarray::{Array2, ArrayBase, ArrayView2, ArrayViewD, Axis, Data, Dimension, Ix2, Zip};

use crate::consts::{PARALLEL_PIXEL_THRESHOLD, SSIM_K1, SSIM_K2, SSIM_SIGMA, SSIM_WINDOW_SIZE};
use crate::error::{EvalError, Result};

use super::check_pair;

/// Structural similarity between two slices.
///
/// Accepts (H, W) grayscale or (H, W, C) input; multi-channel input is
/// scored per channel and averaged. Local statistics use an 11x11 Gaussian
/// window (sigma 1.5) and only the fully covered ("valid") region, so a
/// 5 pixel border is excluded on every side.
pub fn ssim<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>, peak: f64) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    let a = a.view().into_dyn();
    let b = b.view().into_dyn();
    check_pair(&a, &b, peak)?;
    check_window(a.shape()[0], a.shape()[1])?;

    let kernel = gaussian_kernel(SSIM_WINDOW_SIZE, SSIM_SIGMA);

    if a.ndim() == 2 {
        return Ok(ssim_channel(as_2d(a)?, as_2d(b)?, peak, &kernel));
    }

    let channels = a.shape()[2];
    let mut total = 0.0;
    for c in 0..channels {
        let ac = as_2d(a.index_axis(Axis(2), c))?;
        let bc = as_2d(b.index_axis(Axis(2), c))?;
        total += ssim_channel(ac, bc, peak, &kernel);
    }
    Ok(total / channels as f64)
}

/// SSIM for single-channel slices.
pub fn ssim_2d(a: ArrayView2<f64>, b: ArrayView2<f64>, peak: f64) -> Result<f64> {
    ssim(&a, &b, peak)
}

fn as_2d(view: ArrayViewD<'_, f64>) -> Result<ArrayView2<'_, f64>> {
    let ndim = view.ndim();
    let shape = view.shape().to_vec();
    view.into_dimensionality::<Ix2>()
        .map_err(|_| EvalError::UnsupportedRank { ndim, shape })
}

fn check_window(height: usize, width: usize) -> Result<()> {
    if height < SSIM_WINDOW_SIZE || width < SSIM_WINDOW_SIZE {
        return Err(EvalError::WindowTooLarge {
            height,
            width,
            window: SSIM_WINDOW_SIZE,
        });
    }
    Ok(())
}

fn ssim_channel(a: ArrayView2<f64>, b: ArrayView2<f64>, peak: f64, kernel: &[f64]) -> f64 {
    let c1 = (SSIM_K1 * peak).powi(2);
    let c2 = (SSIM_K2 * peak).powi(2);

    let mu_a = filter_valid(a, kernel);
    let mu_b = filter_valid(b, kernel);
    let e_aa = filter_valid(a.mapv(|v| v * v).view(), kernel);
    let e_bb = filter_valid(b.mapv(|v| v * v).view(), kernel);
    let e_ab = filter_valid((&a * &b).view(), kernel);

    let sum = Zip::from(&mu_a)
        .and(&mu_b)
        .and(&e_aa)
        .and(&e_bb)
        .and(&e_ab)
        .fold(0.0f64, |acc, &ma, &mb, &saa, &sbb, &sab| {
            let ma_mb = ma * mb;
            let ma_sq = ma * ma;
            let mb_sq = mb * mb;
            let var_a = saa - ma_sq;
            let var_b = sbb - mb_sq;
            let cov = sab - ma_mb;
            acc + ((2.0 * ma_mb + c1) * (2.0 * cov + c2))
                / ((ma_sq + mb_sq + c1) * (var_a + var_b + c2))
        });

    sum / mu_a.len() as f64
}

/// Normalized 1D Gaussian of `size` taps centred on `(size - 1) / 2`.
pub(crate) fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let center = (size as f64 - 1.0) / 2.0;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (-x * x / s2).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Separable 2D correlation keeping only outputs whose window lies fully
/// inside the input. Output shape is `(h - k + 1, w - k + 1)`.
fn filter_valid(data: ArrayView2<f64>, kernel: &[f64]) -> Array2<f64> {
    let rows = correlate_valid(data, kernel, Axis(1));
    correlate_valid(rows.view(), kernel, Axis(0))
}

fn correlate_valid(data: ArrayView2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let (h, w) = data.dim();
    let span = kernel.len() - 1;
    let out_dim = if axis == Axis(1) { (h, w - span) } else { (h - span, w) };
    let mut out = Array2::<f64>::zeros(out_dim);

    let tap = |(row, col): (usize, usize)| -> f64 {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &kv)| {
                let v = if axis == Axis(1) {
                    data[[row, col + k]]
                } else {
                    data[[row + k, col]]
                };
                kv * v
            })
            .sum()
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut out).par_for_each(|idx, o| *o = tap(idx));
    } else {
        Zip::indexed(&mut out).for_each(|idx, o| *o = tap(idx));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(SSIM_WINDOW_SIZE, SSIM_SIGMA);
        assert_eq!(k.len(), 11);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..5 {
            assert!((k[i] - k[10 - i]).abs() < 1e-15);
        }
        assert!(k[5] > k[4]);
    }

    #[test]
    fn valid_filter_trims_border() {
        let data = Array2::<f64>::from_elem((20, 16), 2.0);
        let k = gaussian_kernel(SSIM_WINDOW_SIZE, SSIM_SIGMA);
        let out = filter_valid(data.view(), &k);
        assert_eq!(out.dim(), (10, 6));
        for v in out.iter() {
            assert!((v - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn valid_filter_matches_direct_window_sum() {
        let data = Array2::from_shape_fn((13, 12), |(r, c)| (r * 7 + c * 3) as f64 % 5.0);
        let k = gaussian_kernel(SSIM_WINDOW_SIZE, SSIM_SIGMA);
        let out = filter_valid(data.view(), &k);
        assert_eq!(out.dim(), (3, 2));

        let mut direct = 0.0;
        for (dr, kr) in k.iter().enumerate() {
            for (dc, kc) in k.iter().enumerate() {
                direct += kr * kc * data[[1 + dr, 1 + dc]];
            }
        }
        assert!((out[[1, 1]] - direct).abs() < 1e-12);
    }
}
