#![allow(dead_code)]

use std::sync::Mutex;

use ndarray::{Array2, Array4};
use tempfile::NamedTempFile;

use volmetrics_core::eval::{EvalSummary, ProgressReporter, SliceRecord, Snapshot};
use volmetrics_core::io::npy::ElementType;
use volmetrics_core::io::npy_writer::write_array;

/// Write a 4-D volume as a little-endian f64, C-order NPY temp file.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_volume(volume: &Array4<f64>) -> NamedTempFile {
    write_volume_as(volume, ElementType::F64, false)
}

pub fn write_volume_as(
    volume: &Array4<f64>,
    element: ElementType,
    fortran_order: bool,
) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".npy")
        .tempfile()
        .expect("create temp file");
    write_array(file.path(), volume, element, fortran_order).expect("write NPY volume");
    file
}

/// Smooth, textured test image with values roughly in [50, 150].
pub fn pattern_slice(h: usize, w: usize, seed: usize) -> Array2<f64> {
    let phase = seed as f64 * 0.7;
    Array2::from_shape_fn((h, w), |(r, c)| {
        100.0
            + 35.0 * (r as f64 * 0.3 + phase).sin() * (c as f64 * 0.2).cos()
            + 15.0 * ((r + 2 * c) as f64 * 0.11 + phase).cos()
    })
}

/// Deterministic pseudo-random values in [-1, 1].
pub fn noise_slice(h: usize, w: usize, seed: u64) -> Array2<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    Array2::from_shape_fn((h, w), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    })
}

/// Build an (h, w, outer, inner) volume from a per-slice generator.
pub fn build_volume(
    h: usize,
    w: usize,
    outer: usize,
    inner: usize,
    mut slice_fn: impl FnMut(usize, usize) -> Array2<f64>,
) -> Array4<f64> {
    let mut volume = Array4::<f64>::zeros((h, w, outer, inner));
    for i in 0..outer {
        for j in 0..inner {
            let s = slice_fn(i, j);
            volume
                .slice_mut(ndarray::s![.., .., i, j])
                .assign(&s);
        }
    }
    volume
}

/// Records everything the evaluator reports.
#[derive(Default)]
pub struct CollectingReporter {
    pub begun: Mutex<Option<usize>>,
    pub slices: Mutex<Vec<SliceRecord>>,
    pub interims: Mutex<Vec<Snapshot>>,
    pub finished: Mutex<Option<EvalSummary>>,
}

impl ProgressReporter for CollectingReporter {
    fn begin(&self, total: usize) {
        *self.begun.lock().unwrap() = Some(total);
    }

    fn slice(&self, record: &SliceRecord) {
        self.slices.lock().unwrap().push(*record);
    }

    fn interim(&self, snapshot: &Snapshot) {
        self.interims.lock().unwrap().push(*snapshot);
    }

    fn finish(&self, summary: &EvalSummary) {
        *self.finished.lock().unwrap() = Some(summary.clone());
    }
}
