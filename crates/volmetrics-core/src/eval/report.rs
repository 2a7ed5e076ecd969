use serde::Serialize;

use crate::normalize::Normalization;

use super::aggregate::{SliceScore, Snapshot};

/// One evaluated slice pair, in visiting order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SliceRecord {
    pub index: usize,
    pub i: usize,
    pub j: usize,
    #[serde(flatten)]
    pub score: SliceScore,
}

/// Final result of a completed run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvalSummary {
    pub total_slices: usize,
    pub processed: usize,
    /// Mean over finite PSNR values (dB).
    pub mean_psnr: f64,
    pub mean_ssim: f64,
    /// Slices whose PSNR was +inf (identical after normalization).
    pub perfect_matches: usize,
    pub peak: f64,
    pub normalization: Normalization,
}

/// Receives progress from the evaluator.
///
/// Called only from the aggregating thread, in slice order. All methods
/// default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// The run is about to process `total` slices.
    fn begin(&self, _total: usize) {}

    /// One slice pair has been scored and aggregated.
    fn slice(&self, _record: &SliceRecord) {}

    /// Interim averages, emitted on the configured cadence and at the last slice.
    fn interim(&self, _snapshot: &Snapshot) {}

    /// The run completed.
    fn finish(&self, _summary: &EvalSummary) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// When interim reports fire: every `every` slices and at the last one,
/// never at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    every: usize,
    total: usize,
}

impl Cadence {
    pub fn new(every: usize, total: usize) -> Self {
        Self {
            every: every.max(1),
            total,
        }
    }

    pub fn should_report(&self, processed: usize) -> bool {
        processed > 0 && (processed % self.every == 0 || processed == self.total)
    }
}

pub fn interim_lines(snapshot: &Snapshot) -> Vec<String> {
    vec![
        format!("Processed {}/{} slices", snapshot.processed, snapshot.total),
        format!(
            "Interim Average PSNR: {:.4} dB | SSIM: {:.4}",
            snapshot.mean_psnr, snapshot.mean_ssim
        ),
    ]
}

pub fn final_lines(summary: &EvalSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Final PSNR: {:.4} dB", summary.mean_psnr),
        format!("Final SSIM: {:.4}", summary.mean_ssim),
    ];
    if summary.perfect_matches > 0 {
        lines.push(format!(
            "Perfect matches: {} (excluded from PSNR average)",
            summary.perfect_matches
        ));
    }
    lines
}
