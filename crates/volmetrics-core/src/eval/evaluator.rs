use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::EvalConfig;
use crate::consts::{DEFAULT_REPORT_EVERY, PARALLEL_BATCH_SIZE};
use crate::error::{EvalError, Result};
use crate::io::{SliceAxes, Volume};
use crate::metrics;
use crate::normalize::Normalizer;

use super::aggregate::{RunningAggregate, SliceScore};
use super::grid::SliceGrid;
use super::report::{Cadence, EvalSummary, ProgressReporter, SliceRecord};

/// Cooperative cancellation flag, checked between slices (or batches).
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Streams slice pairs out of two volumes and aggregates PSNR/SSIM.
pub struct BatchEvaluator<'a> {
    ground_truth: &'a Volume,
    reconstructed: &'a Volume,
    axes: SliceAxes,
    grid: SliceGrid,
    normalizer: Normalizer,
    report_every: usize,
    workers: usize,
    abort: AbortHandle,
}

impl<'a> BatchEvaluator<'a> {
    /// Check every precondition that does not need slice data.
    pub fn new(
        ground_truth: &'a Volume,
        reconstructed: &'a Volume,
        axes: SliceAxes,
        normalizer: Normalizer,
    ) -> Result<Self> {
        ground_truth.ensure_same_shape(reconstructed)?;
        axes.validate()?;

        let (outer, inner) = ground_truth.grid_dims(axes);
        let (rows, cols) = ground_truth.slice_dims(axes);
        if outer * inner == 0 || rows * cols == 0 {
            return Err(EvalError::EmptyVolume(ground_truth.path().to_path_buf()));
        }

        Ok(Self {
            ground_truth,
            reconstructed,
            axes,
            grid: SliceGrid::new(outer, inner),
            normalizer,
            report_every: DEFAULT_REPORT_EVERY,
            workers: 1,
            abort: AbortHandle::new(),
        })
    }

    pub fn report_every(mut self, every: usize) -> Self {
        self.report_every = every.max(1);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn grid(&self) -> SliceGrid {
        self.grid
    }

    /// Score the slice pair at (i, j).
    pub fn score_slice(&self, i: usize, j: usize) -> Result<SliceScore> {
        let gt = self.ground_truth.slice(self.axes, i, j)?;
        let rc = self.reconstructed.slice(self.axes, i, j)?;
        let pair = self.normalizer.prepare(gt, rc);
        Ok(SliceScore {
            psnr: metrics::psnr(&pair.reconstructed, &pair.ground_truth, pair.peak)?,
            ssim: metrics::ssim(&pair.reconstructed, &pair.ground_truth, pair.peak)?,
        })
    }

    /// Process the whole grid. Any error aborts the run without a summary.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<EvalSummary> {
        let total = self.grid.len();
        info!(
            total_slices = total,
            grid = ?(self.grid.outer(), self.grid.inner()),
            axes = %self.axes,
            normalization = %self.normalizer.normalization(),
            peak = self.normalizer.peak(),
            workers = self.workers,
            "Starting evaluation"
        );
        reporter.begin(total);

        let mut agg = RunningAggregate::new();
        let cadence = Cadence::new(self.report_every, total);

        if self.workers == 1 {
            for (index, (i, j)) in self.grid.iter().enumerate() {
                self.check_abort(&agg, total)?;
                let score = self.score_slice(i, j)?;
                self.record(&mut agg, &cadence, reporter, index, score);
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
                .map_err(|e| EvalError::InvalidConfig(format!("failed to build worker pool: {e}")))?;

            for batch in self.grid.batches(PARALLEL_BATCH_SIZE) {
                self.check_abort(&agg, total)?;
                debug!(start = batch.start, end = batch.end, "Scoring batch");
                let scores: Vec<SliceScore> = pool.install(|| {
                    batch
                        .clone()
                        .into_par_iter()
                        .map(|index| {
                            let (i, j) = self.coords(index)?;
                            self.score_slice(i, j)
                        })
                        .collect::<Result<Vec<SliceScore>>>()
                })?;
                for (index, score) in batch.zip(scores) {
                    self.record(&mut agg, &cadence, reporter, index, score);
                }
            }
        }

        let summary = EvalSummary {
            total_slices: total,
            processed: agg.count(),
            mean_psnr: agg.mean_psnr().unwrap_or(f64::NAN),
            mean_ssim: agg.mean_ssim().unwrap_or(f64::NAN),
            perfect_matches: agg.perfect_matches(),
            peak: self.normalizer.peak(),
            normalization: self.normalizer.normalization(),
        };
        info!(
            mean_psnr = summary.mean_psnr,
            mean_ssim = summary.mean_ssim,
            perfect_matches = summary.perfect_matches,
            "Evaluation complete"
        );
        reporter.finish(&summary);
        Ok(summary)
    }

    fn coords(&self, index: usize) -> Result<(usize, usize)> {
        self.grid
            .coords(index)
            .ok_or(EvalError::SliceIndexOutOfRange {
                i: index / self.grid.inner(),
                j: index % self.grid.inner(),
                outer: self.grid.outer(),
                inner: self.grid.inner(),
            })
    }

    fn check_abort(&self, agg: &RunningAggregate, total: usize) -> Result<()> {
        if self.abort.is_aborted() {
            return Err(EvalError::Aborted {
                processed: agg.count(),
                total,
            });
        }
        Ok(())
    }

    fn record(
        &self,
        agg: &mut RunningAggregate,
        cadence: &Cadence,
        reporter: &dyn ProgressReporter,
        index: usize,
        score: SliceScore,
    ) {
        agg.push(score);
        let (i, j) = (index / self.grid.inner(), index % self.grid.inner());
        reporter.slice(&SliceRecord { index, i, j, score });
        if cadence.should_report(agg.count()) {
            reporter.interim(&agg.snapshot(self.grid.len()));
        }
    }
}

/// Open both volumes, resolve the peak and run the evaluation.
///
/// Storage problems (unreadable files, bad headers, differing shapes) are
/// reported before any slice is read.
pub fn evaluate(
    config: &EvalConfig,
    reporter: &dyn ProgressReporter,
    abort: AbortHandle,
) -> Result<EvalSummary> {
    config.validate()?;

    let ground_truth = Volume::open(&config.ground_truth)?;
    let reconstructed = Volume::open(&config.reconstructed)?;
    ground_truth.ensure_same_shape(&reconstructed)?;

    let normalizer = Normalizer::resolve(config.normalization, config.peak, &ground_truth)?;

    BatchEvaluator::new(&ground_truth, &reconstructed, config.axes, normalizer)?
        .report_every(config.report_every)
        .workers(config.workers)
        .abort_handle(abort)
        .run(reporter)
}
