use serde::Serialize;

/// Metric values for one slice pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SliceScore {
    pub psnr: f64,
    pub ssim: f64,
}

/// Running sums for the current run.
///
/// Perfect matches (PSNR = +inf) are counted in `count` and in
/// `perfect_matches` but excluded from both the PSNR sum and the PSNR
/// denominator, so the mean PSNR is the mean over finite values only.
/// SSIM is averaged over every slice.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningAggregate {
    total_psnr: f64,
    total_ssim: f64,
    count: usize,
    perfect_matches: usize,
}

impl RunningAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, score: SliceScore) {
        if score.psnr == f64::INFINITY {
            self.perfect_matches += 1;
        } else {
            self.total_psnr += score.psnr;
        }
        self.total_ssim += score.ssim;
        self.count += 1;
    }

    /// Slices processed so far.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn perfect_matches(&self) -> usize {
        self.perfect_matches
    }

    pub fn finite_psnr_count(&self) -> usize {
        self.count - self.perfect_matches
    }

    /// Mean of finite PSNR values; `+inf` if every slice matched exactly.
    pub fn mean_psnr(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        match self.finite_psnr_count() {
            0 => Some(f64::INFINITY),
            n => Some(self.total_psnr / n as f64),
        }
    }

    pub fn mean_ssim(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_ssim / self.count as f64)
    }

    pub fn snapshot(&self, total: usize) -> Snapshot {
        Snapshot {
            processed: self.count,
            total,
            mean_psnr: self.mean_psnr().unwrap_or(f64::NAN),
            mean_ssim: self.mean_ssim().unwrap_or(f64::NAN),
            perfect_matches: self.perfect_matches,
        }
    }
}

/// Interim averages at some point of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub processed: usize,
    pub total: usize,
    pub mean_psnr: f64,
    pub mean_ssim: f64,
    pub perfect_matches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_aggregate_has_no_means() {
        let agg = RunningAggregate::new();
        assert_eq!(agg.mean_psnr(), None);
        assert_eq!(agg.mean_ssim(), None);
    }

    #[test]
    fn infinite_psnr_excluded_from_mean() {
        let mut agg = RunningAggregate::new();
        agg.push(SliceScore { psnr: 30.0, ssim: 0.8 });
        agg.push(SliceScore { psnr: f64::INFINITY, ssim: 1.0 });
        agg.push(SliceScore { psnr: 40.0, ssim: 0.9 });

        assert_eq!(agg.count(), 3);
        assert_eq!(agg.perfect_matches(), 1);
        assert_eq!(agg.mean_psnr(), Some(35.0));
        assert!((agg.mean_ssim().unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn all_perfect_is_infinite() {
        let mut agg = RunningAggregate::new();
        agg.push(SliceScore { psnr: f64::INFINITY, ssim: 1.0 });
        assert_eq!(agg.mean_psnr(), Some(f64::INFINITY));
        assert_eq!(agg.snapshot(1).perfect_matches, 1);
    }
}
