use std::ops::Range;

/// The (outer, inner) index space of slices, visited row-major.
///
/// Iteration is lazy and restartable; batches hand out contiguous runs of
/// flat indices so workers can share the same order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceGrid {
    outer: usize,
    inner: usize,
}

impl SliceGrid {
    pub fn new(outer: usize, inner: usize) -> Self {
        Self { outer, inner }
    }

    pub fn outer(&self) -> usize {
        self.outer
    }

    pub fn inner(&self) -> usize {
        self.inner
    }

    pub fn len(&self) -> usize {
        self.outer * self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the `index`-th slice in visiting order.
    pub fn coords(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.len()).then(|| (index / self.inner, index % self.inner))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (usize, usize)> {
        let inner = self.inner;
        (0..self.len()).map(move |k| (k / inner, k % inner))
    }

    /// Consecutive flat-index ranges of at most `size` slices.
    pub fn batches(&self, size: usize) -> impl Iterator<Item = Range<usize>> {
        let total = self.len();
        let size = size.max(1);
        (0..total)
            .step_by(size)
            .map(move |start| start..(start + size).min(total))
    }
}
