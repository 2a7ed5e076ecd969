use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{GLOBAL_MAX_CHUNK_ELEMENTS, VOLUME_RANK};
use crate::error::{EvalError, Result};
use crate::io::npy::{parse_header, Dtype, NpyHeader};

/// Which two volume axes form the 2D slice plane.
///
/// The remaining two axes, in ascending order, index the slice grid
/// (outer, inner).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceAxes {
    pub rows: usize,
    pub cols: usize,
}

impl Default for SliceAxes {
    fn default() -> Self {
        Self { rows: 0, cols: 1 }
    }
}

impl fmt::Display for SliceAxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (outer, inner) = self.iterated();
        write!(
            f,
            "slice axes ({}, {}), iterating ({}, {})",
            self.rows, self.cols, outer, inner
        )
    }
}

impl SliceAxes {
    pub fn validate(&self) -> Result<()> {
        if self.rows >= VOLUME_RANK || self.cols >= VOLUME_RANK {
            return Err(EvalError::InvalidConfig(format!(
                "slice axes ({}, {}) out of range for a {VOLUME_RANK}-D volume",
                self.rows, self.cols
            )));
        }
        if self.rows == self.cols {
            return Err(EvalError::InvalidConfig(format!(
                "slice axes must differ, got ({}, {})",
                self.rows, self.cols
            )));
        }
        Ok(())
    }

    /// The (outer, inner) iterated axes. Assumes `validate` passed.
    pub fn iterated(&self) -> (usize, usize) {
        let mut rest = (0..VOLUME_RANK).filter(|a| *a != self.rows && *a != self.cols);
        let outer = rest.next().unwrap_or(0);
        let inner = rest.next().unwrap_or(0);
        (outer, inner)
    }
}

/// Read-only, memory-mapped 4-D NPY volume.
///
/// Slices are decoded on demand straight from the mapping, so resident
/// memory is bounded by what the OS pages in.
pub struct Volume {
    path: PathBuf,
    mmap: Mmap,
    header: NpyHeader,
    strides: Vec<usize>,
}

impl Volume {
    /// Map an NPY file and validate its header.
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |source: std::io::Error| EvalError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        // Inputs must not be modified while mapped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(open_err)?;

        let header = parse_header(&mmap, path)?;

        if header.shape.len() != VOLUME_RANK {
            return Err(EvalError::InvalidNpy {
                path: path.to_path_buf(),
                reason: format!(
                    "expected a {VOLUME_RANK}-D array, got shape {:?}",
                    header.shape
                ),
            });
        }

        // Cannot overflow: parse_header bounds offset + data length.
        let expected = header.data_offset + header.data_len();
        if mmap.len() < expected {
            return Err(EvalError::InvalidNpy {
                path: path.to_path_buf(),
                reason: format!(
                    "file truncated: expected at least {} bytes, got {}",
                    expected,
                    mmap.len()
                ),
            });
        }

        debug!(
            path = %path.display(),
            shape = ?header.shape,
            dtype = %header.dtype.descr(),
            fortran_order = header.fortran_order,
            "Mapped volume"
        );

        let strides = header.strides();
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            header,
            strides,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &NpyHeader {
        &self.header
    }

    pub fn shape(&self) -> &[usize] {
        &self.header.shape
    }

    pub fn dtype(&self) -> Dtype {
        self.header.dtype
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.header.element_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of one slice plane (rows, cols).
    pub fn slice_dims(&self, axes: SliceAxes) -> (usize, usize) {
        (self.header.shape[axes.rows], self.header.shape[axes.cols])
    }

    /// Extent of the slice grid (outer, inner).
    pub fn grid_dims(&self, axes: SliceAxes) -> (usize, usize) {
        let (outer, inner) = axes.iterated();
        (self.header.shape[outer], self.header.shape[inner])
    }

    fn data(&self) -> &[u8] {
        let start = self.header.data_offset;
        &self.mmap[start..start + self.header.data_len()]
    }

    /// Decode the 2D slice at grid coordinate (i, j).
    pub fn slice(&self, axes: SliceAxes, i: usize, j: usize) -> Result<Array2<f64>> {
        axes.validate()?;
        let (outer_axis, inner_axis) = axes.iterated();
        let (outer, inner) = self.grid_dims(axes);
        if i >= outer || j >= inner {
            return Err(EvalError::SliceIndexOutOfRange { i, j, outer, inner });
        }

        let base = i * self.strides[outer_axis] + j * self.strides[inner_axis];
        let row_stride = self.strides[axes.rows];
        let col_stride = self.strides[axes.cols];
        let size = self.header.dtype.size();
        let dtype = self.header.dtype;
        let data = self.data();

        Ok(Array2::from_shape_fn(self.slice_dims(axes), |(r, c)| {
            let offset = (base + r * row_stride + c * col_stride) * size;
            dtype.decode(&data[offset..offset + size])
        }))
    }

    /// Largest finite sample in the volume. NaN and infinities are skipped.
    pub fn global_max(&self) -> Result<f64> {
        let size = self.header.dtype.size();
        let dtype = self.header.dtype;

        let max = self
            .data()
            .par_chunks(GLOBAL_MAX_CHUNK_ELEMENTS * size)
            .map(|chunk| {
                chunk
                    .chunks_exact(size)
                    .map(|b| dtype.decode(b))
                    .filter(|v| v.is_finite())
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .reduce(|| f64::NEG_INFINITY, f64::max);

        if max == f64::NEG_INFINITY {
            return Err(EvalError::EmptyVolume(self.path.clone()));
        }
        Ok(max)
    }

    /// Fail with a storage error if `other` has a different shape.
    pub fn ensure_same_shape(&self, other: &Volume) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(EvalError::VolumeShapeMismatch {
                ground_truth: self.path.clone(),
                ground_truth_shape: self.shape().to_vec(),
                reconstructed: other.path.clone(),
                reconstructed_shape: other.shape().to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_axes_iterate_trailing_pair() {
        assert_eq!(SliceAxes::default().iterated(), (2, 3));
        assert_eq!(SliceAxes { rows: 2, cols: 3 }.iterated(), (0, 1));
        assert_eq!(SliceAxes { rows: 3, cols: 0 }.iterated(), (1, 2));
    }

    #[test]
    fn axes_validation() {
        assert!(SliceAxes { rows: 1, cols: 1 }.validate().is_err());
        assert!(SliceAxes { rows: 0, cols: 4 }.validate().is_err());
        assert!(SliceAxes { rows: 3, cols: 1 }.validate().is_ok());
    }
}
