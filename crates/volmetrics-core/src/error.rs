use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid NPY file {}: {reason}", .path.display())]
    InvalidNpy { path: PathBuf, reason: String },

    #[error("Unsupported NPY dtype '{0}'")]
    UnsupportedDtype(String),

    #[error(
        "Volume shapes differ: {} has {:?}, {} has {:?}",
        .ground_truth.display(),
        .ground_truth_shape,
        .reconstructed.display(),
        .reconstructed_shape
    )]
    VolumeShapeMismatch {
        ground_truth: PathBuf,
        ground_truth_shape: Vec<usize>,
        reconstructed: PathBuf,
        reconstructed_shape: Vec<usize>,
    },

    #[error("Slice ({i}, {j}) out of range for grid {outer}x{inner}")]
    SliceIndexOutOfRange {
        i: usize,
        j: usize,
        outer: usize,
        inner: usize,
    },

    #[error("Volume {} has no slices or no finite samples", .0.display())]
    EmptyVolume(PathBuf),

    #[error("Slice shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    #[error("Slice {height}x{width} is smaller than the {window}x{window} SSIM window")]
    WindowTooLarge {
        height: usize,
        width: usize,
        window: usize,
    },

    #[error("Unsupported slice rank {ndim} (shape {shape:?}); expected (H, W) or (H, W, C)")]
    UnsupportedRank { ndim: usize, shape: Vec<usize> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Evaluation aborted after {processed}/{total} slices")]
    Aborted { processed: usize, total: usize },
}

/// Coarse classification of [`EvalError`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Shape,
    UnsupportedRank,
    Config,
    Aborted,
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::Open { .. }
            | Self::InvalidNpy { .. }
            | Self::UnsupportedDtype(_)
            | Self::VolumeShapeMismatch { .. }
            | Self::SliceIndexOutOfRange { .. }
            | Self::EmptyVolume(_) => ErrorKind::Storage,
            Self::ShapeMismatch { .. } | Self::WindowTooLarge { .. } => ErrorKind::Shape,
            Self::UnsupportedRank { .. } => ErrorKind::UnsupportedRank,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Aborted { .. } => ErrorKind::Aborted,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
