//! Streaming PSNR/SSIM evaluation of large 4-D volumes.
//!
//! Two NPY volumes are memory-mapped, compared one 2D slice at a time, and
//! the per-slice scores folded into running averages.

pub mod config;
pub mod consts;
pub mod error;
pub mod eval;
pub mod io;
pub mod metrics;
pub mod normalize;

pub use config::EvalConfig;
pub use error::{ErrorKind, EvalError, Result};
pub use eval::{evaluate, AbortHandle, BatchEvaluator, EvalSummary, ProgressReporter};
