/// Side length of the Gaussian SSIM window.
pub const SSIM_WINDOW_SIZE: usize = 11;

/// Standard deviation of the Gaussian SSIM window.
pub const SSIM_SIGMA: f64 = 1.5;

/// Luminance stabilizer coefficient: `C1 = (K1 * peak)^2`.
pub const SSIM_K1: f64 = 0.01;

/// Contrast stabilizer coefficient: `C2 = (K2 * peak)^2`.
pub const SSIM_K2: f64 = 0.03;

/// Default number of slices between interim progress reports.
pub const DEFAULT_REPORT_EVERY: usize = 10_000;

/// Default bit depth for bounded quantization (0..=255).
pub const DEFAULT_QUANTIZATION_BITS: u8 = 8;

/// Largest supported quantization depth.
pub const MAX_QUANTIZATION_BITS: u8 = 16;

/// Rank of the volumes being compared.
pub const VOLUME_RANK: usize = 4;

/// Number of slices handed to the worker pool per batch in parallel mode.
/// Only scores are retained per batch, never slice data.
pub const PARALLEL_BATCH_SIZE: usize = 1_024;

/// Elements scanned per task when computing the global maximum.
pub const GLOBAL_MAX_CHUNK_ELEMENTS: usize = 1 << 20;

/// Minimum pixel count (h*w) to use parallel convolution inside SSIM.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;
