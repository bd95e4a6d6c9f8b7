//! Constants for the comparison pipeline.
//!
//! Defaults here seed [`crate::CompareParams`]; the metric constants are fixed.

use std::time::Duration;

// ============================================================================
// Ingestion / Reconciliation
// ============================================================================

/// Largest width or height a loaded raster may have before it is scaled down.
pub const MAX_DIMENSION: u32 = 4096;

/// Allocation budget for decoding one image, in bytes (4 GiB). Large enough
/// for inputs well past [`MAX_DIMENSION`], which are scaled down after
/// decoding.
pub const DECODE_ALLOC_LIMIT: u64 = 4 << 30;

/// Absolute tolerance on `width / height` when checking that two rasters
/// share an aspect ratio.
pub const ASPECT_RATIO_TOLERANCE: f64 = 0.01;

// ============================================================================
// Metric Constants
// ============================================================================

/// Peak value of an 8-bit channel.
pub const PEAK: f64 = 255.0;

/// SSIM luminance stabilizer, `(0.01 * 255)^2`.
pub const SSIM_C1: f64 = (0.01 * PEAK) * (0.01 * PEAK);

/// SSIM contrast stabilizer, `(0.03 * 255)^2`.
pub const SSIM_C2: f64 = (0.03 * PEAK) * (0.03 * PEAK);

/// Largest per-pixel difference, `|dr| + |dg| + |db|` with all three at 255.
pub const MAX_PIXEL_DIFFERENCE: u32 = 3 * 255;

/// Gain applied to the per-pixel difference in the difference raster.
pub const DIFF_AMPLIFICATION: u32 = 3;

// ============================================================================
// Session State
// ============================================================================

/// Number of scaled rasters kept by a session cache.
pub const CACHE_CAPACITY: usize = 20;

/// Quiet period before a debounced comparison runs.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(300);
