//! Pixel-level similarity metrics.
//!
//! All metrics come out of one pass over the two buffers. Sums are kept as
//! exact integers (luma is tracked as `r + g + b`, i.e. three times the mean),
//! so the result does not depend on iteration order and matches computing
//! each metric in its own pass.
//!
//! The SSIM here is a single global window over unweighted luma. It reacts to
//! global brightness and contrast shifts rather than local structure and is not
//! a reference SSIM implementation. Its value is not clamped to `[-1, 1]`.

use std::fmt;

use imgref::ImgRef;
use rgb::RGBA8;

use crate::consts::{PEAK, SSIM_C1, SSIM_C2};
use crate::raster::RasterImage;
use crate::CompareError;

/// Result of comparing two rasters of equal size.
///
/// `pixel_differences == 0`, `max_difference == 0`, `mse == 0.0` and
/// `psnr == f64::INFINITY` always hold together.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonMetrics {
    /// Mean squared error over the R, G and B channels.
    pub mse: f64,
    /// Peak signal-to-noise ratio in dB. `f64::INFINITY` for identical images.
    #[cfg_attr(feature = "serde", serde(with = "infinite_as_null"))]
    pub psnr: f64,
    /// Simplified global SSIM over unweighted luma.
    pub ssim: f64,
    /// Number of pixels whose RGB values differ at all.
    pub pixel_differences: u64,
    /// Largest per-pixel `|dr| + |dg| + |db|`, in `0..=765`.
    pub max_difference: u32,
}

impl ComparisonMetrics {
    /// Compares two rasters of equal size. See [`compute_metrics`].
    ///
    /// # Errors
    /// Returns [`CompareError::DimensionMismatch`] if the sizes differ.
    pub fn between(a: &RasterImage, b: &RasterImage) -> Result<Self, CompareError> {
        compute_metrics(a.as_img(), b.as_img())
    }

    /// True when no pixel differs.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.pixel_differences == 0
    }
}

impl fmt::Display for ComparisonMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MSE {:.4}, PSNR ", self.mse)?;
        if self.psnr.is_infinite() {
            f.write_str("inf")?;
        } else {
            write!(f, "{:.2} dB", self.psnr)?;
        }
        write!(
            f,
            ", SSIM {:.4}, {} differing pixels, max difference {}",
            self.ssim, self.pixel_differences, self.max_difference
        )
    }
}

/// PSNR in dB for a given MSE, `20 * log10(255 / sqrt(mse))`.
///
/// Returns `f64::INFINITY` when `mse` is zero.
#[must_use]
pub fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * (PEAK / mse.sqrt()).log10()
}

/// Computes all metrics for two equally sized rasters. Alpha is ignored.
///
/// # Errors
/// Returns [`CompareError::DimensionMismatch`] if the sizes differ. Callers
/// are expected to reconcile first, so this indicates a bug.
///
/// # Example
/// ```rust
/// use pixcompare::{compute_metrics, Img, RGBA8};
///
/// let img = Img::new(vec![RGBA8::new(10, 20, 30, 255); 16], 4, 4);
/// let m = compute_metrics(img.as_ref(), img.as_ref())?;
/// assert_eq!(m.mse, 0.0);
/// assert!(m.psnr.is_infinite());
/// # Ok::<(), pixcompare::CompareError>(())
/// ```
pub fn compute_metrics(
    a: ImgRef<'_, RGBA8>,
    b: ImgRef<'_, RGBA8>,
) -> Result<ComparisonMetrics, CompareError> {
    let sums = accumulate(a, b)?;
    let mse = sums.mse();
    Ok(ComparisonMetrics {
        mse,
        psnr: psnr_from_mse(mse),
        ssim: sums.ssim(),
        pixel_differences: sums.differing,
        max_difference: sums.max_difference,
    })
}

/// Simplified global SSIM of two equally sized rasters.
///
/// # Errors
/// Returns [`CompareError::DimensionMismatch`] if the sizes differ.
pub fn simplified_ssim(a: ImgRef<'_, RGBA8>, b: ImgRef<'_, RGBA8>) -> Result<f64, CompareError> {
    Ok(accumulate(a, b)?.ssim())
}

/// Sum of absolute channel differences, ignoring alpha.
#[inline]
pub(crate) fn pixel_difference(p1: RGBA8, p2: RGBA8) -> u32 {
    u32::from(p1.r.abs_diff(p2.r)) + u32::from(p1.g.abs_diff(p2.g)) + u32::from(p1.b.abs_diff(p2.b))
}

pub(crate) fn check_same_size(
    a: ImgRef<'_, RGBA8>,
    b: ImgRef<'_, RGBA8>,
) -> Result<(), CompareError> {
    let (w1, h1) = (a.width(), a.height());
    let (w2, h2) = (b.width(), b.height());
    if w1 != w2 || h1 != h2 {
        return Err(CompareError::DimensionMismatch { w1, h1, w2, h2 });
    }
    Ok(())
}

/// Exact running sums for one comparison.
#[derive(Debug, Default)]
struct Sums {
    pixels: u64,
    squared_error: u64,
    differing: u64,
    max_difference: u32,
    // Luma sums, scaled by 3.
    luma1: u64,
    luma2: u64,
    luma1_sq: u64,
    luma2_sq: u64,
    cross: u64,
}

impl Sums {
    #[inline]
    fn add(&mut self, p1: RGBA8, p2: RGBA8) {
        let dr = i32::from(p1.r) - i32::from(p2.r);
        let dg = i32::from(p1.g) - i32::from(p2.g);
        let db = i32::from(p1.b) - i32::from(p2.b);
        self.squared_error += (dr * dr + dg * dg + db * db) as u64;

        let diff = pixel_difference(p1, p2);
        if diff > 0 {
            self.differing += 1;
        }
        self.max_difference = self.max_difference.max(diff);

        let s1 = u64::from(p1.r) + u64::from(p1.g) + u64::from(p1.b);
        let s2 = u64::from(p2.r) + u64::from(p2.g) + u64::from(p2.b);
        self.luma1 += s1;
        self.luma2 += s2;
        self.luma1_sq += s1 * s1;
        self.luma2_sq += s2 * s2;
        self.cross += s1 * s2;
        self.pixels += 1;
    }

    fn mse(&self) -> f64 {
        self.squared_error as f64 / (self.pixels as f64 * 3.0)
    }

    fn ssim(&self) -> f64 {
        let n = self.pixels as f64;
        let n_int = i128::from(self.pixels);

        let mean1 = self.luma1 as f64 / (3.0 * n);
        let mean2 = self.luma2 as f64 / (3.0 * n);

        // n * sum(x*y) - sum(x) * sum(y), exact, then scaled back by 9 * n^2.
        let central = |xy: u64, x: u64, y: u64| -> f64 {
            let num = n_int * i128::from(xy) - i128::from(x) * i128::from(y);
            num as f64 / (9.0 * n * n)
        };
        let variance1 = central(self.luma1_sq, self.luma1, self.luma1);
        let variance2 = central(self.luma2_sq, self.luma2, self.luma2);
        let covariance = central(self.cross, self.luma1, self.luma2);

        let numerator = (2.0 * mean1 * mean2 + SSIM_C1) * (2.0 * covariance + SSIM_C2);
        let denominator =
            (mean1 * mean1 + mean2 * mean2 + SSIM_C1) * (variance1 + variance2 + SSIM_C2);
        numerator / denominator
    }
}

fn accumulate(a: ImgRef<'_, RGBA8>, b: ImgRef<'_, RGBA8>) -> Result<Sums, CompareError> {
    check_same_size(a, b)?;
    if a.width() == 0 || a.height() == 0 {
        return Err(CompareError::InvalidDimensions {
            width: a.width(),
            height: a.height(),
        });
    }

    let mut sums = Sums::default();
    for (row1, row2) in a.rows().zip(b.rows()) {
        for (&p1, &p2) in row1.iter().zip(row2) {
            sums.add(p1, p2);
        }
    }
    Ok(sums)
}

#[cfg(feature = "serde")]
mod infinite_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
