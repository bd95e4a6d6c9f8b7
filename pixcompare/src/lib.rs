//! # pixcompare
//!
//! Pixel-level comparison of two images: mean squared error, PSNR, a
//! simplified global SSIM, differing-pixel statistics, and a red-channel
//! difference map.
//!
//! The pipeline is:
//! - **Load**: decode bytes into an RGBA8 [`RasterImage`], capped at 4096 px
//!   per side.
//! - **Reconcile**: check that both images share an aspect ratio and downsample
//!   the larger one to the smaller resolution (never upscale).
//! - **Measure / render**: compute [`ComparisonMetrics`] and a
//!   [`DifferenceRaster`] over the reconciled pair.
//!
//! A [`ComparisonSession`] ties these together with a bounded cache of
//! resampled rasters and a debouncer for bursts of comparison requests.
//!
//! ## SSIM caveat
//!
//! [`ComparisonMetrics::ssim`] uses one global window over unweighted luma
//! `(R + G + B) / 3`. It tracks global brightness and contrast, not local
//! structure, and can leave `[-1, 1]` for pathological inputs. Treat it as an
//! approximation, not a reference SSIM.
//!
//! ## Example
//!
//! ```rust
//! use pixcompare::{compare_images, CompareParams, RasterImage, SourceId, RGBA8};
//!
//! let a = RasterImage::filled(SourceId::opaque(1), 64, 32, RGBA8::new(0, 0, 0, 255))?;
//! let b = RasterImage::filled(SourceId::opaque(2), 32, 16, RGBA8::new(255, 255, 255, 255))?;
//!
//! let metrics = compare_images(&a, &b, &CompareParams::default())?;
//! assert_eq!(metrics.max_difference, 765);
//! assert_eq!(metrics.pixel_differences, 32 * 16);
//! # Ok::<(), pixcompare::CompareError>(())
//! ```
//!
//! ## Features
//!
//! - **`serde`**: `Serialize`/`Deserialize` for [`ComparisonMetrics`]. An
//!   infinite PSNR is written as `null`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod cache;
pub mod consts;
pub mod debounce;
mod diff;
pub mod loader;
mod metrics;
mod raster;
pub mod reconcile;
pub mod session;

use std::fmt;
use std::time::Duration;

pub use image::imageops::FilterType;
pub use imgref::{Img, ImgRef, ImgVec};
pub use rgb::RGBA8;

pub use cache::ScaledImageCache;
pub use debounce::Debouncer;
pub use diff::{amplify, difference_image, render_difference, DifferenceRaster};
pub use loader::load_image;
pub use metrics::{compute_metrics, psnr_from_mse, simplified_ssim, ComparisonMetrics};
pub use raster::{RasterImage, SourceId};
pub use reconcile::{reconcile, resample};
pub use session::ComparisonSession;

/// Error type for comparison operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum CompareError {
    /// The input could not be decoded as an image.
    Decode(image::ImageError),
    /// The two images' aspect ratios differ by more than the tolerance.
    AspectMismatch {
        /// First image `width / height`.
        ratio1: f64,
        /// Second image `width / height`.
        ratio2: f64,
    },
    /// Image dimensions don't match. Metric and diff functions expect
    /// reconciled input, so this is a caller bug.
    DimensionMismatch {
        /// First image width.
        w1: usize,
        /// First image height.
        h1: usize,
        /// Second image width.
        w2: usize,
        /// Second image height.
        h2: usize,
    },
    /// Zero-sized or unrepresentable dimensions.
    InvalidDimensions {
        /// Width provided.
        width: usize,
        /// Height provided.
        height: usize,
    },
    /// Buffer size doesn't match the dimensions.
    InvalidBufferSize {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// A parameter is out of range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "failed to decode image: {e}"),
            Self::AspectMismatch { ratio1, ratio2 } => write!(
                f,
                "images must have the same aspect ratio: image 1: {ratio1:.3}, image 2: {ratio2:.3}"
            ),
            Self::DimensionMismatch { w1, h1, w2, h2 } => {
                write!(f, "image dimensions don't match: {w1}x{h1} vs {w2}x{h2}")
            }
            Self::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions: {width}x{height}")
            }
            Self::InvalidBufferSize { expected, actual } => {
                write!(
                    f,
                    "buffer size {actual} doesn't match expected size {expected}"
                )
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value for {name}: {value}")
            }
        }
    }
}

impl std::error::Error for CompareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for CompareError {
    fn from(e: image::ImageError) -> Self {
        Self::Decode(e)
    }
}

/// Comparison parameters.
///
/// Use the builder pattern to construct:
/// ```rust
/// use pixcompare::{CompareParams, FilterType};
/// use std::time::Duration;
///
/// let params = CompareParams::new()
///     .with_max_dimension(2048)                        // Smaller ingest cap
///     .with_filter(FilterType::CatmullRom)             // Sharper downsampling
///     .with_debounce_delay(Duration::from_millis(150));
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CompareParams {
    max_dimension: u32,
    decode_alloc_limit: u64,
    aspect_tolerance: f64,
    filter: FilterType,
    cache_capacity: usize,
    debounce_delay: Duration,
}

impl Default for CompareParams {
    fn default() -> Self {
        Self {
            max_dimension: consts::MAX_DIMENSION,
            decode_alloc_limit: consts::DECODE_ALLOC_LIMIT,
            aspect_tolerance: consts::ASPECT_RATIO_TOLERANCE,
            filter: FilterType::Triangle,
            cache_capacity: consts::CACHE_CAPACITY,
            debounce_delay: consts::DEBOUNCE_DELAY,
        }
    }
}

impl CompareParams {
    /// Creates a new `CompareParams` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest width or height a loaded image keeps.
    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Sets how many bytes the decoder may allocate for one image.
    #[must_use]
    pub fn with_decode_alloc_limit(mut self, decode_alloc_limit: u64) -> Self {
        self.decode_alloc_limit = decode_alloc_limit;
        self
    }

    /// Sets the absolute tolerance on `width / height` between the two images.
    #[must_use]
    pub fn with_aspect_tolerance(mut self, aspect_tolerance: f64) -> Self {
        self.aspect_tolerance = aspect_tolerance;
        self
    }

    /// Sets the resampling filter used for downscaling.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Sets how many resampled rasters a session keeps.
    #[must_use]
    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Sets the quiet period before a debounced comparison runs.
    #[must_use]
    pub fn with_debounce_delay(mut self, debounce_delay: Duration) -> Self {
        self.debounce_delay = debounce_delay;
        self
    }

    /// Returns the ingest dimension cap.
    #[must_use]
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Returns the decoder allocation limit in bytes.
    #[must_use]
    pub fn decode_alloc_limit(&self) -> u64 {
        self.decode_alloc_limit
    }

    /// Returns the aspect ratio tolerance.
    #[must_use]
    pub fn aspect_tolerance(&self) -> f64 {
        self.aspect_tolerance
    }

    /// Returns the resampling filter.
    #[must_use]
    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Returns the session cache capacity.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Returns the debounce delay.
    #[must_use]
    pub fn debounce_delay(&self) -> Duration {
        self.debounce_delay
    }

    /// Checks that every parameter is usable.
    ///
    /// # Errors
    /// Returns [`CompareError::InvalidParameter`] naming the first bad value.
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.max_dimension == 0 {
            return Err(CompareError::InvalidParameter {
                name: "max_dimension",
                value: 0.0,
            });
        }
        if self.decode_alloc_limit == 0 {
            return Err(CompareError::InvalidParameter {
                name: "decode_alloc_limit",
                value: 0.0,
            });
        }
        if !self.aspect_tolerance.is_finite() || self.aspect_tolerance < 0.0 {
            return Err(CompareError::InvalidParameter {
                name: "aspect_tolerance",
                value: self.aspect_tolerance,
            });
        }
        if self.cache_capacity == 0 {
            return Err(CompareError::InvalidParameter {
                name: "cache_capacity",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Reconciles `a` and `b` and computes their metrics.
///
/// Either the full metrics are returned or an error; nothing partial.
///
/// # Errors
/// Returns [`CompareError::AspectMismatch`] if the aspect ratios are
/// incompatible.
pub fn compare_images(
    a: &RasterImage,
    b: &RasterImage,
    params: &CompareParams,
) -> Result<ComparisonMetrics, CompareError> {
    let (a, b) = reconcile(a, b, params)?;
    compute_metrics(a.as_img(), b.as_img())
}
