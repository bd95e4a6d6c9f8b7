//! A comparison session: one cache, one debouncer, one parameter set.
//!
//! The session is driven from a single event loop through `&mut self`. It owns
//! the state that must not leak between independent comparisons, so create one
//! per pair of images being compared side by side.

use std::time::{Duration, Instant};

use image::imageops::FilterType;

use crate::cache::ScaledImageCache;
use crate::debounce::Debouncer;
use crate::diff::{render_difference, DifferenceRaster};
use crate::loader::load_image;
use crate::metrics::{compute_metrics, ComparisonMetrics};
use crate::raster::{RasterImage, SourceId};
use crate::reconcile::{reconcile_with, resample, RasterPair};
use crate::{CompareError, CompareParams};

/// A debounced comparison waiting for its deadline.
#[derive(Debug)]
struct CompareRequest {
    a: RasterImage,
    b: RasterImage,
}

/// Orchestrates loading, reconciliation, metrics and difference rendering.
///
/// ```rust
/// use pixcompare::{ComparisonSession, RasterImage, SourceId, RGBA8};
///
/// let mut session = ComparisonSession::default();
/// let a = RasterImage::filled(SourceId::opaque(1), 80, 40, RGBA8::new(10, 10, 10, 255))?;
/// let b = RasterImage::filled(SourceId::opaque(2), 40, 20, RGBA8::new(10, 10, 10, 255))?;
///
/// let diff = session.difference(&a, &b)?;
/// assert_eq!((diff.width(), diff.height()), (40, 20));
///
/// // The downsampled copy of `a` is now cached for the next comparison.
/// assert_eq!(session.cache_len(), 1);
/// # Ok::<(), pixcompare::CompareError>(())
/// ```
#[derive(Debug)]
pub struct ComparisonSession {
    params: CompareParams,
    cache: ScaledImageCache,
    pending: Debouncer<CompareRequest>,
}

impl Default for ComparisonSession {
    fn default() -> Self {
        Self::from_valid_params(CompareParams::default())
    }
}

impl ComparisonSession {
    /// Creates a session with `params`.
    ///
    /// # Errors
    /// Returns [`CompareError::InvalidParameter`] if `params` don't validate.
    pub fn new(params: CompareParams) -> Result<Self, CompareError> {
        params.validate()?;
        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: CompareParams) -> Self {
        Self {
            cache: ScaledImageCache::with_capacity(params.cache_capacity()),
            pending: Debouncer::new(),
            params,
        }
    }

    /// Parameters this session runs with.
    #[must_use]
    pub fn params(&self) -> &CompareParams {
        &self.params
    }

    /// Decodes an image with the session's dimension cap.
    ///
    /// # Errors
    /// Returns [`CompareError::Decode`] if the bytes can't be decoded.
    pub fn load(&self, source: SourceId, bytes: &[u8]) -> Result<RasterImage, CompareError> {
        load_image(source, bytes, &self.params)
    }

    /// Brings `a` and `b` to a common resolution, reusing cached resamples.
    ///
    /// # Errors
    /// Returns [`CompareError::AspectMismatch`] on incompatible aspect ratios.
    pub fn reconcile<'a>(
        &mut self,
        a: &'a RasterImage,
        b: &'a RasterImage,
    ) -> Result<RasterPair<'a>, CompareError> {
        let filter = self.params.filter();
        let cache = &mut self.cache;
        reconcile_with(a, b, &self.params, |image, w, h| {
            cache.try_get_or_create(image.source(), w, h, || resample(image, w, h, filter))
        })
    }

    /// Reconciles and measures `a` against `b` immediately.
    ///
    /// # Errors
    /// Returns [`CompareError::AspectMismatch`] on incompatible aspect ratios.
    pub fn compare(
        &mut self,
        a: &RasterImage,
        b: &RasterImage,
    ) -> Result<ComparisonMetrics, CompareError> {
        let (a, b) = self.reconcile(a, b)?;
        compute_metrics(a.as_img(), b.as_img())
    }

    /// Reconciles `a` and `b` and renders their difference. Never debounced.
    ///
    /// # Errors
    /// Returns [`CompareError::AspectMismatch`] on incompatible aspect ratios.
    pub fn difference(
        &mut self,
        a: &RasterImage,
        b: &RasterImage,
    ) -> Result<DifferenceRaster, CompareError> {
        let (a, b) = self.reconcile(a, b)?;
        render_difference(a.as_img(), b.as_img())
    }

    /// Queues a comparison to run once the debounce delay passes without
    /// another request. An earlier request that hasn't run yet is dropped.
    pub fn request_compare(&mut self, a: &RasterImage, b: &RasterImage) {
        self.request_compare_at(a, b, Instant::now());
    }

    /// [`request_compare`](Self::request_compare) with an explicit current time.
    pub fn request_compare_at(&mut self, a: &RasterImage, b: &RasterImage, now: Instant) {
        let request = CompareRequest {
            a: a.clone(),
            b: b.clone(),
        };
        self.pending
            .schedule_at(request, self.params.debounce_delay(), now);
    }

    /// Runs the queued comparison if it is due.
    ///
    /// Returns `None` while nothing is due.
    pub fn poll_compare(&mut self) -> Option<Result<ComparisonMetrics, CompareError>> {
        self.poll_compare_at(Instant::now())
    }

    /// [`poll_compare`](Self::poll_compare) with an explicit current time.
    pub fn poll_compare_at(
        &mut self,
        now: Instant,
    ) -> Option<Result<ComparisonMetrics, CompareError>> {
        let request = self.pending.poll_at(now)?;
        Some(self.compare(&request.a, &request.b))
    }

    /// When the queued comparison becomes due, for arming a wake-up.
    #[must_use]
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.deadline()
    }

    /// Time left until the queued comparison is due.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending_deadline()
            .map(|due| due.saturating_duration_since(now))
    }

    /// Drops the queued comparison. Returns whether one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.cancel().is_some()
    }

    /// A copy of `source` scaled by `scale`, for viewing at a zoom level.
    ///
    /// The target size is `round(width * scale)` x `round(height * scale)`
    /// (at least 1x1). Magnification uses nearest-neighbour sampling so
    /// individual pixels stay crisp; reduction uses the session filter.
    ///
    /// Neither side of the copy may exceed `params.max_dimension()`, the same
    /// cap loaded images are held to.
    ///
    /// # Errors
    /// Returns [`CompareError::InvalidParameter`] unless `scale` is finite and
    /// positive, or if the scaled copy would exceed the dimension cap.
    pub fn scaled(&mut self, source: &RasterImage, scale: f64) -> Result<RasterImage, CompareError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CompareError::InvalidParameter {
                name: "scale",
                value: scale,
            });
        }
        let target = |side: usize| ((side as f64 * scale).round() as usize).max(1);
        let (width, height) = (target(source.width()), target(source.height()));
        let cap = self.params.max_dimension() as usize;
        if width > cap || height > cap {
            log::debug!(
                "refusing to scale {} by {scale}: {width}x{height} exceeds {cap}",
                source.source()
            );
            return Err(CompareError::InvalidParameter {
                name: "scale",
                value: scale,
            });
        }
        let filter = if scale > 1.0 {
            FilterType::Nearest
        } else {
            self.params.filter()
        };
        self.cache
            .try_get_or_create(source.source(), width, height, || {
                resample(source, width, height, filter)
            })
    }

    /// Number of cached resampled rasters.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached resampled raster.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
