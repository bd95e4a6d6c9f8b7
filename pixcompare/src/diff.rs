//! Difference map rendering.
//!
//! The difference raster encodes the per-pixel `|dr| + |dg| + |db|`, amplified
//! and clamped, in the red channel. It carries nothing beyond what the metric
//! pass already measures and exists for display.

use image::RgbaImage;
use imgref::{Img, ImgRef, ImgVec};
use rgb::{ComponentBytes, RGBA8};

use crate::consts::DIFF_AMPLIFICATION;
use crate::metrics::{check_same_size, pixel_difference};
use crate::raster::RasterImage;
use crate::reconcile::reconcile;
use crate::{CompareError, CompareParams};

/// Red-channel visualization of the difference between two rasters.
///
/// Green and blue are always 0 and alpha is always 255.
#[derive(Debug, Clone)]
pub struct DifferenceRaster {
    pixels: ImgVec<RGBA8>,
}

impl DifferenceRaster {
    /// Width in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    /// Borrowed view of the pixels.
    #[must_use]
    pub fn as_img(&self) -> ImgRef<'_, RGBA8> {
        self.pixels.as_ref()
    }

    /// Pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[RGBA8] {
        self.pixels.buf()
    }

    /// Red-channel intensity at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[must_use]
    pub fn intensity(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width(), "x {x} out of bounds");
        assert!(y < self.height(), "y {y} out of bounds");
        self.pixels.buf()[y * self.width() + x].r
    }

    /// Unwraps the pixel buffer.
    #[must_use]
    pub fn into_imgvec(self) -> ImgVec<RGBA8> {
        self.pixels
    }

    /// Converts to an `image` buffer, e.g. for encoding to PNG.
    #[must_use]
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let w = u32::try_from(self.width()).ok()?;
        let h = u32::try_from(self.height()).ok()?;
        RgbaImage::from_raw(w, h, self.pixels.buf().as_bytes().to_vec())
    }
}

/// Maps a per-pixel difference to the output intensity, `min(255, diff * 3)`.
#[inline]
#[must_use]
pub fn amplify(diff: u32) -> u8 {
    (diff * DIFF_AMPLIFICATION).min(255) as u8
}

/// Renders the difference of two rasters that already have the same size.
///
/// # Errors
/// Returns [`CompareError::DimensionMismatch`] if the sizes differ.
pub fn render_difference(
    a: ImgRef<'_, RGBA8>,
    b: ImgRef<'_, RGBA8>,
) -> Result<DifferenceRaster, CompareError> {
    check_same_size(a, b)?;

    let mut out = Vec::with_capacity(a.width() * a.height());
    for (row1, row2) in a.rows().zip(b.rows()) {
        out.extend(
            row1.iter()
                .zip(row2)
                .map(|(&p1, &p2)| RGBA8::new(amplify(pixel_difference(p1, p2)), 0, 0, 255)),
        );
    }

    Ok(DifferenceRaster {
        pixels: Img::new(out, a.width(), a.height()),
    })
}

/// Reconciles `a` and `b` and renders their difference.
///
/// # Errors
/// Returns [`CompareError::AspectMismatch`] if the rasters can't be brought to
/// a common size.
pub fn difference_image(
    a: &RasterImage,
    b: &RasterImage,
    params: &CompareParams,
) -> Result<DifferenceRaster, CompareError> {
    let (a, b) = reconcile(a, b, params)?;
    render_difference(a.as_img(), b.as_img())
}
