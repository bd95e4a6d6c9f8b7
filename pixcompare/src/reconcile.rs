//! Resolution reconciliation.
//!
//! Two rasters are only comparable pixel-for-pixel at one common size. The
//! common size is always the smaller of the two, so the larger input is
//! downsampled and nothing is ever upscaled.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{GenericImageView, ImageBuffer, Rgba, Rgba32FImage, RgbaImage};
use imgref::Img;
use rgb::FromSlice;

use crate::raster::{RasterImage, SourceId};
use crate::{CompareError, CompareParams};

/// A reconciled pair in input order. Inputs already at the common size come
/// back borrowed.
pub type RasterPair<'a> = (Cow<'a, RasterImage>, Cow<'a, RasterImage>);

/// Resamples `image` to `width` x `height` with `filter`.
///
/// The result keeps the source identity of `image`. Resampling to the current
/// size returns a clone sharing the same pixels.
///
/// # Errors
/// Returns [`CompareError::InvalidDimensions`] for a zero or oversized target.
pub fn resample(
    image: &RasterImage,
    width: usize,
    height: usize,
    filter: FilterType,
) -> Result<RasterImage, CompareError> {
    if width == 0 || height == 0 {
        return Err(CompareError::InvalidDimensions { width, height });
    }
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }

    let (src_w, src_h) = to_u32(image.width(), image.height())?;
    let (dst_w, dst_h) = to_u32(width, height)?;

    log::debug!(
        "resampling {} from {src_w}x{src_h} to {dst_w}x{dst_h} ({filter:?})",
        image.source()
    );

    let bytes = image.as_bytes();
    let view = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(src_w, src_h, bytes).ok_or(
        CompareError::InvalidBufferSize {
            expected: image.width() * image.height() * 4,
            actual: bytes.len(),
        },
    )?;
    let resized = resize_rgba(&view, dst_w, dst_h, filter);
    Ok(raster_from_rgba(image.source().clone(), &resized))
}

/// Resizes straight-alpha RGBA, filtering in premultiplied space so the colour
/// of transparent pixels doesn't bleed into their neighbours.
///
/// Fully opaque images are resized directly.
pub(crate) fn resize_rgba<I>(image: &I, width: u32, height: u32, filter: FilterType) -> RgbaImage
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    if image.pixels().all(|(_, _, p)| p[3] == u8::MAX) {
        return imageops::resize(image, width, height, filter);
    }

    let (src_w, src_h) = image.dimensions();
    let premultiplied = Rgba32FImage::from_fn(src_w, src_h, |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = f32::from(a) / 255.0;
        let channel = |c: u8| f32::from(c) / 255.0 * alpha;
        Rgba([channel(r), channel(g), channel(b), alpha])
    });
    let resized = imageops::resize(&premultiplied, width, height, filter);
    RgbaImage::from_fn(width, height, |x, y| unpremultiply(resized.get_pixel(x, y).0))
}

fn unpremultiply([r, g, b, a]: [f32; 4]) -> Rgba<u8> {
    if a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    let channel = |c: f32| to_u8((c / a).min(1.0));
    Rgba([channel(r), channel(g), channel(b), to_u8(a)])
}

/// Copies an `image` crate buffer into a [`RasterImage`].
pub(crate) fn raster_from_rgba(source: SourceId, buffer: &RgbaImage) -> RasterImage {
    let (w, h) = buffer.dimensions();
    let pixels = buffer.as_raw().as_rgba().to_vec();
    RasterImage::from_imgvec(source, Img::new(pixels, w as usize, h as usize))
}

fn to_u32(width: usize, height: usize) -> Result<(u32, u32), CompareError> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(CompareError::InvalidDimensions { width, height }),
    }
}

/// Fails with [`CompareError::AspectMismatch`] when the aspect ratios of `a`
/// and `b` differ by more than `tolerance`.
///
/// # Errors
/// See above.
pub fn check_aspect_ratio(
    a: &RasterImage,
    b: &RasterImage,
    tolerance: f64,
) -> Result<(), CompareError> {
    let ratio1 = a.aspect_ratio();
    let ratio2 = b.aspect_ratio();
    if (ratio1 - ratio2).abs() > tolerance {
        return Err(CompareError::AspectMismatch { ratio1, ratio2 });
    }
    Ok(())
}

/// The size both rasters are reconciled to: the smaller width and the smaller
/// height.
#[must_use]
pub fn common_resolution(a: &RasterImage, b: &RasterImage) -> (usize, usize) {
    (a.width().min(b.width()), a.height().min(b.height()))
}

/// Brings `a` and `b` to a common resolution using the resample filter from
/// `params`.
///
/// # Errors
/// Returns [`CompareError::AspectMismatch`] if the aspect ratios differ by more
/// than `params.aspect_tolerance()`.
///
/// # Example
/// ```rust
/// use pixcompare::{reconcile, CompareParams, RasterImage, SourceId, RGBA8};
///
/// let big = RasterImage::filled(SourceId::opaque(1), 200, 100, RGBA8::new(9, 9, 9, 255))?;
/// let small = RasterImage::filled(SourceId::opaque(2), 100, 50, RGBA8::new(9, 9, 9, 255))?;
///
/// let (a, b) = reconcile(&big, &small, &CompareParams::default())?;
/// assert_eq!(a.dimensions(), (100, 50));
/// assert_eq!(b.dimensions(), (100, 50));
/// # Ok::<(), pixcompare::CompareError>(())
/// ```
pub fn reconcile<'a>(
    a: &'a RasterImage,
    b: &'a RasterImage,
    params: &CompareParams,
) -> Result<RasterPair<'a>, CompareError> {
    let filter = params.filter();
    reconcile_with(a, b, params, |image, w, h| resample(image, w, h, filter))
}

/// [`reconcile`] with a caller-supplied resample primitive.
///
/// `resample` is only called for inputs that are not already at the common
/// resolution.
///
/// # Errors
/// Returns [`CompareError::AspectMismatch`] on incompatible aspect ratios and
/// propagates any error from `resample`.
pub fn reconcile_with<'a, F>(
    a: &'a RasterImage,
    b: &'a RasterImage,
    params: &CompareParams,
    mut resample: F,
) -> Result<RasterPair<'a>, CompareError>
where
    F: FnMut(&RasterImage, usize, usize) -> Result<RasterImage, CompareError>,
{
    check_aspect_ratio(a, b, params.aspect_tolerance())?;

    if a.same_size(b) {
        return Ok((Cow::Borrowed(a), Cow::Borrowed(b)));
    }

    let (width, height) = common_resolution(a, b);
    log::debug!(
        "reconciling {}x{} and {}x{} to {width}x{height}",
        a.width(),
        a.height(),
        b.width(),
        b.height()
    );

    let mut fit = |image: &'a RasterImage| -> Result<Cow<'a, RasterImage>, CompareError> {
        if image.dimensions() == (width, height) {
            Ok(Cow::Borrowed(image))
        } else {
            resample(image, width, height).map(Cow::Owned)
        }
    };

    let a = fit(a)?;
    let b = fit(b)?;
    Ok((a, b))
}
