//! Image decoding into [`RasterImage`]s.

use std::io::Cursor;

use image::{DynamicImage, ImageError, ImageReader, Limits};

use crate::raster::{RasterImage, SourceId};
use crate::reconcile::{raster_from_rgba, resize_rgba};
use crate::{CompareError, CompareParams};

/// Size a `width` x `height` image is loaded at so that neither side exceeds
/// `max_dimension`.
///
/// Oversized images are scaled uniformly by
/// `min(max / width, max / height)`, rounding each side to the nearest integer
/// (never below 1). Images within the cap keep their native size.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let max = f64::from(max_dimension);
    let ratio = (max / f64::from(width)).min(max / f64::from(height));
    let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, max_dimension);
    (scale(width), scale(height))
}

/// Decodes `bytes` into an RGBA8 raster capped at `params.max_dimension()`.
///
/// The format is sniffed from the content; anything the enabled `image`
/// decoders understand is accepted. Oversized images are resampled with
/// `params.filter()`.
///
/// The decoder may allocate up to `params.decode_alloc_limit()` bytes. The
/// `image` crate's own default is too small for inputs this function exists
/// to scale down.
///
/// # Errors
/// Returns [`CompareError::Decode`] if the bytes can't be decoded or decoding
/// would exceed the allocation limit.
pub fn load_image(
    source: SourceId,
    bytes: &[u8],
    params: &CompareParams,
) -> Result<RasterImage, CompareError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?;
    let mut limits = Limits::default();
    limits.max_alloc = Some(params.decode_alloc_limit());
    reader.limits(limits);

    let decoded = reader.decode()?;
    Ok(normalize(source, decoded, params))
}

fn normalize(source: SourceId, decoded: DynamicImage, params: &CompareParams) -> RasterImage {
    let (width, height) = (decoded.width(), decoded.height());
    let (target_w, target_h) = fit_within(width, height, params.max_dimension());

    let rgba = if (target_w, target_h) == (width, height) {
        decoded.into_rgba8()
    } else {
        log::debug!(
            "{source}: {width}x{height} exceeds {}, loading at {target_w}x{target_h}",
            params.max_dimension()
        );
        resize_rgba(&decoded, target_w, target_h, params.filter())
    };

    raster_from_rgba(source, &rgba)
}
