//! Raster buffer types for pixcompare.
//!
//! Every input is turned into a [`RasterImage`] at ingestion, so the rest of the
//! pipeline never branches on where the pixels came from.

use std::fmt;
use std::sync::Arc;

use imgref::{Img, ImgRef, ImgVec};
use rgb::{ComponentBytes, FromSlice, RGBA8};

use crate::CompareError;

/// Identity of the resource a raster was decoded from.
///
/// Used as the cache key together with the target dimensions, so two rasters
/// with the same identity must have been produced from the same input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// A file-like input identified by name and byte size.
    File {
        /// File name as reported by the uploader.
        name: Arc<str>,
        /// Size of the encoded input in bytes.
        size: u64,
    },
    /// Caller-assigned identifier.
    Opaque(u64),
}

impl SourceId {
    /// Identity for a named input of `size` encoded bytes.
    #[must_use]
    pub fn file(name: impl Into<Arc<str>>, size: u64) -> Self {
        Self::File {
            name: name.into(),
            size,
        }
    }

    /// Identity from a caller-assigned id.
    #[must_use]
    pub fn opaque(id: u64) -> Self {
        Self::Opaque(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { name, size } => write!(f, "{name} ({size} bytes)"),
            Self::Opaque(id) => write!(f, "#{id}"),
        }
    }
}

/// Row-major RGBA8 raster tagged with its source identity.
///
/// Pixel storage is immutable and reference counted: cloning a raster is cheap
/// and never copies pixels. Resampled rasters are new instances that keep the
/// identity of the raster they were derived from.
///
/// Invariants: `width >= 1`, `height >= 1`, and the buffer holds exactly
/// `width * height` pixels with no row padding.
#[derive(Debug, Clone)]
pub struct RasterImage {
    source: SourceId,
    pixels: Arc<ImgVec<RGBA8>>,
}

impl RasterImage {
    /// Creates a raster from a pixel vector.
    ///
    /// # Errors
    /// Returns an error if either dimension is zero or the buffer length is
    /// not `width * height`.
    pub fn new(
        source: SourceId,
        pixels: Vec<RGBA8>,
        width: usize,
        height: usize,
    ) -> Result<Self, CompareError> {
        let expected = checked_area(width, height)?;
        if pixels.len() != expected {
            return Err(CompareError::InvalidBufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self::from_imgvec(source, Img::new(pixels, width, height)))
    }

    /// Creates a raster from interleaved RGBA bytes (`width * height * 4` long).
    ///
    /// # Errors
    /// Returns an error if either dimension is zero or the byte length doesn't
    /// match the dimensions.
    pub fn from_rgba_bytes(
        source: SourceId,
        bytes: &[u8],
        width: usize,
        height: usize,
    ) -> Result<Self, CompareError> {
        let expected = checked_area(width, height)?
            .checked_mul(4)
            .ok_or(CompareError::InvalidDimensions { width, height })?;
        if bytes.len() != expected {
            return Err(CompareError::InvalidBufferSize {
                expected,
                actual: bytes.len(),
            });
        }
        Self::new(source, bytes.as_rgba().to_vec(), width, height)
    }

    /// Creates a raster filled with a single color.
    ///
    /// # Errors
    /// Returns an error if either dimension is zero.
    pub fn filled(
        source: SourceId,
        width: usize,
        height: usize,
        color: RGBA8,
    ) -> Result<Self, CompareError> {
        let len = checked_area(width, height)?;
        Self::new(source, vec![color; len], width, height)
    }

    /// Wraps an unpadded, non-empty buffer. Callers uphold the invariants.
    pub(crate) fn from_imgvec(source: SourceId, pixels: ImgVec<RGBA8>) -> Self {
        debug_assert_eq!(pixels.stride(), pixels.width());
        debug_assert!(pixels.width() > 0 && pixels.height() > 0);
        Self {
            source,
            pixels: Arc::new(pixels),
        }
    }

    /// Identity of the input this raster was produced from.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &SourceId {
        &self.source
    }

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

    /// `(width, height)`.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// `width / height`.
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    /// Borrowed view for the metric and diff functions.
    #[inline]
    #[must_use]
    pub fn as_img(&self) -> ImgRef<'_, RGBA8> {
        (*self.pixels).as_ref()
    }

    /// All pixels in row-major order.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[RGBA8] {
        self.pixels.buf()
    }

    /// Interleaved RGBA bytes, `width * height * 4` long.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.buf().as_bytes()
    }

    /// Pixel at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is out of bounds.
    #[inline]
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> RGBA8 {
        assert!(x < self.width(), "x {x} out of bounds");
        assert!(y < self.height(), "y {y} out of bounds");
        self.pixels.buf()[y * self.width() + x]
    }

    /// Checks if two rasters have the same dimensions.
    #[must_use]
    pub fn same_size(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
    }

    /// True when both rasters share one pixel allocation.
    #[must_use]
    pub fn shares_pixels(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

fn checked_area(width: usize, height: usize) -> Result<usize, CompareError> {
    if width == 0 || height == 0 {
        return Err(CompareError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(CompareError::InvalidDimensions { width, height })
}
