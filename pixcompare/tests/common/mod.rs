//! Common test utilities for pixcompare tests.

#![allow(dead_code)]

pub mod generators;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};
use pixcompare::{RasterImage, SourceId};

/// Encode a raster as PNG bytes, for feeding the loader.
pub fn encode_png(raster: &RasterImage) -> Vec<u8> {
    let buffer = RgbaImage::from_raw(
        raster.width() as u32,
        raster.height() as u32,
        raster.as_bytes().to_vec(),
    )
    .expect("raster buffer matches its dimensions");
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(buffer)
        .write_to(&mut out, ImageFormat::Png)
        .expect("in-memory PNG encode");
    out.into_inner()
}

/// Build a raster from generator output, tagged with an opaque id.
pub fn raster(id: u64, rgba: Vec<u8>, width: usize, height: usize) -> RasterImage {
    RasterImage::from_rgba_bytes(SourceId::opaque(id), &rgba, width, height)
        .expect("generator output matches dimensions")
}
