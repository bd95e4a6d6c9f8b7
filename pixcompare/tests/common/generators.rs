//! Deterministic image generators for pixcompare tests.
//!
//! All generators return interleaved RGBA bytes with alpha 255 and use an LCG
//! PRNG so inputs are identical across platforms.

#![allow(dead_code)]

/// LCG pseudo-random number generator (deterministic)
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u8(&mut self) -> u8 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.state >> 33) & 0xFF) as u8
    }
}

/// Uniform color image.
pub fn gen_uniform(width: usize, height: usize, r: u8, g: u8, b: u8) -> Vec<u8> {
    [r, g, b, 255].repeat(width * height)
}

/// Horizontal grayscale gradient.
pub fn gen_gradient_h(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for _y in 0..height {
        for x in 0..width {
            let v = if width > 1 {
                (x * 255 / (width - 1)) as u8
            } else {
                128
            };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    data
}

/// Random noise.
pub fn gen_noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    let mut data = Vec::with_capacity(width * height * 4);
    for _ in 0..width * height {
        data.extend_from_slice(&[rng.next_u8(), rng.next_u8(), rng.next_u8(), 255]);
    }
    data
}

/// Checkerboard of `cell`-sized black and white squares.
pub fn gen_checkerboard(width: usize, height: usize, cell: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let v = if (x / cell + y / cell) % 2 == 0 { 0 } else { 255 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    data
}

/// Add `delta` to every color channel, saturating.
pub fn distort_brightness(rgba: &[u8], delta: i16) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| {
            let shift = |c: u8| (i16::from(c) + delta).clamp(0, 255) as u8;
            [shift(px[0]), shift(px[1]), shift(px[2]), px[3]]
        })
        .collect()
}
