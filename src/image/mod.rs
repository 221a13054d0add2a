//! In-memory RGB raster plus its two codecs: PPM on disk and block vectors
//! for the quantizers.

pub mod blocks;
pub mod ppm;


use crate::color::Rgb;
use crate::errors::{Result, VqError};

pub use blocks::{block_count, block_dim, from_blocks, from_byte_blocks, grid, to_blocks};

/// Row-major 8-bit RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, pixels: Vec<Rgb>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(VqError::precondition("image dimensions must be non-zero"));
        }
        if pixels.len() != width * height {
            return Err(VqError::precondition(format!(
                "expected {} pixels for {width}x{height}, found {}",
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image of one flat color.
    pub fn filled(width: usize, height: usize, px: Rgb) -> Result<Self> {
        Self::new(width, height, vec![px; width * height])
    }

    /// Builds an image from a generator called with `(x, y)`.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> Rgb) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.pixels[y * self.width + x]
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, px: Rgb) {
        self.pixels[y * self.width + x] = px;
    }

    /// Raw sample size, three bytes per pixel.
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.pixels.len() * 3
    }

    /// Mean squared error per channel sample against `other`.
    pub fn mse(&self, other: &RgbImage) -> Result<f64> {
        if self.width != other.width || self.height != other.height {
            return Err(VqError::precondition(format!(
                "cannot compare {}x{} with {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        let sum: f64 = self
            .pixels
            .iter()
            .zip(other.pixels.iter())
            .flat_map(|(a, b)| a.iter().zip(b.iter()))
            .map(|(&a, &b)| {
                let d = f64::from(a) - f64::from(b);
                d * d
            })
            .sum();
        Ok(sum / (self.pixels.len() * 3) as f64)
    }
}
