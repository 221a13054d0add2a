//! Lossy image compression by vector quantization.
//!
//! An image is cut into fixed-size blocks, each block becomes one vector in a
//! chosen color space, a quantizer fits a small codebook to those vectors and
//! the image is stored as codebook plus one index per block.

pub mod color;
pub mod config;
pub mod engine;
pub mod errors;
pub mod image;
pub mod index;
pub mod quantizer;
pub mod vector;

pub use color::{ColorSpace, Rgb};
pub use config::{CompressionConfig, CompressionConfigBuilder};
pub use engine::{compress, decompress, CompressedImage, CompressionReport};
pub use errors::{Result, VqError, VqErrorCode};
pub use image::RgbImage;
pub use quantizer::{
    BeeColony, BeeColonyParams, CancelToken, Lbg, LbgMedianCut, MedianCut, Quantization, Quantizer,
    QuantizerKind, RefineOptions,
};
pub use vector::{Scalar, Vector};
