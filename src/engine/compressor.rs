//! Encode and decode entry points.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, instrument};

use super::format::CompressedImage;
use super::report::CompressionReport;
use crate::color::ColorSpace;
use crate::config::CompressionConfig;
use crate::errors::Result;
use crate::image::{from_byte_blocks, to_blocks, RgbImage};
use crate::vector::Vector;

/// Back to RGB bytes, one pixel (three components) at a time.
fn codeword_to_bytes(codeword: &Vector, color: ColorSpace) -> Vec<u8> {
    codeword
        .chunks_exact(3)
        .flat_map(|s| color.inverse([s[0], s[1], s[2]]))
        .collect()
}

/// Quantizes `image` under `config`.
///
/// The reported distortion is measured on the decoded result against the
/// original pixels, not in the quantizer's working space.
#[instrument(skip_all, fields(
    width = image.width(),
    height = image.height(),
    quantizer = %config.quantizer,
    color_space = %config.color_space,
    bits = config.bits,
))]
pub fn compress(image: &RgbImage, config: &CompressionConfig) -> Result<(CompressedImage, CompressionReport)> {
    config.validate()?;
    let (bw, bh) = (config.block_width, config.block_height);
    let color = config.color_space;

    let started = Instant::now();
    let training_set = to_blocks(image, bw, bh, color)?;
    let quantizer = config.quantizer.build(config.refine_options(), config.bee_colony);
    let quantized = quantizer.quantize(&training_set, config.bits, config.epsilon)?;
    let codebook: Vec<Vec<u8>> = quantized
        .codebook
        .par_iter()
        .map(|c| codeword_to_bytes(c, color))
        .collect();
    let compression_time = started.elapsed();

    let compressed = CompressedImage::new(
        color,
        image.width(),
        image.height(),
        (bw, bh),
        codebook,
        quantized.assignment,
    )?;

    let restored = decompress(&compressed)?;
    let report = CompressionReport {
        distortion: image.mse(&restored)?,
        bits_per_pixel: compressed.size_in_bits() as f64 / (image.width() * image.height()) as f64,
        uncompressed_size: image.size_in_bytes(),
        compressed_size: compressed.size_in_bytes(),
        compression_time,
    };

    info!(
        blocks = training_set.len(),
        codebook = compressed.codebook().len(),
        working_distortion = quantized.distortion,
        distortion = report.distortion,
        bpp = report.bits_per_pixel,
        elapsed_ms = compression_time.as_millis() as u64,
        "image compressed"
    );
    Ok((compressed, report))
}

/// Expands every index to its stored codeword and reassembles the blocks.
#[instrument(skip_all, fields(width = compressed.width(), height = compressed.height()))]
pub fn decompress(compressed: &CompressedImage) -> Result<RgbImage> {
    let (bw, bh) = compressed.block_size();
    let codebook = compressed.codebook();
    let blocks: Vec<&[u8]> = compressed
        .assignment()
        .iter()
        .map(|&a| codebook[a].as_slice())
        .collect();
    from_byte_blocks(&blocks, compressed.width(), compressed.height(), bw, bh)
}
