//! Compression pipeline: image → block vectors → codebook + indices, and back.

mod compressor;
mod format;
mod report;

#[cfg(test)]
mod tests;

pub use compressor::{compress, decompress};
pub use format::{bits_for, CompressedImage};
pub use report::{pretty_bytes, CompressionReport};
