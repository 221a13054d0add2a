//! Persisted compressed artifact.
//!
//! Layout:
//!
//! ```text
//! <bits> <color-space-id> <assigned-count> <width> <height> <block-w> <block-h>\n
//! 2^bits codewords, block-w * block-h * 3 bytes each, index order
//! assigned-count indices, ceil(bits / 8) bytes each, little-endian
//! ```
//!
//! A codebook shorter than `2^bits` is padded with zero codewords on disk.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use crate::color::ColorSpace;
use crate::errors::{Result, VqError};
use crate::image::{block_dim, grid};
use crate::quantizer::MAX_BITS;

/// Upper bound on the header line, newline included.
const MAX_HEADER_LEN: u64 = 256;

/// Largest raster (in pixels) a persisted header may announce.
pub(crate) const MAX_PIXELS: usize = 1 << 28;

/// Block grid size, `None` on overflow.
fn checked_block_count(width: usize, height: usize, bw: usize, bh: usize) -> Option<usize> {
    let (w_blocks, h_blocks) = grid(width, height, bw, bh);
    w_blocks.checked_mul(h_blocks)
}

/// Bytes per stored codeword, `None` on overflow.
fn checked_block_dim(bw: usize, bh: usize) -> Option<usize> {
    bw.checked_mul(bh)?.checked_mul(3)
}

/// `ceil(log2(n))`; zero for `n <= 1`.
#[inline]
pub fn bits_for(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

// ------------------------------------------------------------------
// 1. In-memory artifact
// ------------------------------------------------------------------

/// Codebook in RGB bytes plus one codebook index per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    color_space: ColorSpace,
    width: usize,
    height: usize,
    block_width: usize,
    block_height: usize,
    codebook: Vec<Vec<u8>>,
    assignment: Vec<usize>,
}

impl CompressedImage {
    /// Checks that the pieces describe one consistent image.
    pub fn new(
        color_space: ColorSpace,
        width: usize,
        height: usize,
        (block_width, block_height): (usize, usize),
        codebook: Vec<Vec<u8>>,
        assignment: Vec<usize>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || block_width == 0 || block_height == 0 {
            return Err(VqError::precondition(format!(
                "image {width}x{height} with blocks {block_width}x{block_height} has an empty side"
            )));
        }
        if codebook.is_empty() {
            return Err(VqError::precondition("codebook is empty"));
        }
        let dim = checked_block_dim(block_width, block_height)
            .ok_or_else(|| VqError::precondition("block size overflows"))?;
        if codebook.iter().any(|c| c.len() != dim) {
            return Err(VqError::precondition(format!("codeword length differs from {dim}")));
        }
        let blocks = checked_block_count(width, height, block_width, block_height)
            .ok_or_else(|| VqError::precondition("block grid overflows"))?;
        if assignment.len() != blocks {
            return Err(VqError::precondition(format!(
                "{} indices for {blocks} blocks",
                assignment.len()
            )));
        }
        if let Some(&bad) = assignment.iter().find(|&&a| a >= codebook.len()) {
            return Err(VqError::precondition(format!(
                "index {bad} outside a codebook of {}",
                codebook.len()
            )));
        }
        Ok(Self {
            color_space,
            width,
            height,
            block_width,
            block_height,
            codebook,
            assignment,
        })
    }

    #[inline(always)]
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
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
    pub fn block_size(&self) -> (usize, usize) {
        (self.block_width, self.block_height)
    }

    #[inline(always)]
    pub fn codebook(&self) -> &[Vec<u8>] {
        &self.codebook
    }

    #[inline(always)]
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    #[inline]
    pub fn bits_per_index(&self) -> u32 {
        bits_for(self.codebook.len())
    }

    /// Estimated size: indices plus one byte per codeword channel, rounded up
    /// to whole bytes.
    pub fn size_in_bits(&self) -> usize {
        let index_bits = self.bits_per_index() as usize * self.assignment.len();
        let codebook_bits = self.block_width * self.block_height * self.codebook.len() * 8 * 3;
        (index_bits + codebook_bits).div_ceil(8) * 8
    }

    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bits() / 8
    }
}

// ------------------------------------------------------------------
// 2. Writer
// ------------------------------------------------------------------
impl CompressedImage {
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let bits = self.bits_per_index();
        if bits > MAX_BITS {
            return Err(VqError::NotImplemented("index widths above 24 bits"));
        }
        writeln!(
            writer,
            "{} {} {} {} {} {} {}",
            bits,
            self.color_space.id(),
            self.assignment.len(),
            self.width,
            self.height,
            self.block_width,
            self.block_height
        )?;

        let dim = block_dim(self.block_width, self.block_height);
        for codeword in &self.codebook {
            writer.write_all(codeword)?;
        }
        let padding = vec![0u8; dim];
        for _ in self.codebook.len()..1usize << bits {
            writer.write_all(&padding)?;
        }

        let width = bits.div_ceil(8) as usize;
        for &index in &self.assignment {
            // bits <= 24, so every index fits in u32
            writer.write_all(&(index as u32).to_le_bytes()[..width])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

// ------------------------------------------------------------------
// 3. Reader
// ------------------------------------------------------------------
struct Header {
    bits: u32,
    color_space: ColorSpace,
    count: usize,
    width: usize,
    height: usize,
    block_width: usize,
    block_height: usize,
}

fn parse_header(line: &[u8]) -> Result<Header> {
    let text = std::str::from_utf8(line).map_err(|_| VqError::format("header is not ASCII"))?;
    let fields: Vec<&str> = text.split_ascii_whitespace().collect();
    if fields.len() != 7 {
        return Err(VqError::format(format!("header has {} fields, expected 7", fields.len())));
    }
    let num = |i: usize, name: &str| -> Result<usize> {
        fields[i]
            .parse::<usize>()
            .map_err(|_| VqError::format(format!("{name} `{}` is not a number", fields[i])))
    };

    let bits = u32::try_from(num(0, "bits")?).map_err(|_| VqError::format("bits out of range"))?;
    let cs_id = num(1, "color space")?;
    let color_space = u8::try_from(cs_id)
        .ok()
        .and_then(ColorSpace::from_id)
        .ok_or_else(|| VqError::format(format!("unknown color space id {cs_id}")))?;

    Ok(Header {
        bits,
        color_space,
        count: num(2, "assigned count")?,
        width: num(3, "width")?,
        height: num(4, "height")?,
        block_width: num(5, "block width")?,
        block_height: num(6, "block height")?,
    })
}

fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => VqError::format(format!("truncated {what}")),
        _ => VqError::Io(e),
    })
}

impl CompressedImage {
    /// Parses the persisted layout; every structural problem is
    /// [`VqError::UnsupportedFormat`].
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        (&mut reader).take(MAX_HEADER_LEN).read_until(b'\n', &mut line)?;
        if line.last() != Some(&b'\n') {
            return Err(VqError::format("missing or oversized header line"));
        }
        let h = parse_header(&line)?;

        if h.bits > MAX_BITS {
            return Err(VqError::NotImplemented("index widths above 24 bits"));
        }
        if h.width == 0 || h.height == 0 || h.block_width == 0 || h.block_height == 0 {
            return Err(VqError::format("zero image or block dimension"));
        }
        h.width
            .checked_mul(h.height)
            .filter(|&n| n <= MAX_PIXELS)
            .ok_or_else(|| VqError::format(format!("{}x{} image is too large", h.width, h.height)))?;
        let blocks = checked_block_count(h.width, h.height, h.block_width, h.block_height)
            .ok_or_else(|| VqError::format("block grid overflows"))?;
        if h.count != blocks {
            return Err(VqError::format(format!(
                "header announces {} indices, a {}x{} image with {}x{} blocks has {blocks}",
                h.count, h.width, h.height, h.block_width, h.block_height
            )));
        }

        let dim = checked_block_dim(h.block_width, h.block_height)
            .ok_or_else(|| VqError::format("block size overflows"))?;
        let entries = 1usize << h.bits;
        let mut codebook = Vec::new();
        for _ in 0..entries {
            // grows with the bytes actually present, never with the announced size
            let mut codeword = Vec::new();
            (&mut reader).take(dim as u64).read_to_end(&mut codeword)?;
            if codeword.len() != dim {
                return Err(VqError::format("truncated codebook"));
            }
            codebook.push(codeword);
        }

        let width = h.bits.div_ceil(8) as usize;
        // count equals the block grid, so it is bounded by MAX_PIXELS
        let mut assignment = Vec::with_capacity(h.count);
        let mut raw = [0u8; 4];
        for _ in 0..h.count {
            read_exact_or(&mut reader, &mut raw[..width], "index array")?;
            let index = u32::from_le_bytes(raw) as usize;
            if index >= entries {
                return Err(VqError::format(format!("index {index} outside a codebook of {entries}")));
            }
            assignment.push(index);
        }

        Ok(Self {
            color_space: h.color_space,
            width: h.width,
            height: h.height,
            block_width: h.block_width,
            block_height: h.block_height,
            codebook,
            assignment,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_from(File::open(path)?)
    }
}
