//! Image ↔ block-vector conversion.
//!
//! The image is cut into a `ceil(W/bw) x ceil(H/bh)` grid. Blocks are emitted
//! block-column outer, block-row inner, so block `(i, j)` lands at
//! `i * h_blocks + j`. Inside a block pixels run column-major (x outer,
//! y inner), three channels each. Samples that fall outside the image are
//! zero on the way in and dropped on the way out.

use rayon::prelude::*;

use super::RgbImage;
use crate::color::{ColorSpace, Rgb};
use crate::errors::{Result, VqError};
use crate::vector::{Scalar, Vector};

/// Number of blocks along x and y.
#[inline]
pub fn grid(width: usize, height: usize, bw: usize, bh: usize) -> (usize, usize) {
    (width.div_ceil(bw), height.div_ceil(bh))
}

#[inline]
pub fn block_count(width: usize, height: usize, bw: usize, bh: usize) -> usize {
    let (w_blocks, h_blocks) = grid(width, height, bw, bh);
    w_blocks * h_blocks
}

/// Vector dimension of one block.
#[inline(always)]
pub fn block_dim(bw: usize, bh: usize) -> usize {
    bw * bh * 3
}

fn check_block_size(bw: usize, bh: usize) -> Result<()> {
    if bw == 0 || bh == 0 {
        return Err(VqError::precondition(format!("block size {bw}x{bh} is empty")));
    }
    Ok(())
}

/// Decomposes `image` into working-space block vectors.
pub fn to_blocks(image: &RgbImage, bw: usize, bh: usize, color: ColorSpace) -> Result<Vec<Vector>> {
    check_block_size(bw, bh)?;
    let (width, height) = (image.width(), image.height());
    let (w_blocks, h_blocks) = grid(width, height, bw, bh);

    let blocks = (0..w_blocks * h_blocks)
        .into_par_iter()
        .map(|b| {
            let (i, j) = (b / h_blocks, b % h_blocks);
            let mut v = vec![0.0 as Scalar; block_dim(bw, bh)];
            for dx in 0..bw {
                let x = i * bw + dx;
                if x >= width {
                    continue;
                }
                for dy in 0..bh {
                    let y = j * bh + dy;
                    if y >= height {
                        continue;
                    }
                    let off = (dx * bh + dy) * 3;
                    v[off..off + 3].copy_from_slice(&color.forward(image.get(x, y)));
                }
            }
            Vector::from_vec(v)
        })
        .collect();
    Ok(blocks)
}

/// Reassembles working-space block vectors, applying `color.inverse` per pixel.
pub fn from_blocks(
    vectors: &[Vector],
    width: usize,
    height: usize,
    bw: usize,
    bh: usize,
    color: ColorSpace,
) -> Result<RgbImage> {
    let dim = block_dim(bw, bh);
    if let Some(bad) = vectors.iter().find(|v| v.dim() != dim) {
        return Err(VqError::precondition(format!(
            "block vector of dimension {} where {dim} was expected",
            bad.dim()
        )));
    }
    scatter(vectors.len(), width, height, bw, bh, |b, off| {
        let s = &vectors[b][off..off + 3];
        color.inverse([s[0], s[1], s[2]])
    })
}

/// Reassembles blocks that are already RGB bytes (stored codewords).
pub fn from_byte_blocks<B: AsRef<[u8]>>(
    blocks: &[B],
    width: usize,
    height: usize,
    bw: usize,
    bh: usize,
) -> Result<RgbImage> {
    let dim = block_dim(bw, bh);
    if blocks.iter().any(|b| b.as_ref().len() != dim) {
        return Err(VqError::precondition(format!("byte block length differs from {dim}")));
    }
    scatter(blocks.len(), width, height, bw, bh, |b, off| {
        let s = &blocks[b].as_ref()[off..off + 3];
        [s[0], s[1], s[2]]
    })
}

fn scatter(
    n_blocks: usize,
    width: usize,
    height: usize,
    bw: usize,
    bh: usize,
    sample: impl Fn(usize, usize) -> Rgb,
) -> Result<RgbImage> {
    check_block_size(bw, bh)?;
    let (w_blocks, h_blocks) = grid(width, height, bw, bh);
    if n_blocks != w_blocks * h_blocks {
        return Err(VqError::precondition(format!(
            "{n_blocks} blocks cannot tile a {width}x{height} image with {bw}x{bh} blocks"
        )));
    }

    let mut image = RgbImage::filled(width, height, [0, 0, 0])?;
    for i in 0..w_blocks {
        for j in 0..h_blocks {
            let b = i * h_blocks + j;
            for dx in 0..bw {
                let x = i * bw + dx;
                if x >= width {
                    break;
                }
                for dy in 0..bh {
                    let y = j * bh + dy;
                    if y >= height {
                        break;
                    }
                    image.set(x, y, sample(b, (dx * bh + dy) * 3));
                }
            }
        }
    }
    Ok(image)
}
