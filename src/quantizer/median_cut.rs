//! Median Cut: recursive median split along the widest dimension.

use core::cmp::Ordering;

use super::solution::Solution;
use super::{validate_input, Quantization, Quantizer};
use crate::errors::Result;
use crate::vector::{kahan_mean, Scalar, Vector};

/// Partitions below this size recurse sequentially.
const PARALLEL_THRESHOLD: usize = 1 << 14;

#[derive(Debug, Clone, Copy, Default)]
pub struct MedianCut;

impl MedianCut {
    pub fn new() -> Self {
        Self
    }
}

impl Quantizer for MedianCut {
    /// `epsilon` is unused: there is no iterative refinement.
    fn quantize(&self, training_set: &[Vector], bits: u32, _epsilon: f64) -> Result<Quantization> {
        let dim = validate_input(training_set, bits)?;
        let codebook = median_cut_codebook(training_set, bits, dim);
        let mut solution = Solution::new(training_set, codebook);
        solution.assign()?;
        solution.update_distortion();
        Ok(solution.into_quantization())
    }
}

/// Leaf means of the median-cut tree of depth `depth`, left to right.
/// Yields exactly `2^depth` codewords whenever the training set has at least
/// that many vectors.
pub(crate) fn median_cut_codebook(training_set: &[Vector], depth: u32, dim: usize) -> Vec<Vector> {
    let mut members: Vec<usize> = (0..training_set.len()).collect();
    partition(training_set, &mut members, depth, dim)
}

fn partition(ts: &[Vector], members: &mut [usize], depth: u32, dim: usize) -> Vec<Vector> {
    if depth == 0 || members.len() <= 1 {
        return kahan_mean(dim, members.iter().map(|&i| &ts[i]))
            .into_iter()
            .collect();
    }

    let axis = widest_axis(ts, members, dim);
    members.sort_unstable_by(|&a, &b| ts[a][axis].partial_cmp(&ts[b][axis]).unwrap_or(Ordering::Equal));
    let mid = members.len() / 2;
    let (lo, hi) = members.split_at_mut(mid);

    let (mut left, right) = if lo.len() + hi.len() >= PARALLEL_THRESHOLD {
        rayon::join(
            || partition(ts, lo, depth - 1, dim),
            || partition(ts, hi, depth - 1, dim),
        )
    } else {
        (
            partition(ts, lo, depth - 1, dim),
            partition(ts, hi, depth - 1, dim),
        )
    };
    left.extend(right);
    left
}

fn widest_axis(ts: &[Vector], members: &[usize], dim: usize) -> usize {
    let mut lo = vec![Scalar::INFINITY; dim];
    let mut hi = vec![Scalar::NEG_INFINITY; dim];
    for &i in members {
        for (d, &x) in ts[i].iter().enumerate() {
            lo[d] = lo[d].min(x);
            hi[d] = hi[d].max(x);
        }
    }
    let mut best = (0, Scalar::NEG_INFINITY);
    for d in 0..dim {
        let range = hi[d] - lo[d];
        if range > best.1 {
            best = (d, range);
        }
    }
    best.0
}
