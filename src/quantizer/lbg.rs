//! Linde–Buzo–Gray codebook growth, cold-started or seeded by Median Cut.

use tracing::{debug, warn};

use super::median_cut::median_cut_codebook;
use super::solution::{RefineTrace, Solution};
use super::{validate_input, Quantization, Quantizer, RefineOptions};
use crate::errors::{Result, VqError};
use crate::vector::{kahan_mean, Scalar, Vector};

/// Duplicates every codeword and pushes the twins apart by `±epsilon`.
fn split(codebook: &mut Vec<Vector>, epsilon: f64) {
    let n = codebook.len();
    codebook.extend_from_within(..);
    let up = (1.0 + epsilon) as Scalar;
    let down = (1.0 - epsilon) as Scalar;
    for i in 0..n {
        codebook[i] *= up;
        codebook[i + n] *= down;
    }
}

fn report_cap(trace: &RefineTrace, codebook_len: usize) {
    if !trace.converged {
        warn!(
            codebook = codebook_len,
            iterations = trace.iterations(),
            "refinement stopped at the iteration cap"
        );
    }
}

// ------------------------------------------------------------------
// 1. Cold-start LBG
// ------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct Lbg {
    opts: RefineOptions,
}

impl Lbg {
    pub fn new(opts: RefineOptions) -> Self {
        Self { opts }
    }
}

impl Quantizer for Lbg {
    fn quantize(&self, training_set: &[Vector], bits: u32, epsilon: f64) -> Result<Quantization> {
        let dim = validate_input(training_set, bits)?;
        let mut rng = self.opts.rng();
        let target = 1usize << bits;

        let mean = kahan_mean(dim, training_set)
            .ok_or_else(|| VqError::precondition("training set is empty"))?;
        let mut solution = Solution::new(training_set, vec![mean]);
        solution.assign()?;
        solution.update_distortion();

        while solution.codebook.len() < target {
            self.opts.cancel.check()?;
            split(&mut solution.codebook, epsilon);
            let trace = solution.refine(&self.opts, epsilon, &mut rng)?;
            report_cap(&trace, solution.codebook.len());
            debug!(
                codebook = solution.codebook.len(),
                distortion = solution.distortion,
                "lbg split"
            );
        }
        Ok(solution.into_quantization())
    }
}

// ------------------------------------------------------------------
// 2. LBG refinement seeded by Median Cut
// ------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct LbgMedianCut {
    opts: RefineOptions,
}

impl LbgMedianCut {
    pub fn new(opts: RefineOptions) -> Self {
        Self { opts }
    }
}

impl Quantizer for LbgMedianCut {
    fn quantize(&self, training_set: &[Vector], bits: u32, epsilon: f64) -> Result<Quantization> {
        let dim = validate_input(training_set, bits)?;
        let mut rng = self.opts.rng();
        let target = 1usize << bits;

        let mut seed = median_cut_codebook(training_set, bits, dim);
        // too few training vectors for a full tree; empty clusters get re-seeded
        let leaves = seed.len();
        for i in leaves..target {
            seed.push(seed[i % leaves].clone());
        }

        let mut solution = Solution::new(training_set, seed);
        let trace = solution.refine(&self.opts, epsilon, &mut rng)?;
        report_cap(&trace, solution.codebook.len());
        Ok(solution.into_quantization())
    }
}
