//! Shared refinement state: codebook, assignment and distortion over one
//! training set, plus the generalized Lloyd loop every LBG-style strategy runs.

use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use super::{Quantization, RefineOptions};
use crate::errors::Result;
use crate::index::KdTree;
use crate::vector::{kahan_mean, Vector};

/// Training vectors per distortion partial sum. Fixed chunking keeps the
/// floating-point reduction order independent of thread scheduling.
const REDUCE_CHUNK: usize = 4096;

/// Per-iteration distortion trace of one refinement loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineTrace {
    /// Distortion after the initial assignment, then after every iteration.
    pub distortions: Vec<f64>,
    pub converged: bool,
}

impl RefineTrace {
    #[inline]
    pub fn iterations(&self) -> usize {
        self.distortions.len().saturating_sub(1)
    }
}

/// `true` once the relative improvement drops to `epsilon` or below.
/// A zero previous distortion counts as converged.
#[inline]
pub(crate) fn has_converged(prev: f64, cur: f64, epsilon: f64) -> bool {
    if prev <= 0.0 {
        return true;
    }
    (prev - cur) / prev <= epsilon
}

// ------------------------------------------------------------------
// Free helpers (also used by population-based strategies)
// ------------------------------------------------------------------

/// Writes the nearest codeword index for every training vector.
pub(crate) fn assign_nearest(
    training_set: &[Vector],
    codebook: &[Vector],
    assignment: &mut [usize],
) -> Result<()> {
    let tree = KdTree::build(codebook)?;
    assignment
        .par_iter_mut()
        .zip(training_set.par_iter())
        .for_each(|(slot, x)| *slot = tree.nearest(x));
    Ok(())
}

/// Mean squared error per component.
pub(crate) fn distortion(training_set: &[Vector], codebook: &[Vector], assignment: &[usize]) -> f64 {
    let dim = training_set.first().map_or(1, Vector::dim);
    let partials: Vec<f64> = training_set
        .par_chunks(REDUCE_CHUNK)
        .zip(assignment.par_chunks(REDUCE_CHUNK))
        .map(|(xs, ids)| {
            xs.iter()
                .zip(ids)
                .map(|(x, &c)| f64::from(x.distance_sq(&codebook[c])))
                .sum::<f64>()
        })
        .collect();
    partials.iter().sum::<f64>() / (training_set.len() * dim) as f64
}

/// Membership lists, one per codeword.
pub(crate) fn clusters(codebook_len: usize, assignment: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new(); codebook_len];
    for (i, &c) in assignment.iter().enumerate() {
        out[c].push(i);
    }
    out
}

// ------------------------------------------------------------------
// Solution
// ------------------------------------------------------------------
pub(crate) struct Solution<'a> {
    training_set: &'a [Vector],
    dim: usize,
    pub codebook: Vec<Vector>,
    pub assignment: Vec<usize>,
    pub distortion: f64,
}

impl<'a> Solution<'a> {
    /// Wraps a starting codebook; call [`Solution::assign`] before reading the
    /// assignment.
    pub fn new(training_set: &'a [Vector], codebook: Vec<Vector>) -> Self {
        let dim = training_set.first().map_or(0, Vector::dim);
        Self {
            training_set,
            dim,
            codebook,
            assignment: vec![0; training_set.len()],
            distortion: f64::INFINITY,
        }
    }

    pub fn assign(&mut self) -> Result<()> {
        assign_nearest(self.training_set, &self.codebook, &mut self.assignment)
    }

    pub fn update_distortion(&mut self) -> f64 {
        self.distortion = distortion(self.training_set, &self.codebook, &self.assignment);
        self.distortion
    }

    /// Moves every non-empty codeword to the Kahan mean of its cluster.
    /// Empty clusters take a random member of the currently largest cluster.
    /// Returns how many codewords were re-seeded.
    pub fn update_centroids<R: Rng>(&mut self, rng: &mut R) -> usize {
        let ts = self.training_set;
        let dim = self.dim;
        let mut members = clusters(self.codebook.len(), &self.assignment);

        self.codebook
            .par_iter_mut()
            .zip(members.par_iter())
            .for_each(|(codeword, area)| {
                if let Some(mean) = kahan_mean(dim, area.iter().map(|&i| &ts[i])) {
                    *codeword = mean;
                }
            });

        let empty: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_empty())
            .map(|(k, _)| k)
            .collect();
        for &k in &empty {
            let largest = members
                .iter()
                .enumerate()
                .max_by_key(|(_, m)| m.len())
                .map_or(k, |(i, _)| i);
            let donor = &mut members[largest];
            if donor.is_empty() {
                break;
            }
            let pick = donor.swap_remove(rng.gen_range(0..donor.len()));
            self.codebook[k] = ts[pick].clone();
            members[k].push(pick);
        }
        empty.len()
    }

    /// Generalized Lloyd iteration at fixed codebook size.
    ///
    /// Stops when the relative improvement reaches `epsilon` or after
    /// `opts.max_iterations` rounds; hitting the cap is a normal stop.
    pub fn refine<R: Rng>(&mut self, opts: &RefineOptions, epsilon: f64, rng: &mut R) -> Result<RefineTrace> {
        self.assign()?;
        let mut prev = self.update_distortion();
        let mut distortions = vec![prev];
        let mut converged = false;

        for _ in 0..opts.max_iterations {
            opts.cancel.check()?;
            let reseeded = self.update_centroids(rng);
            self.assign()?;
            let cur = self.update_distortion();
            distortions.push(cur);
            if reseeded > 0 {
                debug!(reseeded, "re-seeded empty clusters");
            }
            if has_converged(prev, cur, epsilon) {
                converged = true;
                break;
            }
            prev = cur;
        }

        let trace = RefineTrace {
            distortions,
            converged,
        };
        debug!(
            codebook = self.codebook.len(),
            iterations = trace.iterations(),
            converged,
            distortion = self.distortion,
            "refinement finished"
        );
        Ok(trace)
    }

    pub fn into_quantization(self) -> Quantization {
        Quantization {
            codebook: self.codebook,
            assignment: self.assignment,
            distortion: self.distortion,
        }
    }
}
