//! Artificial Bee Colony search over whole codebooks.
//!
//! Each food source is a complete candidate solution. Employed bees refine
//! their own candidate with a few Lloyd rounds and then try a perturbation
//! towards or away from a random partner; onlookers repeat the trial on
//! candidates drawn with probability proportional to fitness; scouts replace
//! candidates that failed too often with a random codebook inside the training
//! set's bounding box. The best candidate ever seen is returned.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::solution::{assign_nearest, distortion, Solution};
use super::{validate_input, Quantization, Quantizer, RefineOptions};
use crate::errors::{Result, VqError};
use crate::vector::{Scalar, Vector};

// ------------------------------------------------------------------
// 1. Tunables
// ------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeeColonyParams {
    /// Number of candidate solutions (food sources).
    pub colony_size: usize,
    /// Number of cycles to run.
    pub cycles: usize,
    /// Failed trials tolerated before a candidate is abandoned.
    pub abandon_limit: usize,
    /// Lloyd rounds each employed bee runs before perturbing.
    pub local_iterations: usize,
    /// Codewords moved by one perturbation.
    pub perturbed_codewords: usize,
}

impl Default for BeeColonyParams {
    fn default() -> Self {
        Self {
            colony_size: 10,
            cycles: 20,
            abandon_limit: 5,
            local_iterations: 2,
            perturbed_codewords: 2,
        }
    }
}

// ------------------------------------------------------------------
// 2. Candidate solution
// ------------------------------------------------------------------
#[derive(Debug, Clone)]
struct Candidate {
    codebook: Vec<Vector>,
    assignment: Vec<usize>,
    distortion: f64,
    failures: usize,
}

impl Candidate {
    #[inline]
    fn fitness(&self) -> f64 {
        1.0 / (1.0 + self.distortion)
    }

    fn from_codebook(ts: &[Vector], codebook: Vec<Vector>) -> Result<Self> {
        let mut assignment = vec![0; ts.len()];
        assign_nearest(ts, &codebook, &mut assignment)?;
        let distortion = distortion(ts, &codebook, &assignment);
        Ok(Self {
            codebook,
            assignment,
            distortion,
            failures: 0,
        })
    }

    /// Uniformly random codebook inside `bounds`.
    fn scout<R: Rng>(ts: &[Vector], bounds: &Bounds, size: usize, rng: &mut R) -> Result<Self> {
        let codebook = (0..size).map(|_| bounds.sample(&mut *rng)).collect();
        Self::from_codebook(ts, codebook)
    }

    /// A few Lloyd rounds; always kept.
    fn refine<R: Rng>(&mut self, ts: &[Vector], opts: &RefineOptions, epsilon: f64, rng: &mut R) -> Result<()> {
        let mut solution = Solution::new(ts, std::mem::take(&mut self.codebook));
        solution.refine(opts, epsilon, rng)?;
        self.codebook = solution.codebook;
        self.assignment = solution.assignment;
        self.distortion = solution.distortion;
        Ok(())
    }

    /// Moves a random subset of codewords by `φ · (own − partner)`,
    /// `φ ∈ [−1, 1]`. Keeps the move only on strict improvement.
    fn try_perturb<R: Rng>(
        &mut self,
        ts: &[Vector],
        partner: &[Vector],
        moved: usize,
        rng: &mut R,
    ) -> Result<bool> {
        let size = self.codebook.len();
        let positions = sample(&mut *rng, size, moved.clamp(1, size));
        let saved: Vec<(usize, Vector)> = positions
            .iter()
            .map(|j| (j, self.codebook[j].clone()))
            .collect();

        for j in positions.iter() {
            let phi: Scalar = rng.gen_range(-1.0..=1.0);
            let delta = (&self.codebook[j] - &partner[j]) * phi;
            self.codebook[j] += &delta;
        }

        let mut trial = self.assignment.clone();
        assign_nearest(ts, &self.codebook, &mut trial)?;
        let trial_distortion = distortion(ts, &self.codebook, &trial);

        if trial_distortion < self.distortion {
            self.assignment = trial;
            self.distortion = trial_distortion;
            self.failures = 0;
            Ok(true)
        } else {
            for (j, old) in saved {
                self.codebook[j] = old;
            }
            self.failures += 1;
            Ok(false)
        }
    }

    fn into_quantization(self) -> Quantization {
        Quantization {
            codebook: self.codebook,
            assignment: self.assignment,
            distortion: self.distortion,
        }
    }
}

/// Per-dimension bounding box of the training set.
struct Bounds {
    lo: Vec<Scalar>,
    hi: Vec<Scalar>,
}

impl Bounds {
    fn of(ts: &[Vector], dim: usize) -> Self {
        let mut lo = vec![Scalar::INFINITY; dim];
        let mut hi = vec![Scalar::NEG_INFINITY; dim];
        for v in ts {
            for (d, &x) in v.iter().enumerate() {
                lo[d] = lo[d].min(x);
                hi[d] = hi[d].max(x);
            }
        }
        Self { lo, hi }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Vector {
        self.lo
            .iter()
            .zip(self.hi.iter())
            .map(|(&l, &h)| if h > l { rng.gen_range(l..=h) } else { l })
            .collect::<Vec<_>>()
            .into()
    }
}

pub(super) fn pick_partner<R: Rng>(own: usize, colony: usize, rng: &mut R) -> usize {
    if colony < 2 {
        return own;
    }
    let k = rng.gen_range(0..colony - 1);
    if k >= own {
        k + 1
    } else {
        k
    }
}

fn codebooks(population: &[Candidate]) -> Vec<Vec<Vector>> {
    population.iter().map(|c| c.codebook.clone()).collect()
}

fn keep_best(population: &[Candidate], best: &mut Candidate) {
    if let Some(top) = population
        .iter()
        .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    {
        if top.fitness() > best.fitness() {
            *best = top.clone();
        }
    }
}

// ------------------------------------------------------------------
// 3. Strategy
// ------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct BeeColony {
    opts: RefineOptions,
    params: BeeColonyParams,
}

impl BeeColony {
    pub fn new(opts: RefineOptions, params: BeeColonyParams) -> Self {
        Self { opts, params }
    }
}

impl Quantizer for BeeColony {
    fn quantize(&self, training_set: &[Vector], bits: u32, epsilon: f64) -> Result<Quantization> {
        let dim = validate_input(training_set, bits)?;
        let p = self.params;
        if p.colony_size == 0 {
            return Err(VqError::precondition("bee colony needs at least one candidate"));
        }
        let size = 1usize << bits;
        let bounds = Bounds::of(training_set, dim);
        let mut rng = self.opts.rng();
        let local_opts = self.opts.clone().max_iterations(p.local_iterations);

        let mut population = (0..p.colony_size)
            .map(|_| Candidate::scout(training_set, &bounds, size, &mut rng))
            .collect::<Result<Vec<_>>>()?;
        let mut best = population[0].clone();
        keep_best(&population, &mut best);

        for cycle in 0..p.cycles {
            self.opts.cancel.check()?;

            // employed bees, one private RNG stream per candidate
            let snapshot = codebooks(&population);
            let seeds: Vec<u64> = (0..p.colony_size).map(|_| rng.gen()).collect();
            population
                .par_iter_mut()
                .zip(seeds.par_iter())
                .enumerate()
                .try_for_each(|(i, (cand, &seed))| -> Result<()> {
                    let mut local = ChaCha8Rng::seed_from_u64(seed);
                    cand.refine(training_set, &local_opts, epsilon, &mut local)?;
                    let partner = pick_partner(i, p.colony_size, &mut local);
                    cand.try_perturb(training_set, &snapshot[partner], p.perturbed_codewords, &mut local)?;
                    Ok(())
                })?;
            keep_best(&population, &mut best);

            // onlooker bees over a consistent fitness snapshot
            let fitness: Vec<f64> = population.iter().map(Candidate::fitness).collect();
            let wheel = WeightedIndex::new(&fitness)
                .map_err(|e| VqError::precondition(format!("fitness wheel: {e}")))?;
            let snapshot = codebooks(&population);
            let mut improved = 0usize;
            for _ in 0..p.colony_size {
                let i = wheel.sample(&mut rng);
                let partner = pick_partner(i, p.colony_size, &mut rng);
                if population[i].try_perturb(training_set, &snapshot[partner], p.perturbed_codewords, &mut rng)? {
                    improved += 1;
                }
            }
            keep_best(&population, &mut best);

            // scouts
            let mut abandoned = 0usize;
            for cand in population.iter_mut() {
                if cand.failures > p.abandon_limit {
                    *cand = Candidate::scout(training_set, &bounds, size, &mut rng)?;
                    abandoned += 1;
                }
            }
            keep_best(&population, &mut best);

            debug!(
                cycle,
                best = best.distortion,
                improved,
                abandoned,
                "bee colony cycle"
            );
        }

        Ok(best.into_quantization())
    }
}
