//! Codebook construction strategies.
//!
//! Every strategy maps a training set to `(codebook, assignment, distortion)`
//! where the codebook holds at most `2^bits` vectors and
//! `distortion = Σ ‖x_i − c[a_i]‖² / (M · dim)`.

mod bee_colony;
mod lbg;
mod median_cut;
mod solution;

#[cfg(test)]
mod tests;

use core::fmt;
use core::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VqError};
use crate::vector::{uniform_dim, Vector};

pub use bee_colony::{BeeColony, BeeColonyParams};
pub use lbg::{Lbg, LbgMedianCut};
pub use median_cut::MedianCut;
pub use solution::RefineTrace;

/// Largest supported codebook exponent; indices are persisted in at most
/// three bytes.
pub const MAX_BITS: u32 = 24;

/// Default refinement iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default RNG seed when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 0x5eed_c0de;

// ------------------------------------------------------------------
// 1. Result of a quantization run
// ------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct Quantization {
    pub codebook: Vec<Vector>,
    pub assignment: Vec<usize>,
    pub distortion: f64,
}

// ------------------------------------------------------------------
// 2. Strategy trait
// ------------------------------------------------------------------
pub trait Quantizer: Send + Sync {
    fn quantize(&self, training_set: &[Vector], bits: u32, epsilon: f64) -> Result<Quantization>;
}

// ------------------------------------------------------------------
// 3. Cooperative cancellation
// ------------------------------------------------------------------

/// Shared flag checked between refinement iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(VqError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ------------------------------------------------------------------
// 4. Refinement options shared by every strategy
// ------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub max_iterations: usize,
    pub seed: u64,
    pub cancel: CancelToken,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
            cancel: CancelToken::default(),
        }
    }
}

impl RefineOptions {
    #[inline]
    pub fn max_iterations(mut self, iters: usize) -> Self {
        self.max_iterations = iters;
        self
    }

    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub(crate) fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}

// ------------------------------------------------------------------
// 5. Closed set of strategies
// ------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuantizerKind {
    #[default]
    Lbg,
    MedianCut,
    LbgMedianCut,
    BeeColony,
}

impl QuantizerKind {
    pub const ALL: [QuantizerKind; 4] = [
        Self::Lbg,
        Self::MedianCut,
        Self::LbgMedianCut,
        Self::BeeColony,
    ];

    #[inline]
    pub fn id(self) -> u8 {
        match self {
            Self::Lbg => 0,
            Self::MedianCut => 1,
            Self::LbgMedianCut => 2,
            Self::BeeColony => 3,
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Lbg => "lbg",
            Self::MedianCut => "median-cut",
            Self::LbgMedianCut => "lbg-median-cut",
            Self::BeeColony => "bee-colony",
        }
    }

    /// Instantiates the strategy.
    pub fn build(self, opts: RefineOptions, bee: BeeColonyParams) -> Box<dyn Quantizer> {
        match self {
            Self::Lbg => Box::new(Lbg::new(opts)),
            Self::MedianCut => Box::new(MedianCut::new()),
            Self::LbgMedianCut => Box::new(LbgMedianCut::new(opts)),
            Self::BeeColony => Box::new(BeeColony::new(opts, bee)),
        }
    }
}

impl FromStr for QuantizerKind {
    type Err = VqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "0" | "lbg" => Ok(Self::Lbg),
            "1" | "median-cut" | "mediancut" => Ok(Self::MedianCut),
            "2" | "lbg-median-cut" => Ok(Self::LbgMedianCut),
            "3" | "bee-colony" | "abc" => Ok(Self::BeeColony),
            other => Err(VqError::InvalidConfig(format!("unknown quantizer `{other}`"))),
        }
    }
}

impl fmt::Display for QuantizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ------------------------------------------------------------------
// 6. Shared preconditions
// ------------------------------------------------------------------

/// Rejects training sets no strategy can work on; returns the vector dimension.
pub(crate) fn validate_input(training_set: &[Vector], bits: u32) -> Result<usize> {
    if training_set.len() <= 1 {
        return Err(VqError::precondition(format!(
            "training set needs at least 2 vectors, got {}",
            training_set.len()
        )));
    }
    if bits > MAX_BITS {
        return Err(VqError::precondition(format!(
            "codebook exponent {bits} exceeds {MAX_BITS}"
        )));
    }
    match uniform_dim(training_set) {
        Some(0) => Err(VqError::precondition("training vectors are empty")),
        Some(dim) => Ok(dim),
        None => Err(VqError::precondition("training vectors differ in dimension")),
    }
}
