//! **Compression configuration**: one explicit value per run.
//! Serde-ready; loads from TOML; validated before any work starts.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::ColorSpace;
use crate::errors::{Result, VqError};
use crate::quantizer::{
    BeeColonyParams, CancelToken, QuantizerKind, RefineOptions, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED,
    MAX_BITS,
};

// ------------------------------------------------------------------
// 1. Configuration struct
// ------------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    /// Codebook construction strategy.
    pub quantizer: QuantizerKind,
    /// Working color space; recorded in the compressed artifact.
    pub color_space: ColorSpace,
    pub block_width: usize,
    pub block_height: usize,
    /// Codebook holds at most `2^bits` codewords.
    pub bits: u32,
    /// Relative-improvement stop threshold, also the LBG split magnitude.
    pub epsilon: f64,
    pub max_iterations: usize,
    pub seed: u64,
    pub bee_colony: BeeColonyParams,
    #[serde(skip)]
    pub cancel: CancelToken,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quantizer: QuantizerKind::Lbg,
            color_space: ColorSpace::Scaled,
            block_width: 2,
            block_height: 2,
            bits: 10,
            epsilon: 1e-6,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
            bee_colony: BeeColonyParams::default(),
            cancel: CancelToken::default(),
        }
    }
}

// ------------------------------------------------------------------
// 2. Builder
// ------------------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct CompressionConfigBuilder {
    inner: CompressionConfig,
}

impl CompressionConfigBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn quantizer(mut self, kind: QuantizerKind) -> Self {
        self.inner.quantizer = kind;
        self
    }

    #[inline(always)]
    pub fn color_space(mut self, cs: ColorSpace) -> Self {
        self.inner.color_space = cs;
        self
    }

    #[inline(always)]
    pub fn block_size(mut self, width: usize, height: usize) -> Self {
        self.inner.block_width = width;
        self.inner.block_height = height;
        self
    }

    #[inline(always)]
    pub fn bits(mut self, bits: u32) -> Self {
        self.inner.bits = bits;
        self
    }

    #[inline(always)]
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.inner.epsilon = epsilon;
        self
    }

    #[inline(always)]
    pub fn max_iterations(mut self, iters: usize) -> Self {
        self.inner.max_iterations = iters;
        self
    }

    #[inline(always)]
    pub fn seed(mut self, seed: u64) -> Self {
        self.inner.seed = seed;
        self
    }

    #[inline(always)]
    pub fn bee_colony(mut self, params: BeeColonyParams) -> Self {
        self.inner.bee_colony = params;
        self
    }

    #[inline(always)]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.inner.cancel = token;
        self
    }

    /// Finishes the builder; fails on the first invalid field.
    pub fn build(self) -> Result<CompressionConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

// ------------------------------------------------------------------
// 3. Validation
// ------------------------------------------------------------------
impl CompressionConfig {
    #[inline]
    pub fn builder() -> CompressionConfigBuilder {
        CompressionConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_width == 0 || self.block_height == 0 {
            return Err(VqError::InvalidConfig(format!(
                "block size {}x{} must be at least 1x1",
                self.block_width, self.block_height
            )));
        }
        if self.bits > MAX_BITS {
            return Err(VqError::InvalidConfig(format!(
                "bits {} exceeds the maximum of {MAX_BITS}",
                self.bits
            )));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(VqError::InvalidConfig(format!(
                "epsilon {} must be finite and non-negative",
                self.epsilon
            )));
        }
        if self.max_iterations == 0 {
            return Err(VqError::InvalidConfig("max_iterations must be at least 1".into()));
        }
        if self.quantizer == QuantizerKind::BeeColony && self.bee_colony.colony_size < 2 {
            return Err(VqError::InvalidConfig(format!(
                "bee colony needs at least 2 candidates, got {}",
                self.bee_colony.colony_size
            )));
        }
        Ok(())
    }

    /// Refinement knobs handed to the quantizer.
    pub fn refine_options(&self) -> RefineOptions {
        RefineOptions::default()
            .max_iterations(self.max_iterations)
            .seed(self.seed)
            .cancel(self.cancel.clone())
    }
}

// ------------------------------------------------------------------
// 4. TOML loading
// ------------------------------------------------------------------
impl CompressionConfig {
    /// Parses and validates a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }
}
