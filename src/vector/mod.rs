//! Runtime-dimension vectors used as block samples and codewords.
//! Elementwise arithmetic lives in `ops`, compensated summation in `kahan`.

pub mod kahan;
mod ops;


use core::ops::{Deref, DerefMut};
use serde::{Deserialize, Serialize};

pub use kahan::{kahan_mean, KahanSum};

/// Floating-point scalar used throughout the crate.
pub type Scalar = f32;

// ------------------------------------------------------------------
// 1. Vector
// ------------------------------------------------------------------

/// Owned, fixed-length (per instance) vector with value semantics.
///
/// Every vector that takes part in one quantization run has the same
/// dimension, `block_width * block_height * 3`. Mixing dimensions is a caller
/// bug and is only caught by debug assertions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector(Vec<Scalar>);

impl Vector {
    #[inline]
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    #[inline]
    pub fn from_vec(data: Vec<Scalar>) -> Self {
        Self(data)
    }

    #[inline(always)]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Scalar] {
        &self.0
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [Scalar] {
        &mut self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<Scalar> {
        self.0
    }

    /// Squared Euclidean norm.
    #[inline]
    pub fn norm_sq(&self) -> Scalar {
        self.0.iter().map(|x| x * x).sum()
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    pub fn distance_sq(&self, other: &Vector) -> Scalar {
        squared_distance(&self.0, &other.0)
    }
}

impl From<Vec<Scalar>> for Vector {
    #[inline(always)]
    fn from(data: Vec<Scalar>) -> Self {
        Self(data)
    }
}

impl From<&[Scalar]> for Vector {
    #[inline(always)]
    fn from(data: &[Scalar]) -> Self {
        Self(data.to_vec())
    }
}

impl Deref for Vector {
    type Target = [Scalar];
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Vector {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// ------------------------------------------------------------------
// 2. Slice helpers
// ------------------------------------------------------------------

/// Squared L2 distance between two equally sized slices.
#[inline(always)]
pub fn squared_distance(a: &[Scalar], b: &[Scalar]) -> Scalar {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch");
    let mut acc = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        acc += d * d;
    }
    acc
}

/// Checks that every vector in `vectors` has the dimension of the first one.
pub fn uniform_dim(vectors: &[Vector]) -> Option<usize> {
    let dim = vectors.first()?.dim();
    vectors.iter().all(|v| v.dim() == dim).then_some(dim)
}
