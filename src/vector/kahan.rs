//! Kahan compensated summation over whole vectors.
//!
//! Centroids are means over up to ~10^6 block vectors and get recomputed on
//! every refinement round; plain `f32` accumulation drifts visibly at that
//! scale, so every batch sum in the crate goes through [`KahanSum`].

use super::{Scalar, Vector};

#[derive(Debug, Clone)]
pub struct KahanSum {
    sum: Vec<Scalar>,
    compensation: Vec<Scalar>,
    count: usize,
}

impl KahanSum {
    #[inline]
    pub fn new(dim: usize) -> Self {
        Self {
            sum: vec![0.0; dim],
            compensation: vec![0.0; dim],
            count: 0,
        }
    }

    /// Adds one term.
    #[inline]
    pub fn add(&mut self, term: &[Scalar]) {
        debug_assert_eq!(term.len(), self.sum.len(), "dimension mismatch");
        for ((s, c), &x) in self
            .sum
            .iter_mut()
            .zip(self.compensation.iter_mut())
            .zip(term.iter())
        {
            let y = x - *c;
            let t = *s + y;
            *c = (t - *s) - y;
            *s = t;
        }
        self.count += 1;
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn into_sum(self) -> Vector {
        Vector::from_vec(self.sum)
    }

    /// Mean of the accumulated terms, `None` when nothing was added.
    #[inline]
    pub fn into_mean(self) -> Option<Vector> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as Scalar;
        Some(self.into_sum() / n)
    }
}

/// Compensated mean of `terms`; `None` for an empty iterator.
pub fn kahan_mean<'a, I>(dim: usize, terms: I) -> Option<Vector>
where
    I: IntoIterator<Item = &'a Vector>,
{
    let mut acc = KahanSum::new(dim);
    for t in terms {
        acc.add(t);
    }
    acc.into_mean()
}
