//! Static k-d tree with exact nearest-neighbour search.
//!
//! Nodes live in one flat `Vec`; every split divides its range at the median
//! of the axis with the widest spread. Search state is kept on the call stack,
//! so `&KdTree` is `Sync` and queries need no coordination.

use core::cmp::Ordering;

use crate::errors::{Result, VqError};
use crate::vector::{squared_distance, Scalar, Vector};

/// Maximum number of points stored in one leaf.
pub(crate) const LEAF_SIZE: usize = 10;

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        axis: usize,
        value: Scalar,
        left: usize,
        right: usize,
    },
}

#[derive(Debug)]
pub struct KdTree<'a> {
    points: &'a [Vector],
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl<'a> KdTree<'a> {
    /// Builds the tree over `points` in O(n log n).
    pub fn build(points: &'a [Vector]) -> Result<Self> {
        if points.is_empty() {
            return Err(VqError::precondition("cannot index an empty point set"));
        }
        let mut tree = Self {
            points,
            order: (0..points.len()).collect(),
            nodes: Vec::with_capacity(2 * points.len() / LEAF_SIZE + 1),
        };
        tree.build_node(0, points.len());
        Ok(tree)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the point closest to `query`. Exact distance ties resolve to
    /// whichever point the traversal reaches first.
    #[inline]
    pub fn nearest(&self, query: &[Scalar]) -> usize {
        self.nearest_with_distance(query).0
    }

    /// Index of the closest point together with its squared distance.
    pub fn nearest_with_distance(&self, query: &[Scalar]) -> (usize, Scalar) {
        let mut best = (self.order[0], Scalar::INFINITY);
        self.search(0, query, &mut best);
        best
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------
    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { start, end });
        if end - start <= LEAF_SIZE {
            return idx;
        }

        let (axis, spread) = self.widest_axis(start, end);
        if spread <= 0.0 {
            // every point in range is identical
            return idx;
        }

        let mid = start + (end - start) / 2;
        let points = self.points;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            points[a][axis]
                .partial_cmp(&points[b][axis])
                .unwrap_or(Ordering::Equal)
        });
        let value = points[self.order[mid]][axis];

        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes[idx] = Node::Split {
            axis,
            value,
            left,
            right,
        };
        idx
    }

    fn widest_axis(&self, start: usize, end: usize) -> (usize, Scalar) {
        let dim = self.points[0].dim();
        let mut lo = vec![Scalar::INFINITY; dim];
        let mut hi = vec![Scalar::NEG_INFINITY; dim];
        for &i in &self.order[start..end] {
            for (d, &x) in self.points[i].iter().enumerate() {
                lo[d] = lo[d].min(x);
                hi[d] = hi[d].max(x);
            }
        }
        lo.iter()
            .zip(hi.iter())
            .map(|(l, h)| h - l)
            .enumerate()
            .fold((0, Scalar::NEG_INFINITY), |best, (d, s)| {
                if s > best.1 {
                    (d, s)
                } else {
                    best
                }
            })
    }

    // ------------------------------------------------------------------
    // Query
    // ------------------------------------------------------------------
    fn search(&self, node: usize, query: &[Scalar], best: &mut (usize, Scalar)) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    let d = squared_distance(query, &self.points[i]);
                    if d < best.1 {
                        *best = (i, d);
                    }
                }
            }
            Node::Split {
                axis,
                value,
                left,
                right,
            } => {
                let diff = query[axis] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.search(near, query, best);
                if diff * diff < best.1 {
                    self.search(far, query, best);
                }
            }
        }
    }
}
