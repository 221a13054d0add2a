//! Nearest-neighbour lookup over a codebook.
//! Rebuilt from scratch on every refinement round; queries are read-only and
//! can run from any number of threads at once.

mod kdtree;


pub use kdtree::KdTree;
