//! passagedb-index
//!
//! Brute-force exact vector search over an in-memory snapshot. See `index`
//! for the search structure and `snapshot` for the on-disk artifacts.

pub mod index;
pub mod snapshot;

pub use index::{l2_normalize, VectorIndex};
