//! passagedb-retrieval
//!
//! The query pipeline: over-fetch, filter, diversify, rerank, sort, stitch,
//! paginate. See `engine` for the pipeline and `cursor` for the opaque
//! pagination tokens.

pub mod cursor;
pub mod engine;

pub use engine::{EngineConfig, RetrievalEngine, MAX_PAGE_SIZE};
