//! passagedb-chunk
//!
//! Token-window chunking and the read-mostly chunk store the retrieval
//! engine stitches previews from. See `chunker`, `store`, and `tokenize`.

pub mod chunker;
pub mod store;
pub mod tokenize;

pub use chunker::{chunk_id, Chunker, ChunkerConfig};
pub use store::ChunkStore;
pub use tokenize::{HfTokenizer, WhitespaceTokenizer};
