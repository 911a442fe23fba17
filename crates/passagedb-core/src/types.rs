//! Domain types shared by the chunking and retrieval engines.

use serde::{Deserialize, Serialize};

pub type DocId = String;
pub type ChunkId = String;

/// A source document in the corpus snapshot.
///
/// - `doc_id`: stable identity (content hash or external id), immutable
///   for the lifetime of the snapshot
/// - `year`: publication year when known; drives the `recency` sort and
///   year filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub source_url: Option<String>,
    pub filename: Option<String>,
}

/// A bounded, position-ordered window of a document's normalized text.
///
/// `position` is the 0-based sequence index within the owning document and
/// defines neighbor order. Token and char offsets point into the document's
/// token stream and normalized text respectively; consecutive chunks overlap
/// by the configured overlap except possibly the final, shorter one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub doc_id: DocId,
    pub position: usize,
    pub token_start: usize,
    pub token_end: usize,
    pub char_start: usize,
    pub char_end: usize,
    pub text: String,
}

/// Ephemeral per-query candidate. `score` is the single authoritative
/// ranking field; reranking overwrites it rather than adding a second one.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub chunk_id: ChunkId,
    pub score: f32,
}

/// Year predicate: an exact year or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearFilter {
    Exact(i32),
    Range { min: i32, max: i32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Relevance,
    Recency,
}

/// One retrieval request. `cursor` carries the opaque pagination token from
/// a prior page; everything else participates in the cursor fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    pub k: usize,
    pub neighbors: usize,
    pub per_doc: usize,
    pub year: Option<YearFilter>,
    pub doc_id: Option<DocId>,
    pub sort: SortOrder,
    pub cursor: Option<String>,
}

impl SearchRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            k: 8,
            neighbors: 2,
            per_doc: 2,
            year: None,
            doc_id: None,
            sort: SortOrder::default(),
            cursor: None,
        }
    }
}

/// Effective parameters echoed back on every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestParams {
    pub k: usize,
    pub neighbors: usize,
    pub per_doc: usize,
    pub sort: SortOrder,
    pub year: Option<YearFilter>,
    pub doc_id: Option<DocId>,
}

impl From<&SearchRequest> for RequestParams {
    fn from(req: &SearchRequest) -> Self {
        Self {
            k: req.k,
            neighbors: req.neighbors,
            per_doc: req.per_doc,
            sort: req.sort,
            year: req.year,
            doc_id: req.doc_id.clone(),
        }
    }
}

/// One rendered hit. `neighbor_window` is the inclusive `[start, end]`
/// position range stitched into `preview`; it never spans two documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub chunk_id: ChunkId,
    pub score: f32,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub preview: String,
    pub neighbor_window: [usize; 2],
    pub source_url: Option<String>,
    pub filename: Option<String>,
}

/// A page of results.
///
/// `total_available` counts the candidates that survived filtering,
/// diversification, and sort within the over-fetched window; when the corpus
/// holds more matches than that window it is a lower bound, not an exact
/// corpus-wide count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub params: RequestParams,
    pub count: usize,
    pub total_available: usize,
    pub cursor_next: Option<String>,
    pub took_ms: u64,
    pub results: Vec<SearchResult>,
}
