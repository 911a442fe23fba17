//! The retrieval pipeline.
//!
//! Order of operations per request: cursor validation, over-fetch from the
//! vector index, metadata filtering, per-document diversification, optional
//! reranking, sort, neighbor stitching, pagination slice. The store and
//! index are immutable snapshots shared behind `Arc`; a request holds no
//! state of its own beyond its own candidate list.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use passagedb_chunk::ChunkStore;
use passagedb_core::error::{Error, Result};
use passagedb_core::traits::{Embedder, Reranker};
use passagedb_core::types::{
    Chunk, Document, RequestParams, SearchCandidate, SearchRequest, SearchResponse, SearchResult,
    SortOrder, YearFilter,
};
use passagedb_index::VectorIndex;

use crate::cursor;

pub const MAX_PAGE_SIZE: usize = 50;

/// Engine tunables; see the `[retrieval]` and `[embedding]` config
/// sections.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Multiplier in `N_over = max(k * per_doc * overfetch_factor, k)`.
    pub overfetch_factor: usize,
    /// Byte cap applied to stitched previews.
    pub max_preview_chars: usize,
    /// Timeout for a single embedding or rerank call.
    pub upstream_timeout: Duration,
    /// Extra attempts after a transient upstream failure.
    pub upstream_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overfetch_factor: 4,
            max_preview_chars: 1800,
            upstream_timeout: Duration::from_secs(15),
            upstream_retries: 2,
        }
    }
}

pub struct RetrievalEngine {
    store: Arc<ChunkStore>,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    cfg: EngineConfig,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<ChunkStore>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        cfg: EngineConfig,
    ) -> Self {
        Self { store, index, embedder, reranker, cfg }
    }

    pub async fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();
        validate(req)?;

        // Mismatched or unusable cursors restart at the first page rather
        // than silently paging a different result order.
        let fingerprint = cursor::query_fingerprint(req);
        let offset = match req.cursor.as_deref() {
            None => 0,
            Some(token) => match cursor::decode(token) {
                Ok((fp, off)) if fp == fingerprint => off,
                Ok(_) => {
                    debug!("cursor fingerprint mismatch, restarting pagination");
                    0
                }
                Err(err) => {
                    debug!(%err, "unusable cursor, restarting pagination");
                    0
                }
            },
        };

        // Over-fetch: filtering and diversification shrink the pool and
        // there is only one index round-trip per request. A post-filter
        // page shorter than k stays short.
        let n_over = usize::max(req.k * req.per_doc * self.cfg.overfetch_factor, req.k);
        let query_vec = self.embed_query(&req.q).await?;
        let raw = self.index.search(&query_vec, n_over)?;
        debug!(raw = raw.len(), n_over, "vector search complete");

        let mut kept: Vec<SearchCandidate> = Vec::new();
        let mut per_doc_counts: HashMap<String, usize> = HashMap::new();
        for (chunk_id, score) in raw {
            let Some(chunk) = self.store.get(&chunk_id) else {
                return Err(Error::integrity(format!(
                    "indexed chunk {chunk_id} missing from chunk store"
                )));
            };
            let Some(doc) = self.store.document(&chunk.doc_id) else {
                return Err(Error::integrity(format!(
                    "chunk {chunk_id} references unknown document {}",
                    chunk.doc_id
                )));
            };
            if !passes_filters(doc, req) {
                continue;
            }
            // diversification: at most per_doc hits per document, kept in
            // score order
            let seen = per_doc_counts.entry(doc.doc_id.clone()).or_insert(0);
            if *seen >= req.per_doc {
                continue;
            }
            *seen += 1;
            kept.push(SearchCandidate { chunk_id, score });
        }

        if let Some(reranker) = self.reranker.clone() {
            if !kept.is_empty() {
                let texts: Vec<String> = kept
                    .iter()
                    .map(|c| self.store.get(&c.chunk_id).map(|ch| ch.text.clone()).unwrap_or_default())
                    .collect();
                let scores = self.rerank_scores(reranker.as_ref(), &req.q, &texts).await?;
                for (cand, score) in kept.iter_mut().zip(scores) {
                    cand.score = score;
                }
                sort_by_score(&mut kept);
            }
        }

        match req.sort {
            SortOrder::Relevance => {}
            SortOrder::Recency => self.sort_by_recency(&mut kept),
        }

        let total_available = kept.len();
        let page: Vec<&SearchCandidate> = kept.iter().skip(offset).take(req.k).collect();

        let mut results = Vec::with_capacity(page.len());
        for cand in page {
            results.push(self.render(cand, req.neighbors)?);
        }

        let next_offset = offset + results.len();
        let cursor_next = if next_offset < total_available {
            Some(cursor::encode(fingerprint, next_offset))
        } else {
            None
        };

        Ok(SearchResponse {
            query: req.q.clone(),
            params: RequestParams::from(req),
            count: results.len(),
            total_available,
            cursor_next,
            took_ms: started.elapsed().as_millis() as u64,
            results,
        })
    }

    async fn embed_query(&self, q: &str) -> Result<Vec<f32>> {
        let mut attempt = 0u32;
        loop {
            let out = match timeout(self.cfg.upstream_timeout, self.embedder.embed(q)).await {
                Err(_) => Err(Error::upstream(
                    format!("embedding timed out after {:?}", self.cfg.upstream_timeout),
                    true,
                )),
                Ok(res) => res,
            };
            match out {
                Ok(v) => {
                    if v.len() != self.index.dim() {
                        return Err(Error::DimensionMismatch {
                            expected: self.index.dim(),
                            got: v.len(),
                        });
                    }
                    return Ok(v);
                }
                Err(err) if err.is_retryable() && attempt < self.cfg.upstream_retries => {
                    attempt += 1;
                    warn!(%err, attempt, "transient embedding failure, backing off");
                    tokio::time::sleep(Duration::from_millis(100u64 << attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn rerank_scores(
        &self,
        reranker: &dyn Reranker,
        q: &str,
        texts: &[String],
    ) -> Result<Vec<f32>> {
        let mut attempt = 0u32;
        loop {
            let out = match timeout(self.cfg.upstream_timeout, reranker.rerank(q, texts)).await {
                Err(_) => Err(Error::upstream(
                    format!("rerank timed out after {:?}", self.cfg.upstream_timeout),
                    true,
                )),
                Ok(res) => res,
            };
            match out {
                Ok(scores) if scores.len() == texts.len() => return Ok(scores),
                Ok(scores) => {
                    return Err(Error::upstream(
                        format!(
                            "reranker returned {} scores for {} candidates",
                            scores.len(),
                            texts.len()
                        ),
                        false,
                    ))
                }
                Err(err) if err.is_retryable() && attempt < self.cfg.upstream_retries => {
                    attempt += 1;
                    warn!(%err, attempt, "transient rerank failure, backing off");
                    tokio::time::sleep(Duration::from_millis(100u64 << attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn sort_by_recency(&self, candidates: &mut [SearchCandidate]) {
        use std::cmp::Ordering;
        candidates.sort_by(|a, b| {
            let ya = self.year_of(&a.chunk_id);
            let yb = self.year_of(&b.chunk_id);
            match (ya, yb) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
    }

    fn year_of(&self, chunk_id: &str) -> Option<i32> {
        let chunk = self.store.get(chunk_id)?;
        self.store.document(&chunk.doc_id)?.year
    }

    fn render(&self, cand: &SearchCandidate, neighbors: usize) -> Result<SearchResult> {
        let chunk = self.store.get(&cand.chunk_id).ok_or_else(|| {
            Error::integrity(format!("chunk {} disappeared during rendering", cand.chunk_id))
        })?;
        let doc = self.store.document(&chunk.doc_id).ok_or_else(|| {
            Error::integrity(format!(
                "chunk {} references unknown document {}",
                cand.chunk_id, chunk.doc_id
            ))
        })?;
        let window = self.store.neighbors(&cand.chunk_id, neighbors);
        let (preview, neighbor_window) =
            stitch_preview(window, self.cfg.max_preview_chars, chunk);
        Ok(SearchResult {
            doc_id: doc.doc_id.clone(),
            chunk_id: chunk.chunk_id.clone(),
            score: cand.score,
            title: doc.title.clone(),
            year: doc.year,
            preview,
            neighbor_window,
            source_url: doc.source_url.clone(),
            filename: doc.filename.clone(),
        })
    }
}

fn validate(req: &SearchRequest) -> Result<()> {
    if req.q.trim().is_empty() {
        return Err(Error::validation("query must not be empty"));
    }
    if req.k < 1 || req.k > MAX_PAGE_SIZE {
        return Err(Error::validation(format!(
            "k must be within 1..={MAX_PAGE_SIZE}, got {}",
            req.k
        )));
    }
    if req.per_doc < 1 {
        return Err(Error::validation("per_doc must be at least 1"));
    }
    if let Some(YearFilter::Range { min, max }) = req.year {
        if min > max {
            return Err(Error::validation(format!(
                "year range {min}..{max} is inverted"
            )));
        }
    }
    Ok(())
}

/// Year and doc_id predicates over the owning document. Documents without
/// a year never match a year predicate.
fn passes_filters(doc: &Document, req: &SearchRequest) -> bool {
    if let Some(want) = &req.doc_id {
        if doc.doc_id != *want {
            return false;
        }
    }
    match req.year {
        None => true,
        Some(YearFilter::Exact(y)) => doc.year == Some(y),
        Some(YearFilter::Range { min, max }) => {
            doc.year.is_some_and(|y| y >= min && y <= max)
        }
    }
}

fn sort_by_score(candidates: &mut [SearchCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}

/// Concatenate the window's texts in position order, newline-flattened and
/// capped at `max_chars` bytes (cut on a char boundary). Returns the
/// preview and the inclusive `[start, end]` position window.
fn stitch_preview(window: &[Chunk], max_chars: usize, center: &Chunk) -> (String, [usize; 2]) {
    if window.is_empty() {
        let text = flatten(&center.text);
        return (truncate_on_boundary(&text, max_chars), [center.position, center.position]);
    }

    let mut parts: Vec<String> = Vec::with_capacity(window.len());
    let mut total = 0usize;
    for chunk in window {
        let text = flatten(&chunk.text);
        if text.is_empty() {
            continue;
        }
        let room = max_chars.saturating_sub(total);
        if room == 0 {
            break;
        }
        if text.len() <= room {
            total += text.len();
            parts.push(text);
        } else {
            parts.push(truncate_on_boundary(&text, room));
            break;
        }
    }

    let first = window[0].position;
    let last = window[window.len() - 1].position;
    (parts.join(" "), [first, last])
}

fn flatten(s: &str) -> String {
    s.replace('\n', " ").trim().to_string()
}

fn truncate_on_boundary(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
