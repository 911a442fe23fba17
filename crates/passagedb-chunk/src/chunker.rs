//! Token-window chunking with stable offsets.

use passagedb_core::error::{Error, Result};
use passagedb_core::traits::Tokenizer;
use passagedb_core::types::{Chunk, Document};

/// Window geometry, in tokens. `overlap` must be strictly smaller than
/// `window`.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub window: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { window: 512, overlap: 64 }
    }
}

pub struct Chunker<'a> {
    cfg: ChunkerConfig,
    tokenizer: &'a dyn Tokenizer,
}

impl<'a> Chunker<'a> {
    pub fn new(cfg: ChunkerConfig, tokenizer: &'a dyn Tokenizer) -> Result<Self> {
        if cfg.window == 0 {
            return Err(Error::validation("chunk window must be positive"));
        }
        if cfg.overlap >= cfg.window {
            return Err(Error::validation(format!(
                "overlap {} must be smaller than window {}",
                cfg.overlap, cfg.window
            )));
        }
        Ok(Self { cfg, tokenizer })
    }

    /// Chunk `text` for `doc`.
    ///
    /// Windows cover the whole token stream with no gaps: each spans
    /// `[start, min(start + window, total))` and the next starts at
    /// `start + window - overlap`. The final window may be shorter than
    /// `window` but is still emitted. Identical text and geometry always
    /// produce byte-identical boundaries. Text with no tokens produces no
    /// chunks.
    pub fn chunk(&self, doc: &Document, text: &str) -> Result<Vec<Chunk>> {
        let spans = self.tokenizer.spans(text)?;
        let total = spans.len();
        let mut chunks = Vec::new();
        if total == 0 {
            return Ok(chunks);
        }

        let step = self.cfg.window - self.cfg.overlap;
        let mut start = 0usize;
        loop {
            let end = usize::min(start + self.cfg.window, total);
            let char_start = spans[start].start;
            let char_end = spans[end - 1].end;
            let position = chunks.len();
            chunks.push(Chunk {
                chunk_id: chunk_id(&doc.doc_id, position),
                doc_id: doc.doc_id.clone(),
                position,
                token_start: start,
                token_end: end,
                char_start,
                char_end,
                text: text[char_start..char_end].to_string(),
            });
            if end == total {
                break;
            }
            start += step;
        }
        Ok(chunks)
    }
}

/// Chunk ids embed the owning document and position:
/// `{doc_id}_chunk{position:04}`.
pub fn chunk_id(doc_id: &str, position: usize) -> String {
    format!("{doc_id}_chunk{position:04}")
}
