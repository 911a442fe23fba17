use crate::error::Result;
use async_trait::async_trait;

/// Byte-offset span of one token in its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

/// Token segmentation with a stable offset mapping. Chunk boundaries are
/// derived from these spans, so identical text must always produce
/// identical spans.
pub trait Tokenizer: Send + Sync {
    fn spans(&self, text: &str) -> Result<Vec<TokenSpan>>;

    fn count(&self, text: &str) -> Result<usize> {
        Ok(self.spans(text)?.len())
    }
}

/// Query/passage embedding as an injected capability. Implementations call
/// an external model service or a deterministic stand-in; the engine wraps
/// every call in a timeout and dropping the future cancels it.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Optional relevance adjustment for `(query, text)` pairs. Returns one
/// adjusted score per input text, in order.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>>;
}
