//! passagedb-embed
//!
//! Embedding and rerank providers behind the core capability traits.
//! Providers are chosen by explicit configuration, never process-wide
//! state: `hash` is a deterministic offline stand-in, `http` calls a
//! remote model service.

pub mod hash;
pub mod http;

pub use hash::HashEmbedder;
pub use http::{HttpEmbedder, HttpReranker};

use std::sync::Arc;

use passagedb_core::config::{EmbeddingConfig, RerankConfig};
use passagedb_core::error::{Error, Result};
use passagedb_core::traits::{Embedder, Reranker};

/// Build the embedder named by configuration.
pub fn embedder_from_config(cfg: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match cfg.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbedder::new(cfg.dim))),
        "http" => Ok(Arc::new(HttpEmbedder::new(cfg)?)),
        other => Err(Error::validation(format!(
            "unknown embedding provider '{other}' (expected 'hash' or 'http')"
        ))),
    }
}

/// Build the reranker named by configuration, or `None` when reranking is
/// disabled.
pub fn reranker_from_config(cfg: &RerankConfig) -> Result<Option<Arc<dyn Reranker>>> {
    match cfg.provider.as_str() {
        "none" => Ok(None),
        "http" => Ok(Some(Arc::new(HttpReranker::new(cfg)?))),
        other => Err(Error::validation(format!(
            "unknown rerank provider '{other}' (expected 'none' or 'http')"
        ))),
    }
}
