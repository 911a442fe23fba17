//! Remote embedding/rerank over a JSON HTTP service.
//!
//! Connection and 5xx failures are reported as retryable upstream errors;
//! 4xx responses and malformed bodies are not retryable. The engine applies
//! its own timeout on top of the client-level one.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use passagedb_core::config::{EmbeddingConfig, RerankConfig};
use passagedb_core::error::{Error, Result};
use passagedb_core::traits::{Embedder, Reranker};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [String],
}

#[derive(Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

fn build_client(timeout_ms: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| Error::upstream(format!("failed to build http client: {e}"), false))
}

async fn post_json<B, R>(client: &reqwest::Client, url: &str, body: &B) -> Result<R>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::upstream(format!("request to {url} failed: {e}"), true))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::upstream(
            format!("{url} returned {status}"),
            status.is_server_error(),
        ));
    }
    resp.json::<R>()
        .await
        .map_err(|e| Error::upstream(format!("invalid response from {url}: {e}"), false))
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dim: usize,
}

impl HttpEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        if cfg.endpoint.is_empty() {
            return Err(Error::validation(
                "embedding.endpoint is required for the http provider",
            ));
        }
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            dim: cfg.dim,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbedRequest { model: &self.model, input: text };
        let out: EmbedResponse = post_json(&self.client, &self.endpoint, &body).await?;
        if out.embedding.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: out.embedding.len(),
            });
        }
        debug!(dim = self.dim, "embedded query via {}", self.endpoint);
        Ok(out.embedding)
    }
}

pub struct HttpReranker {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpReranker {
    pub fn new(cfg: &RerankConfig) -> Result<Self> {
        if cfg.endpoint.is_empty() {
            return Err(Error::validation(
                "rerank.endpoint is required for the http provider",
            ));
        }
        Ok(Self {
            client: build_client(cfg.timeout_ms)?,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let body = RerankRequest { model: &self.model, query, texts };
        let out: RerankResponse = post_json(&self.client, &self.endpoint, &body).await?;
        if out.scores.len() != texts.len() {
            return Err(Error::upstream(
                format!(
                    "reranker returned {} scores for {} candidates",
                    out.scores.len(),
                    texts.len()
                ),
                false,
            ));
        }
        Ok(out.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passagedb_core::config::{EmbeddingConfig, RerankConfig};

    #[test]
    fn http_providers_require_an_endpoint() {
        let cfg = EmbeddingConfig { provider: "http".to_string(), ..Default::default() };
        assert!(matches!(HttpEmbedder::new(&cfg), Err(Error::Validation(_))));

        let cfg = RerankConfig { provider: "http".to_string(), ..Default::default() };
        assert!(matches!(HttpReranker::new(&cfg), Err(Error::Validation(_))));
    }
}
