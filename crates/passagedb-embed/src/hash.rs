use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use passagedb_core::error::Result;
use passagedb_core::traits::Embedder;

/// Deterministic bag-of-tokens embedder: each whitespace token is hashed
/// into a bucket and the resulting vector is L2-normalized. No model
/// weights and no network, so builds and tests are fully reproducible.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let weight = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += weight + (i % 7) as f32 * 0.001;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_and_normalized() {
        let emb = HashEmbedder::new(64);
        let a = emb.embed("irrigation efficiency in cotton").await.expect("embed");
        let b = emb.embed("irrigation efficiency in cotton").await.expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);

        let other = emb.embed("completely different words").await.expect("embed");
        assert_ne!(a, other);
    }
}
