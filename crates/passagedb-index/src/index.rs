//! Exact inner-product search over a row-major matrix.
//!
//! Row `i` of the matrix always corresponds to `ids[i]`; that bijection is
//! the invariant every search result rests on, so violations are integrity
//! faults, never silent. The index assumes vectors were L2-normalized by
//! their producer when cosine similarity is intended and does not
//! renormalize on the caller's behalf.

use std::collections::HashMap;

use passagedb_core::error::{Error, Result};
use passagedb_core::types::ChunkId;

pub struct VectorIndex {
    dim: usize,
    ids: Vec<ChunkId>,
    vectors: Vec<f32>,
    rows: HashMap<ChunkId, usize>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::validation("index dimension must be positive"));
        }
        Ok(Self {
            dim,
            ids: Vec::new(),
            vectors: Vec::new(),
            rows: HashMap::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Insert one vector keyed by chunk id. Wrong dimension and duplicate
    /// ids both fail loudly.
    pub fn add(&mut self, chunk_id: ChunkId, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        if self.rows.contains_key(&chunk_id) {
            return Err(Error::integrity(format!("chunk {chunk_id} already indexed")));
        }
        self.rows.insert(chunk_id.clone(), self.ids.len());
        self.ids.push(chunk_id);
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }

    /// Top-`n` chunk ids by descending inner product. Ties break by
    /// ascending chunk id so repeated queries page identically.
    pub fn search(&self, query: &[f32], top_n: usize) -> Result<Vec<(ChunkId, f32)>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }
        let mut scored: Vec<(usize, f32)> = (0..self.ids.len())
            .map(|i| {
                let dot = self.row(i).iter().zip(query).map(|(a, b)| a * b).sum::<f32>();
                (i, dot)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.ids[a.0].cmp(&self.ids[b.0]))
        });
        scored.truncate(top_n);
        Ok(scored
            .into_iter()
            .map(|(i, score)| (self.ids[i].clone(), score))
            .collect())
    }

    /// Rebuild from snapshot parts; validates the id↔row bijection.
    pub(crate) fn from_parts(ids: Vec<ChunkId>, vectors: Vec<f32>, dim: usize) -> Result<Self> {
        if dim == 0 || ids.len() * dim != vectors.len() {
            return Err(Error::integrity(format!(
                "vector matrix of {} floats does not align with {} ids",
                vectors.len(),
                ids.len()
            )));
        }
        let mut rows = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if rows.insert(id.clone(), i).is_some() {
                return Err(Error::integrity(format!("duplicate chunk id {id} in ids artifact")));
            }
        }
        Ok(Self { dim, ids, vectors, rows })
    }

    pub(crate) fn parts(&self) -> (&[ChunkId], &[f32]) {
        (&self.ids, &self.vectors)
    }
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v {
            *x /= norm;
        }
    }
}
