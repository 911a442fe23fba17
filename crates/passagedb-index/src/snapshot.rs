//! Index snapshot artifacts.
//!
//! A snapshot directory holds `ids.json` (the id array), `vectors.bin`
//! (row-major little-endian f32 matrix), and `manifest.json`. Row count and
//! id count are validated against each other at load time; a corrupt
//! artifact aborts startup instead of serving wrong neighbors. Rebuilds
//! write a fresh directory and swap atomically at the file level
//! (tmp then rename).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use passagedb_core::error::{Error, Result};
use passagedb_core::types::ChunkId;

use crate::index::VectorIndex;

pub const IDS_FILE: &str = "ids.json";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub dim: usize,
    pub count: usize,
    pub built_at: String,
}

pub fn ids_path(dir: &Path) -> PathBuf {
    dir.join(IDS_FILE)
}

pub fn vectors_path(dir: &Path) -> PathBuf {
    dir.join(VECTORS_FILE)
}

/// Write a snapshot directory for `index`.
pub fn save(index: &VectorIndex, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let (ids, vectors) = index.parts();

    write_atomic(&ids_path(dir), serde_json::to_vec(ids)?.as_slice())?;

    let mut bytes = Vec::with_capacity(vectors.len() * 4);
    for v in vectors {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    write_atomic(&vectors_path(dir), &bytes)?;

    let manifest = SnapshotManifest {
        dim: index.dim(),
        count: index.len(),
        built_at: Utc::now().to_rfc3339(),
    };
    write_atomic(&dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?.as_slice())?;
    Ok(())
}

/// Load a snapshot from its two required artifacts. The dimension is
/// derived from the byte count and id count; any misalignment fails fast.
pub fn load(ids_path: &Path, vectors_path: &Path) -> Result<VectorIndex> {
    let ids_bytes = fs::read(ids_path).map_err(|e| {
        Error::integrity(format!("missing ids artifact {}: {}", ids_path.display(), e))
    })?;
    let ids: Vec<ChunkId> = serde_json::from_slice(&ids_bytes)?;
    if ids.is_empty() {
        return Err(Error::integrity(format!(
            "ids artifact {} is empty",
            ids_path.display()
        )));
    }

    let bytes = fs::read(vectors_path).map_err(|e| {
        Error::integrity(format!(
            "missing vectors artifact {}: {}",
            vectors_path.display(),
            e
        ))
    })?;
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::integrity(format!(
            "vectors artifact {} has invalid length {}",
            vectors_path.display(),
            bytes.len()
        )));
    }
    let floats = bytes.len() / 4;
    if floats % ids.len() != 0 {
        return Err(Error::integrity(format!(
            "vector matrix ({} floats) does not align with {} ids",
            floats,
            ids.len()
        )));
    }
    let dim = floats / ids.len();
    let vectors = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    VectorIndex::from_parts(ids, vectors, dim)
}

/// Load a snapshot directory written by `save`.
pub fn load_dir(dir: &Path) -> Result<VectorIndex> {
    load(&ids_path(dir), &vectors_path(dir))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
