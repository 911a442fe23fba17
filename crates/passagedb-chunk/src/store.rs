//! Read-mostly chunk arena with per-document neighbor lookup and JSONL
//! persistence.
//!
//! Neighbor linkage is position-indexed lookup within a per-document
//! ordered list, not mutual references between chunks. The store is built
//! once offline and shared read-only by the serving path.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use passagedb_core::error::{Error, Result};
use passagedb_core::types::{Chunk, ChunkId, DocId, Document};

pub const DOCUMENTS_FILE: &str = "documents.jsonl";
pub const CHUNKS_FILE: &str = "chunks.jsonl";

#[derive(Debug, Default)]
pub struct ChunkStore {
    docs: HashMap<DocId, Document>,
    by_doc: HashMap<DocId, Vec<Chunk>>,
    locate: HashMap<ChunkId, (DocId, usize)>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and its position-ordered chunks. Positions must
    /// be contiguous from 0 and every chunk must name this document.
    pub fn insert_document(&mut self, doc: Document, chunks: Vec<Chunk>) -> Result<()> {
        if self.docs.contains_key(&doc.doc_id) {
            return Err(Error::integrity(format!(
                "document {} inserted twice",
                doc.doc_id
            )));
        }
        for (i, c) in chunks.iter().enumerate() {
            if c.doc_id != doc.doc_id {
                return Err(Error::integrity(format!(
                    "chunk {} belongs to {} but was inserted under {}",
                    c.chunk_id, c.doc_id, doc.doc_id
                )));
            }
            if c.position != i {
                return Err(Error::integrity(format!(
                    "chunk positions for {} are not contiguous: expected {}, got {}",
                    doc.doc_id, i, c.position
                )));
            }
            if self.locate.contains_key(&c.chunk_id) {
                return Err(Error::integrity(format!(
                    "duplicate chunk id {}",
                    c.chunk_id
                )));
            }
        }
        for (i, c) in chunks.iter().enumerate() {
            self.locate.insert(c.chunk_id.clone(), (doc.doc_id.clone(), i));
        }
        self.by_doc.insert(doc.doc_id.clone(), chunks);
        self.docs.insert(doc.doc_id.clone(), doc);
        Ok(())
    }

    pub fn document(&self, doc_id: &str) -> Option<&Document> {
        self.docs.get(doc_id)
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        let (doc_id, pos) = self.locate.get(chunk_id)?;
        self.by_doc.get(doc_id).and_then(|chunks| chunks.get(*pos))
    }

    /// Chunks at positions `[pos - n, pos + n]` around `chunk_id`, clamped
    /// to the owning document. The window shrinks at document edges and
    /// never crosses into another document.
    pub fn neighbors(&self, chunk_id: &str, n: usize) -> &[Chunk] {
        let Some((doc_id, pos)) = self.locate.get(chunk_id) else {
            return &[];
        };
        let Some(chunks) = self.by_doc.get(doc_id) else {
            return &[];
        };
        let lo = pos.saturating_sub(n);
        let hi = usize::min(pos + n, chunks.len() - 1);
        &chunks[lo..=hi]
    }

    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.locate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locate.is_empty()
    }

    /// All chunks in `(doc_id, position)` order — the deterministic
    /// traversal the build pipeline indexes in.
    pub fn iter_chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        let mut doc_ids: Vec<&DocId> = self.by_doc.keys().collect();
        doc_ids.sort();
        doc_ids.into_iter().flat_map(move |d| self.by_doc[d].iter())
    }

    /// Write `documents.jsonl` + `chunks.jsonl` under `dir`, atomically
    /// (tmp file then rename), documents and chunks in deterministic order.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let mut doc_ids: Vec<&DocId> = self.docs.keys().collect();
        doc_ids.sort();

        write_jsonl_atomic(
            &dir.join(DOCUMENTS_FILE),
            doc_ids.iter().map(|d| &self.docs[*d]),
        )?;
        write_jsonl_atomic(&dir.join(CHUNKS_FILE), self.iter_chunks())?;
        Ok(())
    }

    /// Load a store directory. A missing or empty artifact is a fatal
    /// configuration error, not a runtime-recoverable one.
    pub fn load(dir: &Path) -> Result<Self> {
        let docs: Vec<Document> = read_jsonl(&dir.join(DOCUMENTS_FILE))?;
        let chunks: Vec<Chunk> = read_jsonl(&dir.join(CHUNKS_FILE))?;
        if docs.is_empty() || chunks.is_empty() {
            return Err(Error::integrity(format!(
                "chunk store at {} is empty",
                dir.display()
            )));
        }

        let mut grouped: HashMap<DocId, Vec<Chunk>> = HashMap::new();
        for c in chunks {
            grouped.entry(c.doc_id.clone()).or_default().push(c);
        }

        let mut store = Self::new();
        for doc in docs {
            let mut doc_chunks = grouped.remove(&doc.doc_id).unwrap_or_default();
            doc_chunks.sort_by_key(|c| c.position);
            store.insert_document(doc, doc_chunks)?;
        }
        if let Some(orphan) = grouped.keys().next() {
            return Err(Error::integrity(format!(
                "chunks reference unknown document {orphan}"
            )));
        }
        Ok(store)
    }
}

fn write_jsonl_atomic<'a, T, I>(path: &Path, records: I) -> Result<()>
where
    T: serde::Serialize + 'a,
    I: Iterator<Item = &'a T>,
{
    let tmp = path.with_extension("tmp");
    {
        let mut w = BufWriter::new(fs::File::create(&tmp)?);
        for rec in records {
            serde_json::to_writer(&mut w, rec)?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path).map_err(|e| {
        Error::integrity(format!("missing chunk store artifact {}: {}", path.display(), e))
    })?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}
