//! Offline corpus tooling and an ad-hoc query CLI.
//!
//! `chunk` turns a document corpus into a chunk-store directory, `build`
//! embeds every chunk and writes the vector index snapshot, `query` runs
//! the full retrieval pipeline against the on-disk artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use passagedb_chunk::{ChunkStore, Chunker, ChunkerConfig, HfTokenizer, WhitespaceTokenizer};
use passagedb_core::config::AppConfig;
use passagedb_core::traits::Tokenizer;
use passagedb_core::types::{Document, SearchRequest, SortOrder, YearFilter};
use passagedb_embed::{embedder_from_config, reranker_from_config};
use passagedb_index::{l2_normalize, snapshot, VectorIndex};
use passagedb_retrieval::{EngineConfig, RetrievalEngine};

#[derive(Parser)]
#[command(name = "passagedb", about = "Corpus chunking, indexing, and retrieval")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk a document corpus into a chunk-store directory
    Chunk {
        /// JSONL corpus: one record per document with at least a `text`
        /// field (doc_id, title, year, source_url, filename optional)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Alternatively, a directory of .txt files (doc id from file stem)
        #[arg(long)]
        docs_dir: Option<PathBuf>,
        /// Chunk store output directory
        #[arg(long)]
        store: PathBuf,
        #[arg(long, default_value_t = 512)]
        window: usize,
        #[arg(long, default_value_t = 64)]
        overlap: usize,
        /// HuggingFace tokenizer.json; whitespace tokenization when absent
        #[arg(long)]
        tokenizer: Option<PathBuf>,
    },
    /// Embed every chunk and write the vector index snapshot
    Build {
        /// Chunk store directory (defaults to config data.store_dir)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Index snapshot directory (defaults to config data.index_dir)
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Query the on-disk artifacts through the full retrieval pipeline
    Query {
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = 8)]
        k: usize,
        #[arg(long, default_value_t = 2)]
        neighbors: usize,
        #[arg(long, default_value_t = 2)]
        per_doc: usize,
        /// Exact publication year
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        year_min: Option<i32>,
        #[arg(long)]
        year_max: Option<i32>,
        #[arg(long)]
        doc_id: Option<String>,
        /// relevance | recency
        #[arg(long, default_value = "relevance")]
        sort: String,
        /// Cursor token from a previous page
        #[arg(long)]
        cursor: Option<String>,
        /// JSON lines instead of pretty text
        #[arg(long)]
        json: bool,
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long)]
        index: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct CorpusRecord {
    #[serde(default)]
    doc_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    text: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::load()?;
    let cli = Cli::parse();
    match cli.command {
        Command::Chunk { input, docs_dir, store, window, overlap, tokenizer } => {
            run_chunk(input, docs_dir, &store, window, overlap, tokenizer)
        }
        Command::Build { store, index } => {
            let store = store.unwrap_or_else(|| PathBuf::from(&cfg.data.store_dir));
            let index = index.unwrap_or_else(|| PathBuf::from(&cfg.data.index_dir));
            run_build(&cfg, &store, &index).await
        }
        Command::Query {
            q,
            k,
            neighbors,
            per_doc,
            year,
            year_min,
            year_max,
            doc_id,
            sort,
            cursor,
            json,
            store,
            index,
        } => {
            let store = store.unwrap_or_else(|| PathBuf::from(&cfg.data.store_dir));
            let index = index.unwrap_or_else(|| PathBuf::from(&cfg.data.index_dir));
            let req = SearchRequest {
                q,
                k,
                neighbors,
                per_doc,
                year: year_filter(year, year_min, year_max)?,
                doc_id,
                sort: parse_sort(&sort)?,
                cursor,
            };
            run_query(&cfg, &store, &index, req, json).await
        }
    }
}

fn run_chunk(
    input: Option<PathBuf>,
    docs_dir: Option<PathBuf>,
    store_dir: &Path,
    window: usize,
    overlap: usize,
    tokenizer_path: Option<PathBuf>,
) -> Result<()> {
    let tokenizer: Box<dyn Tokenizer> = match tokenizer_path {
        Some(p) => Box::new(HfTokenizer::from_file(&p)?),
        None => Box::new(WhitespaceTokenizer),
    };
    let chunker = Chunker::new(ChunkerConfig { window, overlap }, tokenizer.as_ref())?;

    let corpus = match (input, docs_dir) {
        (Some(path), None) => read_jsonl_corpus(&path)?,
        (None, Some(dir)) => read_txt_corpus(&dir)?,
        _ => bail!("exactly one of --input or --docs-dir is required"),
    };
    if corpus.is_empty() {
        bail!("corpus contains no documents");
    }

    let mut store = ChunkStore::new();
    for (doc, text) in corpus {
        let doc_id = doc.doc_id.clone();
        let chunks = chunker.chunk(&doc, &text)?;
        println!("{}: {} chunks", doc_id, chunks.len());
        store.insert_document(doc, chunks)?;
    }
    store.save(store_dir)?;
    println!(
        "✅ Chunked {} documents into {} chunks at {}",
        store.doc_count(),
        store.chunk_count(),
        store_dir.display()
    );
    Ok(())
}

async fn run_build(cfg: &AppConfig, store_dir: &Path, index_dir: &Path) -> Result<()> {
    let store = ChunkStore::load(store_dir)
        .with_context(|| format!("loading chunk store from {}", store_dir.display()))?;
    let embedder = embedder_from_config(&cfg.embedding)?;
    let mut index = VectorIndex::new(embedder.dim())?;

    let pb = ProgressBar::new(store.chunk_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks")?
            .progress_chars("#>-"),
    );
    for chunk in store.iter_chunks() {
        let mut vector = embedder.embed(&chunk.text).await?;
        l2_normalize(&mut vector);
        index.add(chunk.chunk_id.clone(), &vector)?;
        pb.inc(1);
    }
    pb.finish_with_message("embedded");

    snapshot::save(&index, index_dir)?;
    println!(
        "✅ Indexed {} chunks ({} dims) at {}",
        index.len(),
        index.dim(),
        index_dir.display()
    );
    Ok(())
}

async fn run_query(
    cfg: &AppConfig,
    store_dir: &Path,
    index_dir: &Path,
    req: SearchRequest,
    json: bool,
) -> Result<()> {
    let store = ChunkStore::load(store_dir)
        .with_context(|| format!("loading chunk store from {}", store_dir.display()))?;
    let index = snapshot::load_dir(index_dir)
        .with_context(|| format!("loading index snapshot from {}", index_dir.display()))?;
    let embedder = embedder_from_config(&cfg.embedding)?;
    let reranker = reranker_from_config(&cfg.rerank)?;
    let engine = RetrievalEngine::new(
        Arc::new(store),
        Arc::new(index),
        embedder,
        reranker,
        engine_config(cfg),
    );

    let resp = engine.search(&req).await?;
    if json {
        for result in &resp.results {
            println!("{}", serde_json::to_string(result)?);
        }
        if let Some(cursor) = &resp.cursor_next {
            eprintln!("cursor_next: {cursor}");
        }
        return Ok(());
    }

    for (rank, r) in resp.results.iter().enumerate() {
        let title = r.title.as_deref().unwrap_or(&r.doc_id);
        let year = r.year.map(|y| format!(" ({y})")).unwrap_or_default();
        let snippet: String = r.preview.chars().take(180).collect();
        println!("{:>2} {:.3}  {}{}  {}", rank + 1, r.score, title, year, snippet);
    }
    println!(
        "{} of {} results in {} ms",
        resp.count, resp.total_available, resp.took_ms
    );
    if let Some(cursor) = &resp.cursor_next {
        println!("next page: --cursor {cursor}");
    }
    Ok(())
}

fn engine_config(cfg: &AppConfig) -> EngineConfig {
    EngineConfig {
        overfetch_factor: cfg.retrieval.overfetch_factor,
        max_preview_chars: cfg.retrieval.max_preview_chars,
        upstream_timeout: std::time::Duration::from_millis(cfg.embedding.timeout_ms),
        upstream_retries: cfg.embedding.retries,
    }
}

fn parse_sort(sort: &str) -> Result<SortOrder> {
    match sort {
        "relevance" => Ok(SortOrder::Relevance),
        "recency" => Ok(SortOrder::Recency),
        other => bail!("unknown sort '{other}' (expected 'relevance' or 'recency')"),
    }
}

fn year_filter(
    year: Option<i32>,
    year_min: Option<i32>,
    year_max: Option<i32>,
) -> Result<Option<YearFilter>> {
    match (year, year_min, year_max) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            bail!("--year cannot be combined with --year-min/--year-max")
        }
        (Some(y), None, None) => Ok(Some(YearFilter::Exact(y))),
        (None, None, None) => Ok(None),
        (None, min, max) => Ok(Some(YearFilter::Range {
            min: min.unwrap_or(i32::MIN),
            max: max.unwrap_or(i32::MAX),
        })),
    }
}

fn read_jsonl_corpus(path: &Path) -> Result<Vec<(Document, String)>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    let mut out = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let rec: CorpusRecord = serde_json::from_str(line)
            .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        let doc_id = rec
            .doc_id
            .clone()
            .unwrap_or_else(|| blake3::hash(rec.text.as_bytes()).to_hex()[..16].to_string());
        let doc = Document {
            doc_id,
            title: rec.title,
            year: rec.year,
            source_url: rec.source_url,
            filename: rec.filename,
        };
        out.push((doc, rec.text));
    }
    Ok(out)
}

fn read_txt_corpus(dir: &Path) -> Result<Vec<(Document, String)>> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    let mut out = Vec::new();
    for path in files {
        let text = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(&path)?).to_string(),
        };
        let doc_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| blake3::hash(text.as_bytes()).to_hex()[..16].to_string());
        let doc = Document {
            doc_id,
            title: None,
            year: None,
            source_url: None,
            filename: path.file_name().map(|s| s.to_string_lossy().to_string()),
        };
        out.push((doc, text));
    }
    Ok(out)
}
