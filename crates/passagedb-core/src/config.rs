//! Configuration loader and path helpers.
//!
//! Uses Figment to merge defaults + `config.toml` + `config.<env>.toml`
//! (selected by `RUST_ENV`) + `APP_*` env vars. Provides helpers to expand
//! `~` and `${VAR}` and to resolve relative paths against a base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// On-disk artifact locations consumed by the serving path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Chunk store directory (documents.jsonl + chunks.jsonl).
    pub store_dir: String,
    /// Vector index snapshot directory (ids.json + vectors.bin).
    pub index_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            store_dir: "data/store".to_string(),
            index_dir: "data/index".to_string(),
        }
    }
}

/// Embedding provider selection. Recognized providers: `hash`
/// (deterministic, offline) and `http` (remote model service).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub dim: usize,
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    /// Extra attempts after a transient upstream failure.
    pub retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            dim: 384,
            endpoint: String::new(),
            model: "bge-small-en-v1.5".to_string(),
            timeout_ms: 15_000,
            retries: 2,
        }
    }
}

/// Rerank provider selection: `none` or `http`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            endpoint: String::new(),
            model: "bge-reranker-base".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Retrieval pipeline defaults and tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub per_doc: usize,
    pub neighbors: usize,
    /// Multiplier in `N_over = max(k * per_doc * overfetch_factor, k)`.
    pub overfetch_factor: usize,
    pub max_preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            per_doc: 2,
            neighbors: 2,
            overfetch_factor: 4,
            max_preview_chars: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: "127.0.0.1:8080".to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub embedding: EmbeddingConfig,
    pub rerank: RerankConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Self::from_figment(figment)
    }

    /// Extract a config from an explicit Figment; `load` builds the standard
    /// one, tests supply their own providers.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        figment
            .extract()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {}", e))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. Absolute paths are returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
