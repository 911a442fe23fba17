use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("corpus integrity fault: {0}")]
    Integrity(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("upstream model service failed: {message}")]
    Upstream { message: String, retryable: bool },

    #[error("malformed cursor: {0}")]
    Decode(String),

    #[error("token offsets could not be aligned with text: {0}")]
    ChunkAlignment(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Error::Integrity(msg.into())
    }

    pub fn upstream(msg: impl Into<String>, retryable: bool) -> Self {
        Error::Upstream { message: msg.into(), retryable }
    }

    /// Whether a bounded retry with backoff is worthwhile. Only transient
    /// upstream failures qualify; validation and integrity faults never do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upstream { retryable: true, .. })
    }

    /// Stable machine-readable code reported at the API boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "BAD_REQUEST",
            Error::Integrity(_) | Error::DimensionMismatch { .. } => "INTEGRITY",
            Error::Upstream { .. } => "UPSTREAM_UNAVAILABLE",
            Error::Decode(_) => "BAD_CURSOR",
            Error::ChunkAlignment(_) => "CHUNK_ALIGNMENT",
            Error::Io(_) | Error::Json(_) => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
