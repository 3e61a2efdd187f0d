//! Ingestion error taxonomy.

use thiserror::Error;

use shelfsync_storage::{Connectivity, FetchError};

/// Payload is not a JSON array of objects.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload is not a JSON array")]
    NotAnArray,

    #[error("payload entry {index} is not a JSON object")]
    NonObjectEntry { index: usize },
}

/// Failure of a catalog store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable ({kind}): {message}")]
    Unavailable { kind: Connectivity, message: String },

    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn connectivity(&self) -> Option<Connectivity> {
        match self {
            StoreError::Unavailable { kind, .. } => Some(*kind),
            StoreError::Query(_) => None,
        }
    }
}

/// Per-notification failure. Siblings in the same batch are unaffected.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetching {bucket}/{key} failed: {source}")]
    FetchFailed {
        bucket: String,
        key: String,
        #[source]
        source: FetchError,
    },

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] DecodeError),

    /// The catalog table is left in its pre-operation state.
    #[error("catalog write failed: {0}")]
    WriteFailed(#[from] StoreError),
}

impl IngestError {
    /// Network-level cause, if any. These are worth retrying.
    pub fn connectivity(&self) -> Option<Connectivity> {
        match self {
            IngestError::FetchFailed { source, .. } => source.connectivity(),
            IngestError::MalformedPayload(_) => None,
            IngestError::WriteFailed(e) => e.connectivity(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        self.connectivity().is_some()
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        if let Some(kind) = self.connectivity() {
            return kind.code();
        }
        match self {
            IngestError::FetchFailed { source: FetchError::NotFound(_), .. } => "NOT_FOUND",
            IngestError::FetchFailed { .. } => "FETCH_FAILED",
            IngestError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            IngestError::WriteFailed(_) => "WRITE_FAILED",
        }
    }

    /// Short classified message for callers.
    pub fn brief(&self) -> &'static str {
        self.connectivity().map(Connectivity::brief).unwrap_or("Error")
    }
}
