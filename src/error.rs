//! Error taxonomy shared by the retrieval core and the service clients.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the library.
pub type Result<T, E = RagError> = std::result::Result<T, E>;

/// Failures surfaced by chunking, embedding, retrieval and answer composition.
#[derive(Debug, Error)]
pub enum RagError {
    /// The corpus file is missing or unreadable.
    #[error("failed to read corpus {}: {source}", path.display())]
    CorpusRead {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },

    /// An external service call failed or returned a non-success status.
    #[error("{service} request failed: {message}")]
    Upstream {
        /// Short name of the remote service (`embeddings`, `chat`).
        service: &'static str,
        /// Status line, body or transport error text.
        message: String,
    },

    /// An external service answered with data that does not fit the contract.
    #[error("{service} returned malformed data: {message}")]
    MalformedResponse {
        /// Short name of the remote service.
        service: &'static str,
        /// What was wrong with the payload.
        message: String,
    },

    /// A vector did not match the dimension of the index.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension of the indexed vectors.
        expected: usize,
        /// Dimension that was supplied.
        got: usize,
    },

    /// The question was empty after trimming.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// Client configuration was invalid (missing key, bad header, ...).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        RagError::Upstream {
            service,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        RagError::MalformedResponse {
            service,
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input rather than a remote service.
    pub fn is_input_error(&self) -> bool {
        matches!(self, RagError::CorpusRead { .. } | RagError::EmptyQuery)
    }
}
