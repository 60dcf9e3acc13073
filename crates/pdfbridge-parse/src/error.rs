//! Error types for the document engine.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`BackendError`]
//! for engine-internal failures and converts each kind to a
//! [`PdfError::Engine`] with a fixed [`ErrorCode`].

use pdfbridge_core::{ErrorCode, PdfError};
use thiserror::Error;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The document structure or syntax could not be parsed.
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reported by lopdf.
    #[error("lopdf error: {0}")]
    Lopdf(#[from] lopdf::Error),

    /// Error reading or writing document data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A content stream could not be decoded or re-encoded.
    #[error("content stream error: {0}")]
    Content(String),

    /// The input exceeds a configured limit.
    #[error("{name} exceeded: {actual} > {limit}")]
    Limit {
        name: &'static str,
        limit: usize,
        actual: usize,
    },

    /// A core-level error, passed through unchanged.
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl BackendError {
    /// The engine error code this error is reported with.
    pub fn code(&self) -> ErrorCode {
        match self {
            BackendError::Parse(_) | BackendError::Lopdf(_) => ErrorCode::Format,
            BackendError::Io(_) => ErrorCode::System,
            BackendError::Content(_) => ErrorCode::Syntax,
            BackendError::Limit { .. } => ErrorCode::Limit,
            BackendError::Core(e) => e.code().unwrap_or(ErrorCode::Generic),
        }
    }
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Core(e) => e,
            BackendError::Parse(ref msg) | BackendError::Content(ref msg) => {
                PdfError::engine(err.code(), msg.clone())
            }
            other => PdfError::engine(other.code(), other.to_string()),
        }
    }
}
