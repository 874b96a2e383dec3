use thiserror::Error;

use crate::PageId;

/// Failures surfaced by the analysis store.
///
/// Only setup and persistence can fail. Tracing and editing degrade to
/// no-ops instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("page is already registered as {0}")]
    PageAlreadyRegistered(PageId),

    #[error("not an analysis buffer (bad magic)")]
    BadMagic,

    #[error("unsupported analysis buffer version {0}")]
    UnsupportedVersion(u16),

    #[error("analysis buffer truncated reading {0}")]
    Truncated(&'static str),

    #[error("buffer holds {found} pages, expected {expected}")]
    PageCountMismatch { expected: usize, found: usize },

    #[error("page {index} is '{found}', expected '{expected}'")]
    PageNameMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("page offset {0} out of range")]
    OffsetOutOfRange(u16),

    #[error("page name is not valid UTF-8")]
    InvalidName,

    #[error("page body: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
