use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a source document into per-page text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open document {path:?}: {reason}")]
    DocumentOpen { path: PathBuf, reason: String },

    #[error("cannot read page {page}: {reason}")]
    PageRead { page: u32, reason: String },

    #[error("extraction backend '{0}' is not available in this build")]
    BackendUnavailable(&'static str),
}

#[derive(Debug, Error)]
pub enum ModuleConfigError {
    #[error("module '{name}' has an inverted page range {start}-{end}")]
    InvertedRange { name: String, start: u32, end: u32 },

    #[error("modules '{first}' and '{second}' overlap on page {page}")]
    Overlap {
        first: String,
        second: String,
        page: u32,
    },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("course not found or inactive: \"{0}\"")]
    CourseNotFound(String),

    #[error("page {page} is outside every module")]
    UnresolvedModule { page: u32 },

    #[error("{count} resolution errors exceed the limit of {max}")]
    TooManyErrors { count: usize, max: usize },

    #[error("invalid page range \"{0}\" (expected N or N-M, 1-based)")]
    InvalidPageRange(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    ModuleConfig(#[from] ModuleConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
