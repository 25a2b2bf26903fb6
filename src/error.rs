//! Error types for the content pipeline.
//!
//! Per-file problems during an import are not errors at this level: they are
//! recorded as [`FileOutcome`](crate::import::FileOutcome) values and folded
//! into the import statistics. Only conditions that abort an operation are
//! represented here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the repository, resolver, side-data store and import
/// pre-flight checks.
#[derive(Debug, Error)]
pub enum CmsError {
    /// An article, category or import source does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// An import source contains no markdown files at any depth.
    #[error("no markdown files found in {}", path.display())]
    NoContentFound { path: PathBuf },

    /// An article identifier without a `category/filename` split.
    #[error("invalid article id: {0}")]
    InvalidArticleId(String),

    /// A required path could not be read, written or created.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Side-data could not be encoded or decoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CmsError {
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for content pipeline operations.
pub type CmsResult<T> = std::result::Result<T, CmsError>;
