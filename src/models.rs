//! Core data models used throughout the content backend.
//!
//! Categories and articles are derived from the content directory on every
//! read; comments and summary records live in the side-data JSON files.
//! Import results are returned to the caller and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directory in the content tree that holds articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// `/`-joined lineage from the content root, e.g. `Tech/AI`.
    pub id: String,
    /// Leaf directory name.
    pub name: String,
    /// Filesystem location of the directory.
    pub path: String,
}

/// Article metadata as returned by category listings (no body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub category_id: String,
    pub summary: Option<String>,
    pub comment_count: usize,
    pub path: String,
}

/// A full article including the raw markdown body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(flatten)]
    pub meta: ArticleSummary,
    pub content: String,
}

/// A reader comment attached to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub article_id: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The single live summary for an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub summary: String,
    pub updated_at: DateTime<Utc>,
}

/// Counters produced by an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// Number of distinct top-level categories created by this run.
    pub categories: usize,
    pub articles: usize,
    /// Top-level category names created by this run, in first-seen order.
    pub categories_created: Vec<String>,
    pub errors: usize,
    pub summaries_generated: usize,
}

impl ImportStats {
    /// Record a newly created top-level category, ignoring repeats.
    pub fn record_category(&mut self, name: &str) {
        if !self.categories_created.iter().any(|c| c == name) {
            self.categories_created.push(name.to_string());
            self.categories += 1;
        }
    }
}

/// Outcome of an import operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportResult {
    Succeeded { success: bool, stats: ImportStats },
    Failed { success: bool, message: String },
}

impl ImportResult {
    pub fn succeeded(stats: ImportStats) -> Self {
        Self::Succeeded {
            success: true,
            stats,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            success: false,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn stats(&self) -> Option<&ImportStats> {
        match self {
            Self::Succeeded { stats, .. } => Some(stats),
            Self::Failed { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            Self::Succeeded { .. } => None,
        }
    }
}

/// A file received from an upload, held in memory until placed.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name as sent by the client; may carry a relative directory prefix.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}
