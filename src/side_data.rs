//! JSON persistence for comments and summaries.
//!
//! Two files, each a single JSON object keyed by article id:
//!
//! | File | Shape |
//! |------|-------|
//! | `comments.json` | `{ "<article_id>": [Comment, ...] }` (append-only per key) |
//! | `summaries.json` | `{ "<article_id>": { "summary", "updated_at" } }` (overwrite per key) |
//!
//! Every operation reads the whole file, changes it, and writes it back.
//! Read-modify-write cycles within one process are serialized by an internal
//! mutex; separate processes writing the same files are not coordinated and
//! the last write wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::content_store::ContentStore;
use crate::error::{CmsError, CmsResult};
use crate::models::{Comment, SummaryRecord};

pub type CommentMap = BTreeMap<String, Vec<Comment>>;
pub type SummaryMap = BTreeMap<String, SummaryRecord>;

/// Which side-data file an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideDataKind {
    Comments,
    Summaries,
}

/// Comments and summaries stored next to (not inside) the content tree.
pub struct SideDataStore {
    store: Arc<dyn ContentStore>,
    comments_file: PathBuf,
    summaries_file: PathBuf,
    write_lock: Mutex<()>,
}

impl SideDataStore {
    pub fn new(
        store: Arc<dyn ContentStore>,
        comments_file: impl Into<PathBuf>,
        summaries_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            comments_file: comments_file.into(),
            summaries_file: summaries_file.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self, kind: SideDataKind) -> &Path {
        match kind {
            SideDataKind::Comments => &self.comments_file,
            SideDataKind::Summaries => &self.summaries_file,
        }
    }

    /// Create each file as `{}` if it does not exist yet.
    pub fn ensure_files(&self) -> CmsResult<()> {
        for kind in [SideDataKind::Comments, SideDataKind::Summaries] {
            let path = self.path(kind);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !self.store.is_dir(parent) {
                    self.store
                        .mkdir_all(parent)
                        .map_err(|e| CmsError::io(parent, e))?;
                }
            }
            if !self.store.exists(path) {
                self.store
                    .write_file(path, b"{}")
                    .map_err(|e| CmsError::io(path, e))?;
            }
        }
        Ok(())
    }

    /// Read a whole mapping. A missing or blank file reads as empty.
    pub fn load<T>(&self, kind: SideDataKind) -> CmsResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path(kind);
        if !self.store.exists(path) {
            return Ok(T::default());
        }
        let bytes = self.store.read_file(path).map_err(|e| CmsError::io(path, e))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Overwrite a whole mapping.
    pub fn save<T: Serialize>(&self, kind: SideDataKind, mapping: &T) -> CmsResult<()> {
        let path = self.path(kind);
        let bytes = serde_json::to_vec(mapping)?;
        self.store
            .write_file(path, &bytes)
            .map_err(|e| CmsError::io(path, e))
    }

    pub fn comments(&self) -> CmsResult<CommentMap> {
        self.load(SideDataKind::Comments)
    }

    pub fn summaries(&self) -> CmsResult<SummaryMap> {
        self.load(SideDataKind::Summaries)
    }

    /// Comments for one article, oldest first.
    pub fn list_comments(&self, article_id: &str) -> CmsResult<Vec<Comment>> {
        Ok(self.comments()?.remove(article_id).unwrap_or_default())
    }

    /// Append a new comment and return it.
    pub fn add_comment(&self, article_id: &str, author: &str, content: &str) -> CmsResult<Comment> {
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            article_id: article_id.to_string(),
            author: author.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut comments = self.comments()?;
        comments
            .entry(article_id.to_string())
            .or_default()
            .push(comment.clone());
        self.save(SideDataKind::Comments, &comments)?;

        tracing::debug!(article_id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    /// Replace the summary for one article.
    pub fn save_summary(&self, article_id: &str, summary: &str) -> CmsResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut summaries = self.summaries()?;
        summaries.insert(
            article_id.to_string(),
            SummaryRecord {
                summary: summary.to_string(),
                updated_at: Utc::now(),
            },
        );
        self.save(SideDataKind::Summaries, &summaries)
    }
}
