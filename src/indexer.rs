//! Category and article discovery over the content tree.
//!
//! Nothing is indexed ahead of time. Every call walks the tree through the
//! [`ContentStore`], so the result always reflects what is on disk.
//!
//! A subdirectory qualifies as a category when it directly contains a
//! markdown file or a non-hidden subdirectory. The probe is one level deep:
//! a directory holding only empty subdirectories still qualifies, which keeps
//! listing cheap on large trees.

use std::path::Path;

use crate::content_store::{ContentStore, DirEntry};
use crate::error::{CmsError, CmsResult};
use crate::models::{ArticleSummary, Category};
use crate::paths::{article_id, category_dir, is_markdown};

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Walks a content root to produce categories and article listings.
#[derive(Clone, Copy)]
pub struct CategoryIndexer<'a> {
    store: &'a dyn ContentStore,
    root: &'a Path,
}

impl<'a> CategoryIndexer<'a> {
    pub fn new(store: &'a dyn ContentStore, root: &'a Path) -> Self {
        Self { store, root }
    }

    /// All categories as a flat list, parents before their children.
    pub fn list_categories(&self) -> CmsResult<Vec<Category>> {
        let mut categories = Vec::new();
        self.collect_categories(self.root, None, &mut categories)?;
        Ok(categories)
    }

    fn collect_categories(
        &self,
        dir: &Path,
        parent_id: Option<&str>,
        out: &mut Vec<Category>,
    ) -> CmsResult<()> {
        let entries = self.store.list_dir(dir).map_err(|e| CmsError::io(dir, e))?;
        for entry in entries {
            if !entry.is_dir || is_hidden(&entry.name) {
                continue;
            }
            let path = dir.join(&entry.name);
            let children = match self.store.list_dir(&path) {
                Ok(children) => children,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };
            if !has_content(&children) {
                continue;
            }

            let id = match parent_id {
                Some(parent) => format!("{}/{}", parent, entry.name),
                None => entry.name.clone(),
            };
            out.push(Category {
                id: id.clone(),
                name: entry.name.clone(),
                path: path.display().to_string(),
            });
            self.collect_categories(&path, Some(&id), out)?;
        }
        Ok(())
    }

    /// Every article at any depth below `category_id`.
    ///
    /// Each summary carries the lineage of the directory that actually holds
    /// the file, not the queried category. Returns an empty list when the
    /// category does not exist. Summaries and comment counts are left empty
    /// for the caller to join in.
    pub fn list_articles(&self, category_id: &str) -> CmsResult<Vec<ArticleSummary>> {
        if category_id.split('/').any(|segment| segment == "..") {
            return Ok(Vec::new());
        }
        let dir = category_dir(self.root, category_id);
        if !self.store.is_dir(&dir) {
            return Ok(Vec::new());
        }
        let mut articles = Vec::new();
        self.collect_articles(&dir, category_id.trim_matches('/'), &mut articles)?;
        Ok(articles)
    }

    fn collect_articles(
        &self,
        dir: &Path,
        current_category: &str,
        out: &mut Vec<ArticleSummary>,
    ) -> CmsResult<()> {
        let entries = self.store.list_dir(dir).map_err(|e| CmsError::io(dir, e))?;
        for entry in entries {
            let path = dir.join(&entry.name);
            if entry.is_dir {
                if is_hidden(&entry.name) {
                    continue;
                }
                let sub_category = format!("{}/{}", current_category, entry.name);
                self.collect_articles(&path, &sub_category, out)?;
            } else if is_markdown(&entry.name) {
                let title = match self.store.read_file(&path) {
                    Ok(bytes) => extract_title(&String::from_utf8_lossy(&bytes), &entry.name),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "title falls back to filename");
                        entry.name.clone()
                    }
                };
                out.push(ArticleSummary {
                    id: article_id(current_category, &entry.name),
                    title,
                    category_id: current_category.to_string(),
                    summary: None,
                    comment_count: 0,
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn has_content(children: &[DirEntry]) -> bool {
    children.iter().any(|child| {
        if child.is_dir {
            !is_hidden(&child.name)
        } else {
            is_markdown(&child.name)
        }
    })
}

/// Title of a markdown document: the first non-empty line with leading `#`
/// and whitespace removed, or `filename` when there is no such line.
pub fn extract_title(content: &str, filename: &str) -> String {
    content
        .lines()
        .map(|line| line.trim_start_matches(|c: char| c == '#' || c.is_whitespace()).trim_end())
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| filename.to_string())
}
