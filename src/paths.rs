//! Mapping between article identifiers and filesystem paths.
//!
//! An article identifier is `"<category_id>/<filename>"`. Category ids are
//! themselves `/`-joined lineages (`Tech/AI`), so the only authoritative
//! split is at the **last** separator. HTTP routes that capture the category
//! and the filename as two parameters may hand over a filename that still
//! contains separators; [`normalize_route_segments`] re-derives the true pair
//! and is the single place that logic lives.

use std::path::{Path, PathBuf};

use crate::content_store::ContentStore;
use crate::error::{CmsError, CmsResult};

/// Extension that marks a file as an article.
pub const MARKDOWN_EXT: &str = ".md";

pub fn is_markdown(name: &str) -> bool {
    name.ends_with(MARKDOWN_EXT)
}

/// Build an article identifier from its parts.
pub fn article_id(category_id: &str, filename: &str) -> String {
    format!("{}/{}", category_id, filename)
}

/// Split an identifier at its last `/` into `(category_id, filename)`.
///
/// Identifiers containing a `..` segment are rejected so they cannot climb
/// out of the content root.
pub fn split_article_id(article_id: &str) -> CmsResult<(&str, &str)> {
    if article_id.split('/').any(|segment| segment == "..") {
        return Err(CmsError::InvalidArticleId(article_id.to_string()));
    }
    match article_id.rsplit_once('/') {
        Some((category, filename)) if !category.is_empty() && !filename.is_empty() => {
            Ok((category, filename))
        }
        _ => Err(CmsError::InvalidArticleId(article_id.to_string())),
    }
}

/// Re-derive `(category_id, filename)` when `filename` carries extra segments.
///
/// `("Tech", "AI/intro.md")` becomes `("Tech/AI", "intro.md")`. Pairs whose
/// filename has no separator pass through unchanged.
pub fn normalize_route_segments(category_id: &str, filename: &str) -> (String, String) {
    match filename.rsplit_once('/') {
        Some((prefix, leaf)) => {
            let prefix = prefix.trim_matches('/');
            let category = match (category_id.is_empty(), prefix.is_empty()) {
                (true, _) => prefix.to_string(),
                (false, true) => category_id.to_string(),
                (false, false) => format!("{}/{}", category_id, prefix),
            };
            (category, leaf.to_string())
        }
        None => (category_id.to_string(), filename.to_string()),
    }
}

/// Split a captured route remainder naively at its first `/`, then normalize.
///
/// This is the entry point for routes like `/api/articles/{*rest}`.
pub fn route_article_id(rest: &str) -> CmsResult<String> {
    let rest = rest.trim_matches('/');
    let (category, filename) = rest
        .split_once('/')
        .ok_or_else(|| CmsError::InvalidArticleId(rest.to_string()))?;
    let (category, filename) = normalize_route_segments(category, filename);
    Ok(article_id(&category, &filename))
}

/// Join a `/`-separated category id onto a root path, one segment at a time.
pub fn category_dir(root: &Path, category_id: &str) -> PathBuf {
    category_id
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Resolves article identifiers to files under a content root.
#[derive(Clone, Copy)]
pub struct PathResolver<'a> {
    store: &'a dyn ContentStore,
    root: &'a Path,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a dyn ContentStore, root: &'a Path) -> Self {
        Self { store, root }
    }

    /// Find the file for `article_id`.
    ///
    /// Tries `root/<category_id>/<filename>` first, then the whole id as a
    /// single entry directly under the root (identifiers written before
    /// nested categories existed).
    pub fn resolve(&self, article_id: &str) -> CmsResult<PathBuf> {
        let (category_id, filename) = split_article_id(article_id)?;
        let primary = category_dir(self.root, category_id).join(filename);
        if self.store.is_file(&primary) {
            return Ok(primary);
        }

        let legacy = self.root.join(article_id);
        if self.store.is_file(&legacy) {
            tracing::debug!(article_id, path = %legacy.display(), "resolved legacy article path");
            return Ok(legacy);
        }

        Err(CmsError::not_found("article", article_id))
    }
}
