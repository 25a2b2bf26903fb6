//! Article repository: the read/write surface used by the CLI and server.
//!
//! Composes the [`PathResolver`], [`CategoryIndexer`] and [`SideDataStore`]
//! over one [`ContentStore`]. Nothing is cached between calls; each read
//! walks the content tree and reloads side-data, so a write is always
//! visible to the next read.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, ImportConfig};
use crate::content_store::{ContentStore, DiskContentStore};
use crate::error::{CmsError, CmsResult};
use crate::import::ImportEngine;
use crate::indexer::{extract_title, CategoryIndexer};
use crate::models::{Article, ArticleSummary, Category, Comment};
use crate::paths::{split_article_id, PathResolver};
use crate::side_data::SideDataStore;
use crate::summarize::Summarizer;

/// Content directory used when the configured one cannot be created.
const LOCAL_CONTENT_DIR: &str = "./content";

pub struct Repository {
    store: Arc<dyn ContentStore>,
    content_root: PathBuf,
    side_data: Arc<SideDataStore>,
}

impl Repository {
    /// Open the repository described by `config` on the real filesystem.
    ///
    /// Falls back to `./content` when the content root cannot be created, and
    /// to `./content/{comments,summaries}.json` when the side-data directory
    /// cannot be created or written. Missing side-data files are created as `{}`.
    pub fn open(config: &Config) -> CmsResult<Self> {
        let store: Arc<dyn ContentStore> = Arc::new(DiskContentStore);

        let content_root = match store.mkdir_all(&config.content.root) {
            Ok(()) => config.content.root.clone(),
            Err(e) => {
                tracing::warn!(
                    path = %config.content.root.display(),
                    error = %e,
                    "cannot create content directory, using local content directory instead"
                );
                let local = PathBuf::from(LOCAL_CONTENT_DIR);
                store.mkdir_all(&local).map_err(|e| CmsError::io(&local, e))?;
                local
            }
        };

        let comments = &config.data.comments_file;
        let summaries = &config.data.summaries_file;
        let (comments_file, summaries_file) =
            if data_dir_usable(store.as_ref(), comments) && data_dir_usable(store.as_ref(), summaries) {
                (comments.clone(), summaries.clone())
            } else {
                tracing::warn!(
                    comments = %comments.display(),
                    summaries = %summaries.display(),
                    "cannot access data files, using local data files instead"
                );
                let local = Path::new(LOCAL_CONTENT_DIR);
                (local.join("comments.json"), local.join("summaries.json"))
            };

        Self::with_store(store, content_root, comments_file, summaries_file)
    }

    /// Build a repository over any store, creating missing side-data files.
    pub fn with_store(
        store: Arc<dyn ContentStore>,
        content_root: impl Into<PathBuf>,
        comments_file: impl Into<PathBuf>,
        summaries_file: impl Into<PathBuf>,
    ) -> CmsResult<Self> {
        let side_data = Arc::new(SideDataStore::new(
            store.clone(),
            comments_file,
            summaries_file,
        ));
        side_data.ensure_files()?;
        Ok(Self {
            store,
            content_root: content_root.into(),
            side_data,
        })
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn side_data(&self) -> &Arc<SideDataStore> {
        &self.side_data
    }

    /// An import engine writing into this repository's content root.
    pub fn import_engine(
        &self,
        summarizer: Arc<dyn Summarizer>,
        limits: &ImportConfig,
    ) -> ImportEngine {
        ImportEngine::new(
            self.store.clone(),
            self.content_root.clone(),
            self.side_data.clone(),
            summarizer,
        )
        .with_limits(limits.batch_size, limits.max_concurrent)
    }

    fn indexer(&self) -> CategoryIndexer<'_> {
        CategoryIndexer::new(self.store.as_ref(), &self.content_root)
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self.store.as_ref(), &self.content_root)
    }

    pub fn get_categories(&self) -> CmsResult<Vec<Category>> {
        self.indexer().list_categories()
    }

    /// Articles at any depth below `category_id`, with summaries and
    /// comment counts joined in. Unknown categories yield an empty list.
    pub fn get_articles_by_category(&self, category_id: &str) -> CmsResult<Vec<ArticleSummary>> {
        let mut articles = self.indexer().list_articles(category_id)?;
        if articles.is_empty() {
            return Ok(articles);
        }
        let comments = self.side_data.comments()?;
        let mut summaries = self.side_data.summaries()?;
        for article in &mut articles {
            article.comment_count = comments.get(&article.id).map_or(0, Vec::len);
            article.summary = summaries.remove(&article.id).map(|r| r.summary);
        }
        Ok(articles)
    }

    pub fn get_article(&self, article_id: &str) -> CmsResult<Article> {
        let path = self.resolver().resolve(article_id)?;
        let (category_id, filename) = split_article_id(article_id)?;

        let bytes = self.store.read_file(&path).map_err(|e| CmsError::io(&path, e))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let comment_count = self
            .side_data
            .comments()?
            .get(article_id)
            .map_or(0, Vec::len);
        let summary = self
            .side_data
            .summaries()?
            .remove(article_id)
            .map(|r| r.summary);

        Ok(Article {
            meta: ArticleSummary {
                id: article_id.to_string(),
                title: extract_title(&content, filename),
                category_id: category_id.to_string(),
                summary,
                comment_count,
                path: path.display().to_string(),
            },
            content,
        })
    }

    pub fn get_comments(&self, article_id: &str) -> CmsResult<Vec<Comment>> {
        self.side_data.list_comments(article_id)
    }

    /// Append a comment; fails with `NotFound` when the article does not exist.
    pub fn add_comment(&self, article_id: &str, author: &str, content: &str) -> CmsResult<Comment> {
        self.resolver().resolve(article_id)?;
        self.side_data.add_comment(article_id, author, content)
    }

    pub fn save_summary(&self, article_id: &str, summary: &str) -> CmsResult<()> {
        self.side_data.save_summary(article_id, summary)
    }

    /// Summarize an existing article and store the result.
    pub async fn summarize_article(
        &self,
        article_id: &str,
        summarizer: &dyn Summarizer,
    ) -> anyhow::Result<String> {
        let article = self.get_article(article_id)?;
        let summary = summarizer.summarize(&article.content).await?;
        self.save_summary(article_id, &summary)?;
        tracing::info!(article_id, provider = summarizer.name(), "summary saved");
        Ok(summary)
    }
}

/// Whether the directory holding `file` exists (or can be made) and is writable.
fn data_dir_usable(store: &dyn ContentStore, file: &Path) -> bool {
    let parent = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !store.is_dir(parent) && store.mkdir_all(parent).is_err() {
        return false;
    }
    store.is_writable_dir(parent)
}
