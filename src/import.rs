//! Bulk import of markdown files into the category tree.
//!
//! Two entry points:
//!
//! - [`ImportEngine::import_from_directory`] copies every markdown file under
//!   a local directory into the content root, using each file's relative
//!   directory as its category. Synchronous; blocks the caller.
//! - [`ImportEngine::import_from_uploads`] places in-memory uploads into the
//!   categories named by a caller-supplied `filename -> category` map and
//!   summarizes each one. Files go through in fixed-size batches; inside a
//!   batch a semaphore admits at most `max_concurrent` files at a time, in
//!   input order. Batch N+1 starts only after batch N has drained.
//!
//! Each file ends in a [`FileOutcome`]. Outcomes are folded into
//! [`ImportStats`] only after all work has finished, so the counts do not
//! depend on completion order. Pre-flight problems (missing source, no
//! markdown files, content root cannot be created) fail the whole import;
//! anything that goes wrong with a single file is counted and the import
//! carries on.
//!
//! Importing a file whose name already exists in the target category
//! replaces the existing file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::content_store::ContentStore;
use crate::error::{CmsError, CmsResult};
use crate::models::{ImportResult, ImportStats, UploadedFile};
use crate::paths::{article_id, category_dir, is_markdown};
use crate::side_data::SideDataStore;
use crate::summarize::Summarizer;

/// Number of uploaded files handled per batch.
pub const BATCH_SIZE: usize = 10;
/// Upper bound on files being placed or summarized at the same time.
pub const MAX_CONCURRENT: usize = 5;

/// Why a file was left out without counting as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The upload had no entry in the category map.
    NoCategory,
}

/// Result of importing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Placed {
        /// Top-level category this file's placement created, if any.
        created_category: Option<String>,
        summary_generated: bool,
    },
    Skipped {
        file: String,
        reason: SkipReason,
    },
    Failed {
        file: String,
        error: String,
    },
}

/// Fold per-file outcomes into import statistics.
pub fn fold_outcomes(outcomes: &[FileOutcome]) -> ImportStats {
    let mut stats = ImportStats::default();
    for outcome in outcomes {
        match outcome {
            FileOutcome::Placed {
                created_category,
                summary_generated,
            } => {
                stats.articles += 1;
                if let Some(category) = created_category {
                    stats.record_category(category);
                }
                if *summary_generated {
                    stats.summaries_generated += 1;
                }
            }
            FileOutcome::Failed { .. } => stats.errors += 1,
            FileOutcome::Skipped { .. } => {}
        }
    }
    stats
}

/// Imports markdown files into a content root.
#[derive(Clone)]
pub struct ImportEngine {
    store: Arc<dyn ContentStore>,
    content_root: PathBuf,
    side_data: Arc<SideDataStore>,
    summarizer: Arc<dyn Summarizer>,
    batch_size: usize,
    max_concurrent: usize,
}

impl ImportEngine {
    pub fn new(
        store: Arc<dyn ContentStore>,
        content_root: impl Into<PathBuf>,
        side_data: Arc<SideDataStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            store,
            content_root: content_root.into(),
            side_data,
            summarizer,
            batch_size: BATCH_SIZE,
            max_concurrent: MAX_CONCURRENT,
        }
    }

    /// Override the batch size and concurrency bound (both at least 1).
    pub fn with_limits(mut self, batch_size: usize, max_concurrent: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    fn ensure_content_root(&self) -> CmsResult<()> {
        if self.store.is_dir(&self.content_root) {
            return Ok(());
        }
        tracing::info!(path = %self.content_root.display(), "creating content directory");
        self.store
            .mkdir_all(&self.content_root)
            .map_err(|e| CmsError::io(&self.content_root, e))
    }

    // ============ Directory import ============

    /// Copy every markdown file under `source` into the content root.
    ///
    /// Files directly in `source` are filed under a category named after
    /// `source` itself.
    pub fn import_from_directory(&self, source: &Path) -> ImportResult {
        tracing::info!(source = %source.display(), content_root = %self.content_root.display(), "directory import started");

        if !self.store.is_dir(source) {
            tracing::warn!(source = %source.display(), "import source not found");
            return ImportResult::failed(
                CmsError::not_found("directory", source.display().to_string()).to_string(),
            );
        }
        if let Err(e) = self.ensure_content_root() {
            tracing::error!(error = %e, "cannot create content directory");
            return ImportResult::failed(format!("cannot create content directory: {}", e));
        }

        let files = match self.scan_directory(source) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "directory import found nothing to do");
                return ImportResult::failed(e.to_string());
            }
        };
        tracing::info!(count = files.len(), "found markdown files");

        let fallback_category = source_category_name(source);
        let outcomes: Vec<FileOutcome> = files
            .iter()
            .map(|(path, relative_dir)| {
                let category = if relative_dir.is_empty() {
                    fallback_category.as_str()
                } else {
                    relative_dir.as_str()
                };
                self.copy_into_category(path, category)
            })
            .collect();

        let stats = fold_outcomes(&outcomes);
        tracing::info!(
            articles = stats.articles,
            categories = stats.categories,
            errors = stats.errors,
            "directory import finished"
        );
        ImportResult::succeeded(stats)
    }

    /// Markdown files under `source` with their `/`-joined relative directory.
    fn scan_directory(&self, source: &Path) -> CmsResult<Vec<(PathBuf, String)>> {
        let all = self
            .store
            .walk_files(source)
            .map_err(|e| CmsError::io(source, e))?;

        let files: Vec<(PathBuf, String)> = all
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .map(|n| is_markdown(&n.to_string_lossy()))
                    .unwrap_or(false)
            })
            .map(|path| {
                let relative_dir = path
                    .parent()
                    .and_then(|p| p.strip_prefix(source).ok())
                    .map(|rel| {
                        rel.components()
                            .map(|c| c.as_os_str().to_string_lossy().to_string())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
                    .unwrap_or_default();
                (path, relative_dir)
            })
            .collect();

        if files.is_empty() {
            return Err(CmsError::NoContentFound {
                path: source.to_path_buf(),
            });
        }
        Ok(files)
    }

    fn copy_into_category(&self, source_file: &Path, category: &str) -> FileOutcome {
        let file_label = source_file.display().to_string();
        let target_dir = category_dir(&self.content_root, category);

        let mut created_category = None;
        if !self.store.is_dir(&target_dir) {
            tracing::info!(path = %target_dir.display(), "creating category directory");
            if let Err(e) = self.store.mkdir_all(&target_dir) {
                tracing::warn!(file = %file_label, error = %e, "failed to create category directory");
                return FileOutcome::Failed {
                    file: file_label,
                    error: e.to_string(),
                };
            }
            created_category = category
                .split('/')
                .find(|s| !s.is_empty())
                .map(str::to_string);
        }

        let Some(filename) = source_file.file_name() else {
            return FileOutcome::Failed {
                file: file_label,
                error: "source path has no file name".to_string(),
            };
        };
        let target = target_dir.join(filename);
        if self.store.exists(&target) {
            if self.store.is_same_file(source_file, &target) {
                tracing::warn!(file = %file_label, "source is already in place, not copying");
                return FileOutcome::Failed {
                    file: file_label,
                    error: "source and target are the same file".to_string(),
                };
            }
            tracing::debug!(target = %target.display(), "overwriting existing article");
        }

        match self.store.copy_file(source_file, &target) {
            Ok(()) => {
                tracing::debug!(from = %file_label, to = %target.display(), "copied article");
                FileOutcome::Placed {
                    created_category,
                    summary_generated: false,
                }
            }
            Err(e) => {
                tracing::warn!(file = %file_label, error = %e, "failed to copy article");
                FileOutcome::Failed {
                    file: file_label,
                    error: e.to_string(),
                }
            }
        }
    }

    // ============ Upload import ============

    /// Place uploaded files into the categories given by `category_map`
    /// (keyed by [`UploadedFile::filename`]) and summarize each one.
    pub async fn import_from_uploads(
        &self,
        files: Vec<UploadedFile>,
        category_map: &HashMap<String, String>,
    ) -> ImportResult {
        let started = Instant::now();
        let total = files.len();
        tracing::info!(files = total, content_root = %self.content_root.display(), "upload import started");

        if let Err(e) = self.ensure_content_root() {
            tracing::error!(error = %e, "cannot create content directory");
            return ImportResult::failed(format!("cannot create content directory: {}", e));
        }

        let category_map = Arc::new(category_map.clone());
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let batch_count = total.div_ceil(self.batch_size);
        let mut outcomes = Vec::with_capacity(total);
        let mut pending = files.into_iter().enumerate();

        for batch_no in 1..=batch_count {
            let batch: Vec<(usize, UploadedFile)> =
                pending.by_ref().take(self.batch_size).collect();
            tracing::info!(batch = batch_no, of = batch_count, files = batch.len(), "processing batch");

            let mut handles = Vec::with_capacity(batch.len());
            for (index, file) in batch {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        outcomes.push(FileOutcome::Failed {
                            file: file.filename,
                            error: e.to_string(),
                        });
                        continue;
                    }
                };
                let engine = self.clone();
                let category_map = category_map.clone();
                let filename = file.filename.clone();
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    engine
                        .place_upload(index + 1, total, file, &category_map)
                        .await
                });
                handles.push((filename, handle));
            }

            for (filename, handle) in handles {
                match handle.await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => {
                        tracing::error!(file = %filename, error = %e, "upload task aborted");
                        outcomes.push(FileOutcome::Failed {
                            file: filename,
                            error: e.to_string(),
                        });
                    }
                }
            }
            tracing::info!(batch = batch_no, of = batch_count, "batch complete");
        }

        let stats = fold_outcomes(&outcomes);
        let elapsed = started.elapsed();
        if stats.articles == 0 {
            tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "upload import placed no files");
            return ImportResult::failed("No files were imported");
        }

        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            articles = stats.articles,
            categories = stats.categories,
            summaries = stats.summaries_generated,
            errors = stats.errors,
            "upload import finished"
        );
        ImportResult::succeeded(stats)
    }

    async fn place_upload(
        &self,
        position: usize,
        total: usize,
        file: UploadedFile,
        category_map: &HashMap<String, String>,
    ) -> FileOutcome {
        let Some(category) = category_map.get(&file.filename) else {
            tracing::info!(file = %file.filename, "no category for upload, skipping");
            return FileOutcome::Skipped {
                file: file.filename,
                reason: SkipReason::NoCategory,
            };
        };
        let segments: Vec<&str> = category.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            tracing::info!(file = %file.filename, "empty category for upload, skipping");
            return FileOutcome::Skipped {
                file: file.filename,
                reason: SkipReason::NoCategory,
            };
        }
        if segments.iter().any(|s| *s == "..") {
            return FileOutcome::Failed {
                error: format!("invalid category: {}", category),
                file: file.filename,
            };
        }
        tracing::info!(position, total, file = %file.filename, category = %category, "processing upload");

        let mut target_dir = self.content_root.clone();
        let mut created_category = None;
        for (depth, segment) in segments.iter().enumerate() {
            target_dir.push(segment);
            if self.store.is_dir(&target_dir) {
                continue;
            }
            tracing::info!(path = %target_dir.display(), "creating category directory");
            if let Err(e) = self.store.mkdir_all(&target_dir) {
                tracing::warn!(file = %file.filename, error = %e, "failed to create category directory");
                return FileOutcome::Failed {
                    file: file.filename,
                    error: e.to_string(),
                };
            }
            if depth == 0 {
                created_category = Some(segment.to_string());
            }
        }

        let filename = upload_basename(&file.filename);
        let target = target_dir.join(filename);
        if let Err(e) = self.store.write_file(&target, &file.bytes) {
            tracing::warn!(file = %file.filename, error = %e, "failed to save upload");
            return FileOutcome::Failed {
                file: file.filename,
                error: e.to_string(),
            };
        }
        tracing::debug!(target = %target.display(), "saved upload");

        let id = article_id(&segments.join("/"), filename);
        let summary_generated = self.summarize_upload(&id, &file.bytes).await;

        FileOutcome::Placed {
            created_category,
            summary_generated,
        }
    }

    /// Summarize and store; any failure only means no summary for this file.
    async fn summarize_upload(&self, id: &str, bytes: &[u8]) -> bool {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(article_id = id, error = %e, "upload is not valid UTF-8, no summary");
                return false;
            }
        };
        let summary = match self.summarizer.summarize(text).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(article_id = id, error = %e, "summary generation failed");
                return false;
            }
        };
        match self.side_data.save_summary(id, &summary) {
            Ok(()) => {
                tracing::info!(article_id = id, "generated and saved summary");
                true
            }
            Err(e) => {
                tracing::warn!(article_id = id, error = %e, "failed to save summary");
                false
            }
        }
    }
}

/// Last path segment of an uploaded filename (clients may send `dir/a.md`).
fn upload_basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(filename)
}

/// Category used for files sitting directly in the import source.
fn source_category_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .or_else(|| {
            std::fs::canonicalize(source)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        })
        .unwrap_or_else(|| "imported".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_store::MemoryContentStore;
    use crate::summarize::ExcerptSummarizer;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ROOT: &str = "/content";

    struct Failing;

    #[async_trait]
    impl Summarizer for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn summarize(&self, _markdown: &str) -> anyhow::Result<String> {
            bail!("endpoint unreachable")
        }
    }

    /// Sleeps for a fixed delay and records the peak number of overlapping calls.
    struct Slow {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        async fn summarize(&self, _markdown: &str) -> anyhow::Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("slow summary".to_string())
        }
    }

    fn engine_with(
        store: Arc<MemoryContentStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> (ImportEngine, Arc<SideDataStore>) {
        let side = Arc::new(SideDataStore::new(
            store.clone(),
            "/data/comments.json",
            "/data/summaries.json",
        ));
        side.ensure_files().unwrap();
        let engine = ImportEngine::new(store, ROOT, side.clone(), summarizer);
        (engine, side)
    }

    fn uploads(n: usize) -> Vec<UploadedFile> {
        (1..=n)
            .map(|i| UploadedFile::new(format!("doc{}.md", i), format!("# Doc {}\nBody {}", i, i)))
            .collect()
    }

    // ---- directory import ----

    #[test]
    fn test_reimport_from_inside_content_root_keeps_articles() {
        use crate::content_store::DiskContentStore;

        let tmp = tempfile::TempDir::new().unwrap();
        let content = tmp.path().join("content");
        std::fs::create_dir_all(content.join("Tech")).unwrap();
        std::fs::write(content.join("Tech/a.md"), "# A\nbody").unwrap();

        let store: Arc<dyn ContentStore> = Arc::new(DiskContentStore);
        let side = Arc::new(SideDataStore::new(
            store.clone(),
            tmp.path().join("data/comments.json"),
            tmp.path().join("data/summaries.json"),
        ));
        side.ensure_files().unwrap();
        let engine = ImportEngine::new(store, &content, side, Arc::new(ExcerptSummarizer));

        let result = engine.import_from_directory(&content.join("Tech"));
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 0);
        assert_eq!(stats.errors, 1);
        assert_eq!(
            std::fs::read_to_string(content.join("Tech/a.md")).unwrap(),
            "# A\nbody"
        );

        // Importing the whole root hits the same file for every article.
        let result = engine.import_from_directory(&content);
        assert_eq!(result.stats().unwrap().errors, 1);
        assert_eq!(
            std::fs::read_to_string(content.join("Tech/a.md")).unwrap(),
            "# A\nbody"
        );
    }

    #[test]
    fn test_directory_import_counts_top_level_categories() {
        let store = Arc::new(MemoryContentStore::new());
        store.add_file("/src/Tech/a.md", "# A");
        store.add_file("/src/Tech/AI/b.md", "# B");
        store.add_file("/src/Life/c.md", "# C");
        store.add_file("/src/Life/notes.txt", "ignored");
        let (engine, _) = engine_with(store.clone(), Arc::new(ExcerptSummarizer));

        let result = engine.import_from_directory(Path::new("/src"));
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 3);
        assert_eq!(stats.categories, 2);
        assert_eq!(stats.errors, 0);
        assert!(stats.categories_created.contains(&"Tech".to_string()));
        assert!(stats.categories_created.contains(&"Life".to_string()));

        assert!(store.is_file(Path::new("/content/Tech/AI/b.md")));
        assert!(!store.exists(Path::new("/content/Life/notes.txt")));
    }

    #[test]
    fn test_directory_import_root_files_use_source_name() {
        let store = Arc::new(MemoryContentStore::new());
        store.add_file("/incoming/Notes/flat.md", "# Flat");
        let (engine, _) = engine_with(store.clone(), Arc::new(ExcerptSummarizer));

        let result = engine.import_from_directory(Path::new("/incoming/Notes"));
        assert!(result.is_success());
        assert_eq!(result.stats().unwrap().categories_created, vec!["Notes"]);
        assert!(store.is_file(Path::new("/content/Notes/flat.md")));
    }

    #[test]
    fn test_directory_import_without_markdown_fails() {
        let store = Arc::new(MemoryContentStore::new());
        store.add_file("/src/readme.txt", "x");
        store.add_dir("/src/empty");
        let (engine, _) = engine_with(store, Arc::new(ExcerptSummarizer));

        let result = engine.import_from_directory(Path::new("/src"));
        assert!(!result.is_success());
        assert!(result.message().unwrap().contains("no markdown files"));
    }

    #[test]
    fn test_directory_import_missing_source_fails() {
        let store = Arc::new(MemoryContentStore::new());
        let (engine, _) = engine_with(store, Arc::new(ExcerptSummarizer));
        let result = engine.import_from_directory(Path::new("/nowhere"));
        assert!(result.message().unwrap().contains("not found"));
    }

    #[test]
    fn test_directory_import_overwrites_and_tolerates_failures() {
        let store = Arc::new(MemoryContentStore::new());
        store.add_file("/content/Tech/a.md", "old");
        store.add_file("/src/Tech/a.md", "new");
        store.add_file("/src/Locked/b.md", "b");
        store.add_dir("/content/Locked");
        store.deny_writes_under("/content/Locked");
        let (engine, _) = engine_with(store.clone(), Arc::new(ExcerptSummarizer));

        let result = engine.import_from_directory(Path::new("/src"));
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.categories, 0);
        assert_eq!(
            store.read_file(Path::new("/content/Tech/a.md")).unwrap(),
            b"new"
        );
    }

    // ---- upload import ----

    #[tokio::test]
    async fn test_upload_skips_file_without_category() {
        let store = Arc::new(MemoryContentStore::new());
        let (engine, side) = engine_with(store.clone(), Arc::new(ExcerptSummarizer));
        let files = uploads(5);
        let map: HashMap<String, String> = files
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(i, f)| {
                let category = if i < 2 { "Tech/AI" } else { "Life" };
                (f.filename.clone(), category.to_string())
            })
            .collect();

        let result = engine.import_from_uploads(files, &map).await;
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 4);
        assert_eq!(stats.errors, 0);
        assert_eq!(stats.summaries_generated, 4);
        assert_eq!(stats.categories, 2);
        assert!(!store.exists(Path::new("/content/Tech/AI/doc3.md")));
        assert!(!store.exists(Path::new("/content/Life/doc3.md")));
        assert!(store.is_file(Path::new("/content/Tech/AI/doc1.md")));
        assert!(side.summaries().unwrap().contains_key("Tech/AI/doc1.md"));
    }

    #[tokio::test]
    async fn test_upload_summarizer_failure_still_places_files() {
        let store = Arc::new(MemoryContentStore::new());
        let (engine, side) = engine_with(store.clone(), Arc::new(Failing));
        let files = uploads(5);
        let map: HashMap<String, String> = files
            .iter()
            .map(|f| (f.filename.clone(), "Tech".to_string()))
            .collect();

        let result = engine.import_from_uploads(files, &map).await;
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 5);
        assert_eq!(stats.summaries_generated, 0);
        assert!(side.summaries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_counts_write_failures() {
        let store = Arc::new(MemoryContentStore::new());
        store.add_dir("/content/Locked");
        store.deny_writes_under("/content/Locked");
        let (engine, _) = engine_with(store, Arc::new(ExcerptSummarizer));
        let files = uploads(3);
        let mut map = HashMap::new();
        map.insert("doc1.md".to_string(), "Open".to_string());
        map.insert("doc2.md".to_string(), "Locked".to_string());
        map.insert("doc3.md".to_string(), "Locked/Sub".to_string());

        let result = engine.import_from_uploads(files, &map).await;
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 1);
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.categories_created, vec!["Open"]);
    }

    #[tokio::test]
    async fn test_upload_nothing_placed_is_failure() {
        let store = Arc::new(MemoryContentStore::new());
        let (engine, _) = engine_with(store, Arc::new(ExcerptSummarizer));
        let result = engine.import_from_uploads(uploads(3), &HashMap::new()).await;
        assert!(!result.is_success());
        assert!(result.message().is_some());
    }

    #[tokio::test]
    async fn test_upload_uses_basename_and_dedups_categories() {
        let store = Arc::new(MemoryContentStore::new());
        let (engine, _) = engine_with(store.clone(), Arc::new(ExcerptSummarizer));
        let engine = engine.with_limits(2, 2);
        let files = vec![
            UploadedFile::new("folder/x.md", "# X"),
            UploadedFile::new("folder/y.md", "# Y"),
            UploadedFile::new("z.md", "# Z"),
        ];
        let mut map = HashMap::new();
        map.insert("folder/x.md".to_string(), "Tech/AI".to_string());
        map.insert("folder/y.md".to_string(), "Tech/Web".to_string());
        map.insert("z.md".to_string(), "Tech".to_string());

        let result = engine.import_from_uploads(files, &map).await;
        let stats = result.stats().unwrap();
        assert_eq!(stats.articles, 3);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.categories_created, vec!["Tech"]);
        assert!(store.is_file(Path::new("/content/Tech/AI/x.md")));
        assert!(store.is_file(Path::new("/content/Tech/z.md")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_concurrency_bound() {
        let delay = Duration::from_millis(100);
        let slow = Arc::new(Slow {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryContentStore::new());
        let (engine, _) = engine_with(store, slow.clone());
        let engine = engine.with_limits(10, 2);
        let files = uploads(10);
        let map: HashMap<String, String> = files
            .iter()
            .map(|f| (f.filename.clone(), "Tech".to_string()))
            .collect();

        let started = Instant::now();
        let result = engine.import_from_uploads(files, &map).await;
        let elapsed = started.elapsed();

        assert_eq!(result.stats().unwrap().articles, 10);
        assert_eq!(slow.peak.load(Ordering::SeqCst), 2);
        assert!(elapsed >= delay * 5, "finished too fast: {:?}", elapsed);
        assert!(elapsed < delay * 6, "finished too slow: {:?}", elapsed);
    }

    #[test]
    fn test_fold_outcomes() {
        let outcomes = vec![
            FileOutcome::Placed {
                created_category: Some("Tech".into()),
                summary_generated: true,
            },
            FileOutcome::Placed {
                created_category: Some("Tech".into()),
                summary_generated: false,
            },
            FileOutcome::Skipped {
                file: "a.md".into(),
                reason: SkipReason::NoCategory,
            },
            FileOutcome::Failed {
                file: "b.md".into(),
                error: "denied".into(),
            },
        ];
        let stats = fold_outcomes(&outcomes);
        assert_eq!(stats.articles, 2);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.summaries_generated, 1);
    }

    #[test]
    fn test_upload_basename() {
        assert_eq!(upload_basename("a/b/c.md"), "c.md");
        assert_eq!(upload_basename("win\\dir\\d.md"), "d.md");
        assert_eq!(upload_basename("plain.md"), "plain.md");
    }
}
