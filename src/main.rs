//! # Markdown CMS CLI (`mdcms`)
//!
//! Browses, annotates and imports the content tree, or serves it over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! mdcms --config ./config/mdcms.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdcms serve` | Start the HTTP API |
//! | `mdcms categories` | List every category |
//! | `mdcms articles <category_id>` | List articles under a category |
//! | `mdcms get <article_id>` | Print one article with its content |
//! | `mdcms comments <article_id>` | List an article's comments |
//! | `mdcms comment <article_id> --author <a> --content <c>` | Add a comment |
//! | `mdcms summarize <article_id>` | Generate and store a summary |
//! | `mdcms import <dir>` | Import a local directory tree |
//! | `mdcms upload <category> <files...>` | Import files into one category |
//!
//! Results are printed as JSON on stdout; logs go to stderr and are
//! filtered with `RUST_LOG`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use markdown_cms::config::{self, Config};
use markdown_cms::models::{ImportResult, UploadedFile};
use markdown_cms::repository::Repository;
use markdown_cms::server;
use markdown_cms::summarize::{build_summarizer, Summarizer};

/// Markdown CMS: a file-backed content backend for a markdown blog.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. `CONTENT_DIR`, `COMMENTS_FILE` and `SUMMARIES_FILE` override the
/// matching config values.
#[derive(Parser)]
#[command(name = "mdcms", version, about = "File-backed markdown content backend")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mdcms.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// List all categories, parents before children.
    Categories,

    /// List articles at any depth below a category.
    Articles {
        /// Category id, e.g. `Tech/AI`.
        category_id: String,
    },

    /// Print one article with content, summary and comment count.
    Get {
        /// Article id, e.g. `Tech/AI/intro.md`.
        article_id: String,
    },

    /// List an article's comments, oldest first.
    Comments { article_id: String },

    /// Add a comment to an article.
    Comment {
        article_id: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        content: String,
    },

    /// Summarize an article with the configured providers and store the result.
    Summarize { article_id: String },

    /// Import every markdown file under a local directory.
    ///
    /// Subdirectories become categories; files directly in the directory go
    /// into a category named after it. Existing files are overwritten.
    Import {
        /// Source directory.
        dir: PathBuf,
    },

    /// Import local files into one category, generating summaries.
    Upload {
        /// Target category id.
        category: String,
        /// Markdown files to upload.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summarizer_for(cfg: &Config) -> Result<Arc<dyn Summarizer>> {
    Ok(Arc::new(build_summarizer(&cfg.summarizer)?))
}

fn finish_import(result: ImportResult) -> Result<()> {
    print_json(&result)?;
    if let Some(message) = result.message() {
        bail!("import failed: {}", message);
    }
    Ok(())
}

fn read_uploads(category: &str, paths: &[PathBuf]) -> Result<(Vec<UploadedFile>, HashMap<String, String>)> {
    let mut files = Vec::with_capacity(paths.len());
    let mut categories = HashMap::new();
    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("not a file path: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        categories.insert(filename.clone(), category.to_string());
        files.push(UploadedFile::new(filename, bytes));
    }
    Ok((files, categories))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Serve = cli.command {
        return server::run_server(&cfg).await;
    }

    let repo = Repository::open(&cfg)?;

    match cli.command {
        Commands::Serve => unreachable!(),
        Commands::Categories => print_json(&repo.get_categories()?)?,
        Commands::Articles { category_id } => {
            print_json(&repo.get_articles_by_category(&category_id)?)?
        }
        Commands::Get { article_id } => print_json(&repo.get_article(&article_id)?)?,
        Commands::Comments { article_id } => print_json(&repo.get_comments(&article_id)?)?,
        Commands::Comment {
            article_id,
            author,
            content,
        } => print_json(&repo.add_comment(&article_id, &author, &content)?)?,
        Commands::Summarize { article_id } => {
            let summarizer = summarizer_for(&cfg)?;
            let summary = repo
                .summarize_article(&article_id, summarizer.as_ref())
                .await?;
            print_json(&serde_json::json!({ "summary": summary }))?;
        }
        Commands::Import { dir } => {
            let importer = repo.import_engine(summarizer_for(&cfg)?, &cfg.import);
            let result = tokio::task::spawn_blocking(move || importer.import_from_directory(&dir))
                .await?;
            finish_import(result)?;
        }
        Commands::Upload { category, files } => {
            let (files, categories) = read_uploads(&category, &files)?;
            let importer = repo.import_engine(summarizer_for(&cfg)?, &cfg.import);
            finish_import(importer.import_from_uploads(files, &categories).await)?;
        }
    }

    Ok(())
}
