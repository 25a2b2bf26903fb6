use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub content: ContentConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_comments_file")]
    pub comments_file: PathBuf,
    #[serde(default = "default_summaries_file")]
    pub summaries_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            comments_file: default_comments_file(),
            summaries_file: default_summaries_file(),
        }
    }
}

fn default_comments_file() -> PathBuf {
    PathBuf::from("./data/comments.json")
}
fn default_summaries_file() -> PathBuf {
    PathBuf::from("./data/summaries.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_batch_size() -> usize {
    crate::import::BATCH_SIZE
}
fn default_max_concurrent() -> usize {
    crate::import::MAX_CONCURRENT
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub providers: Vec<SummaryProviderConfig>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            providers: Vec::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// One OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct SummaryProviderConfig {
    pub name: String,
    pub url: String,
    pub model: String,
    /// Environment variable holding the bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Request a server-sent-events response and assemble the deltas.
    #[serde(default)]
    pub stream: bool,
    /// Overrides `[summarizer].timeout_secs` for this provider.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SummaryProviderConfig {
    /// Request timeout for this provider, falling back to the section default.
    pub fn timeout_secs_or(&self, default_secs: u64) -> u64 {
        self.timeout_secs.unwrap_or(default_secs)
    }
}

impl Config {
    /// A config with defaults everywhere except the content root.
    pub fn minimal(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content: ContentConfig {
                root: content_root.into(),
            },
            data: DataConfig::default(),
            server: ServerConfig::default(),
            import: ImportConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }

    /// Apply `CONTENT_DIR`, `COMMENTS_FILE` and `SUMMARIES_FILE` from the
    /// environment over the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CONTENT_DIR").filter(|v| !v.is_empty()) {
            self.content.root = PathBuf::from(v);
        }
        if let Some(v) = lookup("COMMENTS_FILE").filter(|v| !v.is_empty()) {
            self.data.comments_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("SUMMARIES_FILE").filter(|v| !v.is_empty()) {
            self.data.summaries_file = PathBuf::from(v);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.import.batch_size == 0 {
            bail!("import.batch_size must be > 0");
        }
        if self.import.max_concurrent == 0 {
            bail!("import.max_concurrent must be > 0");
        }
        if self.summarizer.timeout_secs == 0 {
            bail!("summarizer.timeout_secs must be > 0");
        }
        for provider in &self.summarizer.providers {
            if provider.url.trim().is_empty() {
                bail!("summarizer provider '{}' has an empty url", provider.name);
            }
            if provider.model.trim().is_empty() {
                bail!("summarizer provider '{}' has an empty model", provider.name);
            }
            if provider.timeout_secs == Some(0) {
                bail!("summarizer provider '{}' timeout_secs must be > 0", provider.name);
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.apply_env_overrides();
    config.validate()?;

    Ok(config)
}
