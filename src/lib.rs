//! # Markdown CMS
//!
//! A file-backed content backend for a markdown blog.
//!
//! Articles are plain `.md` files under a content root; every directory that
//! holds markdown (directly or through a subdirectory) is a category, and
//! nested directories form `/`-joined category ids such as `Tech/AI`.
//! Comments and summaries live beside the content in two JSON side-data files
//! keyed by article id (`{category_id}/{filename}`).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ ImportEngine │──▶│ ContentStore │◀──│ CategoryIndexer  │
//! │ dir / upload │   │ disk / memory│   │ PathResolver     │
//! └──────┬───────┘   └──────┬───────┘   └────────┬─────────┘
//!        │                  │                    │
//!        ▼                  ▼                    ▼
//!  ┌────────────┐    ┌──────────────┐     ┌────────────┐
//!  │ Summarizer │──▶ │ SideDataStore│ ◀── │ Repository │──▶ CLI / HTTP
//!  └────────────┘    └──────────────┘     └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mdcms import ./notes             # copy a directory tree into the content root
//! mdcms categories                 # list categories
//! mdcms articles Tech              # articles under Tech and its subcategories
//! mdcms serve                      # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and env overrides |
//! | [`content_store`] | Filesystem abstraction (disk and in-memory) |
//! | [`error`] | Domain error type |
//! | [`import`] | Directory and upload import |
//! | [`indexer`] | Category discovery and article listing |
//! | [`models`] | Core data types |
//! | [`paths`] | Article id parsing and path resolution |
//! | [`repository`] | Read/write surface over content and side-data |
//! | [`server`] | JSON HTTP API |
//! | [`side_data`] | Comments and summaries files |
//! | [`summarize`] | Summary providers and fallback chain |

pub mod config;
pub mod content_store;
pub mod error;
pub mod import;
pub mod indexer;
pub mod models;
pub mod paths;
pub mod repository;
pub mod server;
pub mod side_data;
pub mod summarize;
