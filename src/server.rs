//! JSON HTTP API over the repository and import engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/healthz` | Health check (returns version) |
//! | `GET`  | `/api/categories` | All categories, flat, parents first |
//! | `GET`  | `/api/categories/{category_id}/articles` | Articles at any depth below a category |
//! | `GET`  | `/api/articles/{category_id}/{filename}` | One article with content |
//! | `GET`  | `/api/articles/{category_id}/{filename}/comments` | Comments, oldest first |
//! | `POST` | `/api/articles/{category_id}/{filename}/comments` | Add a comment `{author, content}` |
//! | `POST` | `/api/articles/{category_id}/{filename}/summarize` | Generate and store a summary |
//! | `POST` | `/api/import-directory` | Import from a local directory `{directory_path}` |
//! | `POST` | `/api/import-files` | Multipart upload: `files` parts plus a `categories` JSON field |
//!
//! Category ids contain `/`, so article routes capture the whole remainder
//! and split it with [`route_article_id`].
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "article not found: Tech/a.md" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::CmsError;
use crate::import::ImportEngine;
use crate::models::{ArticleSummary, Category, Comment, ImportResult, UploadedFile};
use crate::paths::route_article_id;
use crate::repository::Repository;
use crate::summarize::{build_summarizer, Summarizer};

/// Upload requests may carry many files; the axum default of 2 MiB is too small.
const UPLOAD_BODY_LIMIT: usize = 256 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub importer: ImportEngine,
    pub summarizer: Arc<dyn Summarizer>,
}

impl AppState {
    /// Open the repository and build the summarizer chain from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let repo = Arc::new(Repository::open(config)?);
        let summarizer: Arc<dyn Summarizer> = Arc::new(build_summarizer(&config.summarizer)?);
        let importer = repo.import_engine(summarizer.clone(), &config.import);
        Ok(Self {
            repo,
            importer,
            summarizer,
        })
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with permissive CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(handle_health))
        .route("/api/categories", get(handle_categories))
        .route("/api/categories/{*rest}", get(handle_category_articles))
        .route(
            "/api/articles/{*rest}",
            get(handle_article_get).post(handle_article_post),
        )
        .route("/api/import-directory", post(handle_import_directory))
        .route(
            "/api/import-files",
            post(handle_import_files).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<CmsError> for AppError {
    fn from(err: CmsError) -> Self {
        match err {
            CmsError::NotFound { .. } => not_found(err.to_string()),
            CmsError::NoContentFound { .. } | CmsError::InvalidArticleId(_) => {
                bad_request(err.to_string())
            }
            other => {
                tracing::error!(error = %other, "request failed");
                internal(other.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<CmsError>() {
            Ok(cms) => cms.into(),
            Err(other) => {
                tracing::error!(error = %other, "request failed");
                internal(other.to_string())
            }
        }
    }
}

fn import_response(result: ImportResult, ok_status: StatusCode) -> Result<Response, AppError> {
    match result.message() {
        Some(message) => Err(bad_request(message)),
        None => Ok((ok_status, Json(result)).into_response()),
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.get_categories()?))
}

/// `GET /api/categories/{category_id}/articles`
async fn handle_category_articles(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Json<Vec<ArticleSummary>>, AppError> {
    let category_id = rest
        .trim_matches('/')
        .strip_suffix("/articles")
        .ok_or_else(|| not_found(format!("no route for /api/categories/{}", rest)))?;
    Ok(Json(state.repo.get_articles_by_category(category_id)?))
}

/// `GET` on an article path: the article itself, or its comments.
async fn handle_article_get(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> Result<Response, AppError> {
    let rest = rest.trim_matches('/');
    if let Some(article_path) = rest.strip_suffix("/comments") {
        let article_id = route_article_id(article_path)?;
        let comments: Vec<Comment> = state.repo.get_comments(&article_id)?;
        return Ok(Json(comments).into_response());
    }
    let article_id = route_article_id(rest)?;
    Ok(Json(state.repo.get_article(&article_id)?).into_response())
}

#[derive(Debug, Deserialize)]
struct CommentCreate {
    author: String,
    content: String,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// `POST` on an article path: `/comments` or `/summarize`.
async fn handle_article_post(
    State(state): State<AppState>,
    Path(rest): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let rest = rest.trim_matches('/');

    if let Some(article_path) = rest.strip_suffix("/comments") {
        let article_id = route_article_id(article_path)?;
        let request: CommentCreate = serde_json::from_slice(&body)
            .map_err(|e| bad_request(format!("invalid comment body: {}", e)))?;
        let comment = state
            .repo
            .add_comment(&article_id, &request.author, &request.content)?;
        return Ok(Json(comment).into_response());
    }

    if let Some(article_path) = rest.strip_suffix("/summarize") {
        let article_id = route_article_id(article_path)?;
        let summary = state
            .repo
            .summarize_article(&article_id, state.summarizer.as_ref())
            .await?;
        return Ok(Json(SummaryResponse { summary }).into_response());
    }

    Err(not_found(format!("no route for POST /api/articles/{}", rest)))
}

#[derive(Debug, Deserialize)]
struct DirectoryImport {
    directory_path: PathBuf,
}

async fn handle_import_directory(
    State(state): State<AppState>,
    Json(request): Json<DirectoryImport>,
) -> Result<Response, AppError> {
    let importer = state.importer.clone();
    let result = tokio::task::spawn_blocking(move || {
        importer.import_from_directory(&request.directory_path)
    })
    .await
    .map_err(|e| internal(format!("import task failed: {}", e)))?;
    import_response(result, StatusCode::CREATED)
}

async fn handle_import_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut files = Vec::new();
    let mut categories: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        match field.name() {
            Some("categories") => {
                let text = field.text().await.map_err(|e| bad_request(e.to_string()))?;
                categories = serde_json::from_str(&text)
                    .map_err(|e| bad_request(format!("invalid categories field: {}", e)))?;
            }
            Some("files") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| bad_request("file part without a filename"))?;
                let bytes = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                files.push(UploadedFile::new(filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(bad_request("no files in upload"));
    }

    let result = state.importer.import_from_uploads(files, &categories).await;
    import_response(result, StatusCode::OK)
}
