mod config;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use concordancia_lib::{
    apply_filters, books, Book, BookFilter, CacheStats, Catalog, Dataset, Engine, EngineError, Entry,
    FilterSpec, SearchHit, TestamentFilter,
};
use config::{ApiConfig, CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

struct AppState {
    concordance: Engine,
    dictionary: Engine,
}

impl AppState {
    fn engine(&self, dataset: Dataset) -> &Engine {
        match dataset {
            Dataset::Concordance => &self.concordance,
            Dataset::Dictionary => &self.dictionary,
        }
    }
}

// === Request/Response types ===

#[derive(Deserialize)]
struct BooksQuery {
    testament: Option<String>,
}

#[derive(Deserialize)]
struct LetterQuery {
    page: Option<usize>,
    page_size: Option<usize>,
    testament: Option<String>,
    book: Option<String>,
    word: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
    testament: Option<String>,
    book: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    concordance: CacheStats,
    dictionary: CacheStats,
}

#[derive(Serialize)]
struct LetterResponse {
    letter: String,
    page: usize,
    page_size: usize,
    has_more: bool,
    total_count: usize,
    fallback: bool,
    visible: usize,
    entries: Vec<Entry>,
}

#[derive(Serialize)]
struct SearchResponse {
    term: String,
    total: usize,
    shards_failed: usize,
    visible: usize,
    hits: Vec<SearchHit>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: EngineError) -> ApiError {
    let status = match e {
        EngineError::InvalidQuery(_) | EngineError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
        EngineError::SearchInProgress => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn parse_filters(testament: Option<&str>, book: Option<&str>, word: Option<&str>) -> Result<FilterSpec, ApiError> {
    let testament: TestamentFilter = testament.unwrap_or("all").parse().map_err(api_error)?;
    let book: BookFilter = book.unwrap_or("all").parse().map_err(api_error)?;
    Ok(FilterSpec {
        testament,
        book,
        word: word.unwrap_or_default().to_string(),
        word_enabled: true,
    })
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        concordance: state.concordance.stats(),
        dictionary: state.dictionary.stats(),
    })
}

async fn list_books(Query(params): Query<BooksQuery>) -> Result<Json<Vec<&'static Book>>, ApiError> {
    let testament: TestamentFilter = params
        .testament
        .as_deref()
        .unwrap_or("all")
        .parse()
        .map_err(api_error)?;
    let testament = match testament {
        TestamentFilter::All => None,
        TestamentFilter::Only(t) => Some(t),
    };

    Ok(Json(books(testament)))
}

async fn get_catalog(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<Dataset>,
) -> Json<Catalog> {
    let catalog = state.engine(dataset).catalog().await;
    Json(Catalog::clone(&catalog))
}

async fn get_letter(
    State(state): State<Arc<AppState>>,
    Path((dataset, letter)): Path<(Dataset, String)>,
    Query(params): Query<LetterQuery>,
) -> Result<Json<LetterResponse>, ApiError> {
    let filters = parse_filters(params.testament.as_deref(), params.book.as_deref(), params.word.as_deref())?;
    let engine = state.engine(dataset);
    let page_size = params.page_size.unwrap_or(engine.config().page_size);
    let page = engine
        .page_sized(&letter, params.page.unwrap_or(0), page_size)
        .await;

    let entries = apply_filters(&page.entries, &filters);
    Ok(Json(LetterResponse {
        letter: page.letter.clone(),
        page: page.page,
        page_size: page.page_size,
        has_more: page.has_more,
        total_count: page.total_count,
        fallback: page.fallback,
        visible: entries.len(),
        entries,
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<Dataset>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let filters = parse_filters(params.testament.as_deref(), params.book.as_deref(), None)?;
    let results = state
        .engine(dataset)
        .search(&params.q)
        .await
        .map_err(api_error)?;

    // hits keep their match metadata; only the entry is narrowed
    let hits: Vec<SearchHit> = results
        .hits
        .into_iter()
        .filter_map(|hit| {
            let entry = apply_filters(std::slice::from_ref(&hit.entry), &filters).pop()?;
            Some(SearchHit { entry, ..hit })
        })
        .collect();

    Ok(Json(SearchResponse {
        term: results.term,
        total: results.total,
        shards_failed: results.shards_failed,
        visible: hits.len(),
        hits,
    }))
}

async fn cache_stats(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<Dataset>,
) -> Json<CacheStats> {
    Json(state.engine(dataset).stats())
}

async fn clear_cache(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<Dataset>,
) -> Json<CacheStats> {
    let engine = state.engine(dataset);
    engine.clear_cache();
    Json(engine.stats())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ApiConfig::load(std::path::Path::new(CONFIG_FILE))?;
    let fetcher = config.fetcher()?;

    let state = Arc::new(AppState {
        concordance: Engine::new(fetcher.clone(), Dataset::Concordance, config.engine.clone()),
        dictionary: Engine::new(fetcher, Dataset::Dictionary, config.engine.clone()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/books", get(list_books))
        .route("/:dataset/catalog", get(get_catalog))
        .route("/:dataset/letters/:letter", get(get_letter))
        .route("/:dataset/search", get(search))
        .route("/:dataset/cache/stats", get(cache_stats))
        .route("/:dataset/cache/clear", post(clear_cache))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind.as_str()).await?;
    tracing::info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
