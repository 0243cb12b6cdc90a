//! The HTTP surface behind `freectl serve`.
//!
//! A thin JSON adapter over the core: every handler loads settings fresh,
//! calls one core operation, and translates error categories into HTTP
//! status codes. Validation failures are 400, missing entities 404,
//! everything else 500; method mismatches are axum's built-in 405.

use anyhow::Result;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use freectl_core::manager;
use freectl_core::search::{self, SearchQuery};
use freectl_core::stats;
use freectl_core::{Favorite, FavoritesStore, SearchResult, Settings, Source, SourceType};

/// Bind and serve the JSON API on localhost.
pub async fn serve(port: u16) -> Result<()> {
    let app = router();
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "listening on http://127.0.0.1:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router() -> Router {
    Router::new()
        .route("/search", get(search_handler))
        .route("/favorites", get(favorites_list))
        .route("/favorites/add", post(favorites_add))
        .route("/favorites/remove", post(favorites_remove))
        .route("/stats", get(stats_handler))
        .route("/update", post(update_handler))
        .route("/settings", get(settings_get).post(settings_post))
        .route("/sources/add", post(sources_add))
        .route("/sources/list", get(sources_list))
        .route("/sources/delete", post(sources_delete))
        .route("/sources/toggle", post(sources_toggle))
}

/// Error shape returned by every handler: `{success: false, error: …}`.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "success": false, "error": self.1 }));
        (self.0, body).into_response()
    }
}

impl From<freectl_core::Error> for ApiError {
    fn from(err: freectl_core::Error) -> Self {
        let status = match err.category() {
            "validation" | "invalid_url" | "conflict" => StatusCode::BAD_REQUEST,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    source: Option<String>,
    category: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
    #[serde(default)]
    preprocessed: bool,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
    total_results: usize,
    total_pages: usize,
    current_page: usize,
    per_page: usize,
}

async fn search_handler(Query(params): Query<SearchParams>) -> ApiResult<Json<SearchResponse>> {
    let settings = Settings::load()?;
    search::validate_query(&params.q, &settings)?;

    let request = SearchQuery {
        query: params.q,
        source: params.source,
        category: params.category,
        limit: None,
    };
    let results = if params.preprocessed {
        search::search_processed(&settings, &request)?
    } else {
        search::search_online(&settings, &request)?
    };

    let per_page = params.per_page.unwrap_or(settings.results_per_page);
    let page = search::paginate(&results, params.page.unwrap_or(1), per_page);
    Ok(Json(SearchResponse {
        results: page.items,
        total_results: page.total_results,
        total_pages: page.total_pages,
        current_page: page.current_page,
        per_page: page.per_page,
    }))
}

async fn favorites_list() -> ApiResult<Json<Vec<Favorite>>> {
    Ok(Json(FavoritesStore::new()?.list()?))
}

async fn favorites_add(Json(favorite): Json<Favorite>) -> ApiResult<Json<serde_json::Value>> {
    FavoritesStore::new()?.add(favorite)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct RemoveFavoriteRequest {
    link: String,
}

async fn favorites_remove(
    Json(request): Json<RemoveFavoriteRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    FavoritesStore::new()?.remove(&request.link)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct StatsParams {
    source: Option<String>,
}

async fn stats_handler(Query(params): Query<StatsParams>) -> ApiResult<Json<serde_json::Value>> {
    let settings = Settings::load()?;
    let all = match params.source.as_deref() {
        Some(name) => vec![stats::source_stats(&settings, name)?],
        None => stats::all_stats(&settings)?,
    };
    Ok(Json(serde_json::to_value(all)?))
}

async fn update_handler() -> ApiResult<Json<serde_json::Value>> {
    let summary = manager::update_sources(None).await?;
    Ok(Json(serde_json::json!({
        "success": summary.failed == 0,
        "updated": summary.updated,
        "failed": summary.failed,
        "duration_ms": summary.duration_ms,
    })))
}

async fn settings_get() -> ApiResult<Json<Settings>> {
    Ok(Json(Settings::load()?))
}

async fn settings_post(Json(settings): Json<Settings>) -> ApiResult<Json<serde_json::Value>> {
    settings.save()?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct AddSourceRequest {
    url: String,
    name: String,
    #[serde(rename = "type")]
    source_type: SourceType,
}

async fn sources_add(Json(request): Json<AddSourceRequest>) -> ApiResult<Json<Source>> {
    let source = manager::add_source(&request.url, &request.name, request.source_type).await?;
    Ok(Json(source))
}

async fn sources_list() -> ApiResult<Json<Vec<Source>>> {
    Ok(Json(manager::list_sources()?))
}

#[derive(Deserialize)]
struct DeleteSourceRequest {
    name: String,
    #[serde(default)]
    force: bool,
}

async fn sources_delete(
    Json(request): Json<DeleteSourceRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    manager::delete_source(&request.name, request.force)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct ToggleSourceRequest {
    name: String,
}

async fn sources_toggle(
    Json(request): Json<ToggleSourceRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let enabled = manager::toggle_source(&request.name)?;
    Ok(Json(serde_json::json!({ "success": true, "enabled": enabled })))
}
