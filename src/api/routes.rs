use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_logging,
    movies::{MovieClient, MovieError, MoviePage},
    price_gap::{find_price_gap_pair, Gap},
    w2::{W2Analyzer, W2Report},
};

const MAX_W2_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub movies: Arc<MovieClient>,
    pub w2: Arc<W2Analyzer>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/price-gap-pair", post(price_gap_pair))
        .route("/api/movies", get(search_movies))
        .route(
            "/api/w2",
            post(analyze_w2).layer(DefaultBodyLimit::max(MAX_W2_UPLOAD_BYTES)),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging))
                .layer(CorsLayer::permissive()),
        )
}

// ===== Route Handlers =====

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn price_gap_pair(
    Json(req): Json<PriceGapRequest>,
) -> Result<Json<PriceGapResponse>, ApiError> {
    let gap = Gap::new(req.k).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let response = match find_price_gap_pair(&req.nums, gap) {
        Some(pair) => PriceGapResponse {
            indices: Some(pair.as_array()),
            values: pair.values(&req.nums),
        },
        None => PriceGapResponse {
            indices: None,
            values: None,
        },
    };
    Ok(Json(response))
}

async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<MovieQuery>,
) -> Result<Json<MoviePage>, ApiError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::BadRequest("page must be >= 1".to_string()));
    }

    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Ok(Json(MoviePage::empty(page)));
    }

    let movies = state.movies.search(query, page).await?;
    Ok(Json(movies))
}

async fn analyze_w2(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<W2Report>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest(
            "request body must contain the W-2 image".to_string(),
        ));
    }

    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim())
        .filter(|v| v.starts_with("image/") || *v == "application/pdf")
        .unwrap_or("image/jpeg");

    Ok(Json(state.w2.process_bytes(&body, mime_type).await))
}

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
pub struct PriceGapRequest {
    pub nums: Vec<i64>,
    pub k: i64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceGapResponse {
    pub indices: Option<[usize; 2]>,
    pub values: Option<[i64; 2]>,
}

#[derive(Debug, Deserialize)]
struct MovieQuery {
    q: Option<String>,
    page: Option<u32>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

// ===== Error Handling =====

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    /// Upstream service failed after retries.
    BadGateway(MovieError),
}

impl From<MovieError> for ApiError {
    fn from(err: MovieError) -> Self {
        ApiError::BadGateway(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::BadGateway(err) => {
                let MovieError::Unavailable { last_error, .. } = err;
                tracing::error!("Upstream error: {}: {:#}", err, last_error);
                (
                    StatusCode::BAD_GATEWAY,
                    "External API unavailable".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
