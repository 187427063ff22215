//! End-to-end checks of the HTTP API against a local TMDB stand-in.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pricegap_backend::{
    api::{create_router, AppState},
    config::{MovieClientConfig, W2Config},
    movies::MovieClient,
    w2::W2Analyzer,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use tower::ServiceExt;

#[derive(Clone)]
struct Upstream {
    search_calls: Arc<AtomicU32>,
    credits_calls: Arc<AtomicU32>,
    fail_first: u32,
}

async fn search(
    State(up): State<Upstream>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if up.search_calls.fetch_add(1, Ordering::SeqCst) < up.fail_first {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let query = params.get("query").cloned().unwrap_or_default();
    Json(json!({
        "page": 1,
        "results": [
            {"id": 27205, "title": format!("{query} (2010)")},
            {"id": 99999, "title": "Lost Credits"}
        ],
        "total_pages": 1,
        "total_results": 2
    }))
    .into_response()
}

async fn credits(State(up): State<Upstream>, Path(id): Path<u64>) -> Response {
    up.credits_calls.fetch_add(1, Ordering::SeqCst);
    if id == 27205 {
        Json(json!({"crew": [{"job": "Director", "name": "Christopher Nolan"}]})).into_response()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

async fn app_with_upstream(fail_first: u32) -> (Router, Upstream) {
    let upstream = Upstream {
        search_calls: Arc::new(AtomicU32::new(0)),
        credits_calls: Arc::new(AtomicU32::new(0)),
        fail_first,
    };
    let stub = Router::new()
        .route("/search/movie", get(search))
        .route("/movie/:id/credits", get(credits))
        .with_state(upstream.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });

    let movies = MovieClient::new(MovieClientConfig::new(
        Some("key".to_string()),
        format!("http://{addr}"),
    ))
    .unwrap();
    let w2 = W2Analyzer::new(&W2Config::test_mode()).unwrap();
    let app = create_router(AppState {
        movies: Arc::new(movies),
        w2: Arc::new(w2),
    });
    (app, upstream)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn movie_search_passes_through_with_directors() {
    let (app, upstream) = app_with_upstream(0).await;
    let (status, body) = get_json(app, "/api/movies?q=Inception&page=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "movies": [
                {"title": "Inception (2010)", "director": "Christopher Nolan"},
                {"title": "Lost Credits", "director": "Unknown"}
            ],
            "page": 1,
            "total_pages": 1,
            "total_results": 2
        })
    );
    assert_eq!(upstream.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(upstream.credits_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn movie_search_recovers_on_second_attempt() {
    let (app, upstream) = app_with_upstream(1).await;
    let (status, body) = get_json(app, "/api/movies?q=Heat").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movies"].as_array().unwrap().len(), 2);
    assert_eq!(upstream.search_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn movie_search_reports_gateway_error_after_two_failures() {
    let (app, upstream) = app_with_upstream(2).await;
    let (status, body) = get_json(app, "/api/movies?q=Heat").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({"error": "External API unavailable"}));
    assert_eq!(upstream.search_calls.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.credits_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_query_never_reaches_upstream() {
    let (app, upstream) = app_with_upstream(0).await;
    let (status, body) = get_json(app, "/api/movies?q=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 0);
    assert_eq!(upstream.search_calls.load(Ordering::SeqCst), 0);
}
