//! Price-gap HTTP server
//!
//! Serves the price-gap pair finder, the TMDB movie search pass-through and
//! the W-2 analyzer over HTTP.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pricegap_backend::{
    api::{create_router, AppState},
    config::Config,
    movies::MovieClient,
    w2::W2Analyzer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        test_mode = config.w2.test_mode,
        "Price-gap server starting"
    );

    let movies = MovieClient::new(config.movies.clone())?;
    let w2 = W2Analyzer::new(&config.w2).context("Failed to initialize W-2 analyzer")?;

    let app = create_router(AppState {
        movies: Arc::new(movies),
        w2: Arc::new(w2),
    });

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pricegap_backend=debug,pricegap_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
