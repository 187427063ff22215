//! Application configuration
//!
//! Read once at startup from the process environment (and `.env`), then
//! passed into each component as plain structs.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Settings for the movie-search pass-through.
#[derive(Debug, Clone)]
pub struct MovieClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl MovieClientConfig {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Settings for the W-2 analyzer.
#[derive(Debug, Clone)]
pub struct W2Config {
    /// Return canned data instead of calling the model.
    pub test_mode: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl W2Config {
    pub fn test_mode() -> Self {
        Self {
            test_mode: true,
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub movies: MovieClientConfig,
    pub w2: W2Config,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` is the only caller
    /// outside of tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match non_empty("PORT") {
            Some(v) => v.trim().parse::<u16>().context("Invalid PORT")?,
            None => 8000,
        };

        let http_timeout = match non_empty("HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .context("Invalid HTTP_TIMEOUT_SECS")?,
            None => 10,
        };

        let movies = MovieClientConfig {
            api_key: non_empty("TMDB_API_KEY"),
            base_url: non_empty("TMDB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TMDB_BASE_URL.to_string()),
            timeout: Duration::from_secs(http_timeout),
        };

        let test_mode = lookup("TEST_MODE")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let w2 = W2Config {
            test_mode,
            api_key: non_empty("GEMINI_API_KEY"),
            model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: non_empty("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(60),
        };

        Ok(Self {
            bind_addr,
            port,
            movies,
            w2,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_addr, self.port))
    }
}
