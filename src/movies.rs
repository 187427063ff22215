//! TMDB movie search pass-through
//!
//! Searches by title, then enriches each result with its director from the
//! credits sub-resource. The search is attempted twice before giving up;
//! credits lookups never fail the request.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::MovieClientConfig;

const MAX_ATTEMPTS: u32 = 2;
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub title: String,
    pub director: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: u32,
    pub total_pages: u64,
    pub total_results: u64,
}

impl MoviePage {
    /// Result for a blank query; no upstream call is made.
    pub fn empty(page: u32) -> Self {
        Self {
            movies: Vec::new(),
            page,
            total_pages: 0,
            total_results: 0,
        }
    }
}

/// Search failure after every attempt was used up.
#[derive(Debug)]
pub enum MovieError {
    Unavailable {
        attempts: u32,
        last_error: anyhow::Error,
    },
}

impl fmt::Display for MovieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { attempts, .. } => {
                write!(f, "TMDB search failed after {attempts} attempts")
            }
        }
    }
}

impl std::error::Error for MovieError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Unavailable { last_error, .. } => Some(last_error.as_ref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    results: Vec<SearchResult>,
    #[serde(default)]
    total_pages: Option<u64>,
    #[serde(default)]
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    #[serde(default)]
    crew: Vec<CrewMember>,
}

#[derive(Debug, Deserialize)]
struct CrewMember {
    #[serde(default)]
    job: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Clone)]
pub struct MovieClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl MovieClient {
    pub fn new(config: MovieClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build MovieClient")?;

        if config.api_key.is_none() {
            warn!("TMDB_API_KEY not set; movie search will be rejected upstream");
        }

        Ok(Self {
            client,
            api_key: config.api_key.unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Search movies by title and attach each result's director.
    pub async fn search(&self, query: &str, page: u32) -> Result<MoviePage, MovieError> {
        let mut last_err = anyhow!("no attempt made");

        for attempt in 1..=MAX_ATTEMPTS {
            match self.search_once(query, page).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(attempt, error = %e, "TMDB search failed");
                    last_err = e;
                }
            }
            if attempt < MAX_ATTEMPTS {
                info!(query, page, "Retrying TMDB search");
            }
        }

        Err(MovieError::Unavailable {
            attempts: MAX_ATTEMPTS,
            last_error: last_err,
        })
    }

    async fn search_once(&self, query: &str, page: u32) -> Result<MoviePage> {
        let page_param = page.to_string();
        let resp = self
            .client
            .get(self.url("/search/movie"))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("page", page_param.as_str()),
            ])
            .send()
            .await
            .context("GET /search/movie failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(anyhow!("GET /search/movie {}: {}", status, snippet));
        }

        let data: SearchResponse = resp
            .json()
            .await
            .context("Failed to parse search response")?;
        debug!(query, results = data.results.len(), "TMDB search response received");

        let mut movies = Vec::with_capacity(data.results.len());
        for result in data.results {
            let director = match result.id {
                Some(id) => self.director(id).await,
                None => UNKNOWN.to_string(),
            };
            movies.push(Movie {
                title: result.title.unwrap_or_else(|| UNKNOWN.to_string()),
                director,
            });
        }

        Ok(MoviePage {
            movies,
            page: data.page.unwrap_or(page),
            total_pages: data.total_pages.unwrap_or(0),
            total_results: data.total_results.unwrap_or(0),
        })
    }

    /// Director name from credits, or "Unknown" on any failure.
    async fn director(&self, movie_id: u64) -> String {
        match self.fetch_credits(movie_id).await {
            Ok(credits) => pick_director(&credits),
            Err(e) => {
                debug!(movie_id, error = %e, "credits lookup failed");
                UNKNOWN.to_string()
            }
        }
    }

    async fn fetch_credits(&self, movie_id: u64) -> Result<CreditsResponse> {
        self.client
            .get(self.url(&format!("/movie/{movie_id}/credits")))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .context("GET /movie/{id}/credits failed")?
            .error_for_status()
            .context("credits status")?
            .json::<CreditsResponse>()
            .await
            .context("Failed to parse credits response")
    }
}

fn pick_director(credits: &CreditsResponse) -> String {
    credits
        .crew
        .iter()
        .find(|c| c.job.as_deref() == Some("Director"))
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
