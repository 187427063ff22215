use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::W2Config;

/// Turns an image plus an instruction into the model's raw text answer.
#[async_trait::async_trait]
pub trait ImageExtractor: Send + Sync {
    async fn extract(&self, prompt: &str, image: &[u8], mime_type: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &W2Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("GEMINI_API_KEY missing (set env var or enable TEST_MODE)")?;
        if api_key.trim().is_empty() {
            return Err(anyhow!("GEMINI_API_KEY empty"));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl ImageExtractor for GeminiClient {
    async fn extract(&self, prompt: &str, image: &[u8], mime_type: &str) -> Result<String> {
        let start = Instant::now();

        let req = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .context("gemini request")?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let snippet: String = body.chars().take(800).collect();
            return Err(anyhow!("gemini {}: {}", status.as_u16(), snippet));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).context("gemini json parse")?;
        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            total_tokens = ?parsed.usage_metadata.and_then(|u| u.total_token_count),
            "gemini extraction complete"
        );

        if text.trim().is_empty() {
            return Err(anyhow!("gemini returned no text"));
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    total_token_count: Option<u64>,
}
