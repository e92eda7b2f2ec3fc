//! HTTP client for Gemini-style `generateContent` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use leafscan_core::TokenUsage;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::request::GenerateRequest;

/// Public Generative Language API root, used for model listing.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote request timed out")]
    Timeout,
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The request URL carries the API key as a query parameter, so it is
/// stripped before the error can reach a log line or a response body.
impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e.without_url())
        }
    }
}

/// Text and token accounting from one `generateContent` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    /// First part of the first candidate, if the response carried one.
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Anything that can answer a [`GenerateRequest`].
#[async_trait]
pub trait RemoteAnalyzer: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateRequest,
        timeout: Duration,
    ) -> Result<Generation, RemoteError>;
}

// ── Wire format ──

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

impl GenerateResponse {
    fn into_generation(self) -> Generation {
        let usage = self.usage_metadata.map(|m| TokenUsage {
            input: m.prompt_token_count,
            output: m.candidates_token_count,
            total: m.total_token_count,
        });
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);
        Generation { text, usage }
    }
}

/// Parse a raw `generateContent` response body.
pub fn parse_generation(body: &str) -> Result<Generation, RemoteError> {
    let resp: GenerateResponse = serde_json::from_str(body)?;
    Ok(resp.into_generation())
}

// ── Client ──

/// Client bound to one `generateContent` URL and API key.
pub struct GeminiClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    /// `url` is the full method URL, e.g.
    /// `https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent`.
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }

    /// A client only when both URL and key are present and non-blank.
    pub fn from_config(url: Option<&str>, api_key: Option<&str>) -> Option<Self> {
        let url = url.map(str::trim).filter(|s| !s.is_empty())?;
        let key = api_key.map(str::trim).filter(|s| !s.is_empty())?;
        Some(Self::new(url.to_string(), key.to_string()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RemoteAnalyzer for GeminiClient {
    async fn generate(
        &self,
        request: &GenerateRequest,
        timeout: Duration,
    ) -> Result<Generation, RemoteError> {
        info!(url = %self.url, timeout_secs = timeout.as_secs_f32(), "calling remote model");
        let resp = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let body: String = body.chars().take(500).collect();
            warn!(status = status.as_u16(), body = %body, "remote model error");
            return Err(RemoteError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let generation = parse_generation(&body)?;
        if let Some(usage) = generation.usage {
            info!(
                input = usage.input,
                output = usage.output,
                total = usage.total,
                "remote token usage"
            );
        }
        Ok(generation)
    }
}

// ── Model listing ──

/// One entry from `GET /v1beta/models`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }

    /// Full `generateContent` URL for this model under `base`.
    pub fn generate_content_url(&self, base: &str) -> String {
        format!("{}/v1beta/{}:generateContent", base.trim_end_matches('/'), self.name)
    }
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// List the models visible to `api_key`.
pub async fn list_models(base: &str, api_key: &str) -> Result<Vec<ModelInfo>, RemoteError> {
    let url = format!("{}/v1beta/models", base.trim_end_matches('/'));
    info!(url = %url, "listing remote models");

    let resp = reqwest::Client::new()
        .get(&url)
        .query(&[("key", api_key)])
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(RemoteError::Server {
            status: status.as_u16(),
            body,
        });
    }

    let list: ModelList = serde_json::from_str(&body)?;
    info!(count = list.models.len(), "listed models");
    Ok(list.models)
}
