use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::oracle::{Oracle, OracleError};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

pub struct GeminiOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .context("Failed to build HTTP client for Gemini")?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn healthcheck(&self) -> Result<()> {
        self.http
            .get(format!("{}/models", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?
            .error_for_status()
            .context("Failed to validate API key with Gemini")?;
        Ok(())
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response: GenerateContentResponse = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| OracleError::Request(err.to_string()))?
            .json()
            .await
            .map_err(|err| OracleError::Request(err.to_string()))?;

        response.text().ok_or(OracleError::EmptyResponse)
    }
}
