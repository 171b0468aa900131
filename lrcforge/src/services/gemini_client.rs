//! Gemini API client
//!
//! Text enrichment over the Generative Language REST API, with request pacing.
//! HTTP 429 and `RESOURCE_EXHAUSTED` replies surface as
//! [`TextServiceError::RateLimited`].

use crate::error::TextServiceError;
use crate::services::line_enhancer::{TextRequest, TextService};
use async_trait::async_trait;
use lrcforge_common::config::EnrichmentConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use lrcforge_common::pacing::RequestPacer;
use std::time::Duration;

const USER_AGENT: &str = concat!("lrcforge/", env!("CARGO_PKG_VERSION"));

/// Gemini generateContent response (only the fields we use)
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Model listing page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// A model available to the configured API key
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. "models/gemini-2.5-flash"
    pub name: String,
    pub display_name: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    pacer: RequestPacer,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &EnrichmentConfig, api_key: String) -> Result<Self, TextServiceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TextServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            pacer: RequestPacer::from_millis("gemini", config.min_request_interval_ms),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.trim_start_matches("models/").to_string(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// List models available to this API key
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, TextServiceError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            self.pacer.acquire().await;

            let mut request = self
                .http_client
                .get(format!("{}/models", self.base_url))
                .header("x-goog-api-key", &self.api_key);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| TextServiceError::Network(e.without_url().to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(map_error_response(status.as_u16(), &body));
            }

            let page: ListModelsResponse = response
                .json()
                .await
                .map_err(|e| TextServiceError::Parse(e.without_url().to_string()))?;

            models.extend(page.models);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl TextService for GeminiClient {
    async fn generate(&self, request: &TextRequest) -> Result<String, TextServiceError> {
        self.pacer.acquire().await;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_request_body(request);

        tracing::debug!(model = %self.model, "Querying Gemini API");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TextServiceError::Network(e.without_url().to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_error_response(status.as_u16(), &error_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| TextServiceError::Parse(e.without_url().to_string()))?;

        extract_text(parsed)
    }
}

fn build_request_body(request: &TextRequest) -> serde_json::Value {
    let mut body = json!({
        "contents": [
            { "role": "user", "parts": [ { "text": request.prompt } ] }
        ]
    });

    if let Some(schema) = &request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }

    body
}

/// Concatenate the text parts of the first candidate
///
/// No candidate at all means the prompt was blocked or dropped.
fn extract_text(response: GenerateContentResponse) -> Result<String, TextServiceError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(TextServiceError::EmptyResponse);
    };

    Ok(candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

/// Map a non-success HTTP reply to a service error
fn map_error_response(status: u16, body: &str) -> TextServiceError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };

    if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        return TextServiceError::RateLimited(message);
    }

    TextServiceError::Api { status, message }
}
