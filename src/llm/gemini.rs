//! Gemini `generateContent` backend
//!
//! Thin REST binding: builds the request envelope, maps HTTP failures onto
//! `ModelError`, and flattens the first candidate into text plus citations.

use super::{ModelBackend, ModelError, ModelReply, ModelRequest};
use crate::config::ModelConfig;
use crate::models::GroundingUrl;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;

pub struct GeminiBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend from configuration
    ///
    /// # Errors
    /// Returns `NotConfigured` without an API key, or a network error if the
    /// HTTP client cannot be built.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = config.api_key.clone().ok_or(ModelError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ModelError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Gemini backend: {} (fast: {}, deep: {}, key: {})",
            config.api_base,
            config.fast_model,
            config.deep_model,
            crate::util::fingerprint(&api_key)
        );

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    async fn call(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let body = build_body(&request);
        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            structured = request.response_schema.is_some(),
            web_search = request.web_search,
            "Calling generateContent"
        );

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::NetworkError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if status_code == 429 {
                return Err(ModelError::RateLimited { retry_after_secs });
            }
            return Err(ModelError::ApiError {
                status: status_code,
                message,
            });
        }

        let envelope: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parse_envelope(envelope)
    }
}

impl ModelBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn generate(&self, request: ModelRequest) -> BoxFuture<'_, Result<ModelReply, ModelError>> {
        Box::pin(self.call(request))
    }
}

/// Build the JSON request body
fn build_body(request: &ModelRequest) -> serde_json::Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }]
        }]
    });

    if let Some(schema) = &request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }

    if request.web_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }

    body
}

fn parse_envelope(envelope: GenerateContentResponse) -> Result<ModelReply, ModelError> {
    if let Some(reason) = envelope
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(ModelError::Blocked(reason));
    }

    let Some(candidate) = envelope.candidates.into_iter().next() else {
        return Err(ModelError::InvalidResponse("no candidates returned".to_string()));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .map(|meta| {
            meta.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .map(|web| GroundingUrl {
                    title: web.title.unwrap_or_else(|| web.uri.clone()),
                    uri: web.uri,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ModelReply {
        text: if text.is_empty() { None } else { Some(text) },
        citations,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
