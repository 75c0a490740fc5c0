//! Remote analysis client
//!
//! Everything that talks to the generative model lives here. The module is
//! split the same way a request flows:
//!
//! ```text
//! AnalysisClient (client.rs)
//! ├── prompts.rs   natural-language instructions per operation
//! ├── schema.rs    response schema declarations
//! └── ModelBackend trait
//!     ├── NoOpBackend    (no API key configured)
//!     └── GeminiBackend  (generateContent REST API)
//! ```
//!
//! The backend only moves text and citations across the wire. Parsing,
//! validation and the degraded-mode fallback happen in the client, so a
//! scripted backend is enough to test them.

pub mod client;
pub mod gemini;
pub mod prompts;
pub mod schema;

#[cfg(test)]
pub mod testing;

use crate::config::ModelConfig;
use crate::models::GroundingUrl;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

pub use client::{AnalysisClient, AnalysisError, ChatError, DetectionError, QuizError};

/// A single call to the model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Model identifier, e.g. "gemini-3-flash-preview"
    pub model: String,
    /// Complete prompt text
    pub prompt: String,
    /// When present the model must answer with JSON matching this schema
    pub response_schema: Option<serde_json::Value>,
    /// Enable the web-search tool (incompatible with a response schema)
    pub web_search: bool,
}

impl ModelRequest {
    pub fn text(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            response_schema: None,
            web_search: false,
        }
    }

    pub fn structured(model: &str, prompt: String, schema: serde_json::Value) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            response_schema: Some(schema),
            web_search: false,
        }
    }
}

/// What came back from the model
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    /// Concatenated text parts of the first candidate (None if empty)
    pub text: Option<String>,
    /// Web citations from grounding metadata
    pub citations: Vec<GroundingUrl>,
}

#[cfg(test)]
impl ModelReply {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            citations: Vec::new(),
        }
    }
}

/// Errors that can occur while calling the model
#[derive(Debug, Clone)]
pub enum ModelError {
    /// No API key configured
    NotConfigured,
    /// Rate limit exceeded (includes retry-after hint)
    RateLimited { retry_after_secs: Option<u64> },
    /// Non-success status from the API
    ApiError { status: u16, message: String },
    /// Transport failure
    NetworkError(String),
    /// The prompt was refused before generation
    Blocked(String),
    /// Response body did not have the expected envelope
    InvalidResponse(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "Model API key not configured"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "Rate limited, retry after {} seconds", secs)
                } else {
                    write!(f, "Rate limited")
                }
            }
            Self::ApiError { status, message } => {
                write!(f, "API error ({}): {}", status, message)
            }
            Self::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Self::Blocked(reason) => write!(f, "Prompt blocked: {}", reason),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Trait for generative model backends
///
/// Object safe so the client can hold an `Arc<dyn ModelBackend>`; async work
/// is returned as a boxed future.
pub trait ModelBackend: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Check if the backend can make calls
    fn is_ready(&self) -> bool;

    /// Perform one request/response round trip
    fn generate(&self, request: ModelRequest) -> BoxFuture<'_, Result<ModelReply, ModelError>>;
}

/// Backend used when no API key is available. Every call fails with
/// `ModelError::NotConfigured`.
#[derive(Debug, Default)]
pub struct NoOpBackend;

impl ModelBackend for NoOpBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn generate(&self, _request: ModelRequest) -> BoxFuture<'_, Result<ModelReply, ModelError>> {
        Box::pin(async { Err(ModelError::NotConfigured) })
    }
}

/// Create a model backend from configuration
pub fn create_backend(config: &ModelConfig) -> Arc<dyn ModelBackend> {
    match gemini::GeminiBackend::new(config) {
        Ok(backend) => Arc::new(backend),
        Err(ModelError::NotConfigured) => {
            tracing::warn!("No model API key set (GEMINI_API_KEY); analysis calls will fail");
            Arc::new(NoOpBackend)
        }
        Err(e) => {
            tracing::error!("Failed to create model backend: {}", e);
            Arc::new(NoOpBackend)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_backend() {
        let backend = NoOpBackend;
        assert_eq!(backend.name(), "noop");
        assert!(!backend.is_ready());

        let result = backend
            .generate(ModelRequest::text("any", "hello".to_string()))
            .await;
        assert!(matches!(result, Err(ModelError::NotConfigured)));
    }

    #[test]
    fn test_create_backend_without_key_is_noop() {
        let config = ModelConfig {
            api_key: None,
            ..ModelConfig::default()
        };
        let backend = create_backend(&config);
        assert_eq!(backend.name(), "noop");
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::ApiError {
            status: 400,
            message: "bad schema".to_string(),
        };
        assert_eq!(err.to_string(), "API error (400): bad schema");
        assert_eq!(
            ModelError::RateLimited {
                retry_after_secs: Some(7)
            }
            .to_string(),
            "Rate limited, retry after 7 seconds"
        );
    }
}
