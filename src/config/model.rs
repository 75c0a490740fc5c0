//! Model endpoint configuration and prompt input limits

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Model Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Remote generative model configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// REST API base URL
    pub api_base: String,
    /// API key (env only, never serialized)
    pub api_key: Option<String>,
    /// Model used for chapter detection, extra questions and chat
    pub fast_model: String,
    /// Model used for the full study-guide analysis
    pub deep_model: String,
    /// Per-request timeout; deep analyses can take minutes
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            fast_model: "gemini-3-flash-preview".to_string(),
            deep_model: "gemini-3-pro-preview".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Model config as loaded from file
#[derive(Debug, Deserialize, Default)]
pub struct FileModelConfig {
    pub api_base: Option<String>,
    pub fast_model: Option<String>,
    pub deep_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ModelConfig {
    /// Create from file config with defaults; the key comes from the environment
    pub fn from_file(file: Option<FileModelConfig>, api_key: Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            api_base: file.api_base.unwrap_or(defaults.api_base),
            api_key,
            fast_model: file.fast_model.unwrap_or(defaults.fast_model),
            deep_model: file.deep_model.unwrap_or(defaults.deep_model),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input Limits
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum characters of source text sent with each kind of request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub detect_chars: usize,
    pub analyze_chars: usize,
    pub quiz_chars: usize,
    pub chat_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            detect_chars: 500_000,
            analyze_chars: 400_000,
            quiz_chars: 200_000,
            chat_chars: 800_000,
        }
    }
}

/// Limits as loaded from file
#[derive(Debug, Deserialize, Default)]
pub struct FileLimits {
    pub detect_chars: Option<usize>,
    pub analyze_chars: Option<usize>,
    pub quiz_chars: Option<usize>,
    pub chat_chars: Option<usize>,
}

impl Limits {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileLimits>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            detect_chars: file.detect_chars.unwrap_or(defaults.detect_chars),
            analyze_chars: file.analyze_chars.unwrap_or(defaults.analyze_chars),
            quiz_chars: file.quiz_chars.unwrap_or(defaults.quiz_chars),
            chat_chars: file.chat_chars.unwrap_or(defaults.chat_chars),
        }
    }
}
