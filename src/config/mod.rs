//! Configuration for the study-guide server
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/coursemind/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! Secrets (model and Firebase API keys) are read from the environment only
//! and never written to the config file.

use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod model;
mod observability;
mod serialization;
mod services;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use model::{FileLimits, FileModelConfig, Limits, ModelConfig};
pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use services::{
    AuthConfig, DriveConfig, FileAuthConfig, FileDriveConfig, FileSessionsConfig,
    FileStorageConfig, SessionsConfig, StorageBackend, StorageConfig,
};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_LANGUAGE: &str = "english";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_addr: SocketAddr,

    /// Language used for generated content in new sessions
    pub default_language: String,

    /// Remote model endpoint and model names
    pub model: ModelConfig,

    /// Input truncation bounds per operation
    pub limits: Limits,

    /// Session lifetime and capacity
    pub sessions: SessionsConfig,

    /// Cloud save backend
    pub storage: StorageConfig,

    /// Identity provider
    pub auth: AuthConfig,

    /// Remote file picker
    pub drive: DriveConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            default_language: DEFAULT_LANGUAGE.to_string(),
            model: ModelConfig::default(),
            limits: Limits::default(),
            sessions: SessionsConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            drive: DriveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub default_language: Option<String>,

    /// Optional [model] section
    pub model: Option<FileModelConfig>,

    /// Optional [limits] section
    pub limits: Option<FileLimits>,

    /// Optional [sessions] section
    pub sessions: Option<FileSessionsConfig>,

    /// Optional [storage] section
    pub storage: Option<FileStorageConfig>,

    /// Optional [auth] section
    pub auth: Option<FileAuthConfig>,

    /// Optional [drive] section
    pub drive: Option<FileDriveConfig>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/coursemind/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("coursemind").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // config is optional
            }
        }

        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed terminates the process
    /// with an actionable message instead of silently using defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: Check for:\n");
                    eprintln!("    - Missing quotes around string values");
                    eprintln!("    - Invalid boolean values (use true/false)");
                    eprintln!("    - Typos in section names\n");
                    eprintln!("  To reset, run `coursemind config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: file -> env vars -> defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let file = Self::load_file_config();
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    pub(crate) fn from_sources<F>(file: FileConfig, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Bind address: env > file > default
        let bind_raw = env("COURSEMIND_BIND")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse()
            .with_context(|| format!("Invalid bind address: {}", bind_raw))?;

        // Language: env > file > default
        let default_language = env("COURSEMIND_LANGUAGE")
            .or(file.default_language)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        // Secrets: env only
        let model_api_key = env("GEMINI_API_KEY")
            .or_else(|| env("API_KEY"))
            .filter(|k| !k.is_empty());
        let firebase_api_key = env("FIREBASE_API_KEY").filter(|k| !k.is_empty());

        let model = ModelConfig::from_file(file.model, model_api_key);
        let limits = Limits::from_file(file.limits);
        let sessions = SessionsConfig::from_file(file.sessions);
        let storage = StorageConfig::from_file(file.storage, firebase_api_key.clone());
        let auth = AuthConfig::from_file(file.auth, firebase_api_key);
        let drive = DriveConfig::from_file(file.drive);
        let logging = LoggingConfig::from_file(file.logging);

        Ok(Self {
            bind_addr,
            default_language,
            model,
            limits,
            sessions,
            storage,
            auth,
            drive,
            logging,
        })
    }
}
