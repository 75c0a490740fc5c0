//! Session, persistence, identity and file-picker configuration

use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

/// Session lifetime and capacity
#[derive(Debug, Clone)]
pub struct SessionsConfig {
    /// Sessions untouched for this long are evicted
    pub idle_ttl_secs: u64,
    /// How often the sweeper runs
    pub sweep_interval_secs: u64,
    /// Creation fails once this many sessions are live
    pub max_sessions: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 3600,
            sweep_interval_secs: 60,
            max_sessions: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSessionsConfig {
    pub idle_ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    pub max_sessions: Option<usize>,
}

impl SessionsConfig {
    pub fn from_file(file: Option<FileSessionsConfig>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            idle_ttl_secs: file.idle_ttl_secs.unwrap_or(defaults.idle_ttl_secs),
            sweep_interval_secs: file
                .sweep_interval_secs
                .unwrap_or(defaults.sweep_interval_secs)
                .max(1),
            max_sessions: file.max_sessions.unwrap_or(defaults.max_sessions),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Where saved analyses go
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StorageBackend {
    /// Local SQLite database (default)
    #[default]
    Sqlite,
    /// Cloud Firestore REST API
    Firestore,
    /// Saving disabled
    None,
}

impl StorageBackend {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "firestore" => Self::Firestore,
            "none" | "off" | "disabled" => Self::None,
            _ => Self::Sqlite,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Firestore => "firestore",
            Self::None => "none",
        }
    }
}

/// Cloud save configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Firestore project id
    pub firestore_project: Option<String>,
    /// Firestore REST base URL
    pub firestore_api_base: String,
    /// Firebase web API key (env only)
    pub firestore_api_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            db_path: PathBuf::from("./data/coursemind.db"),
            firestore_project: None,
            firestore_api_base: "https://firestore.googleapis.com/v1".to_string(),
            firestore_api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStorageConfig {
    pub backend: Option<String>,
    pub db_path: Option<String>,
    pub firestore_project: Option<String>,
    pub firestore_api_base: Option<String>,
}

impl StorageConfig {
    pub fn from_file(file: Option<FileStorageConfig>, api_key: Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            backend: file
                .backend
                .map(|s| StorageBackend::from_str(&s))
                .unwrap_or(defaults.backend),
            db_path: file.db_path.map(PathBuf::from).unwrap_or(defaults.db_path),
            firestore_project: file.firestore_project.filter(|p| !p.is_empty()),
            firestore_api_base: file
                .firestore_api_base
                .unwrap_or(defaults.firestore_api_base),
            firestore_api_key: api_key,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Identity provider configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Identity Toolkit REST base URL
    pub identity_api_base: String,
    /// Firebase web API key (env only)
    pub api_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            identity_api_base: "https://identitytoolkit.googleapis.com/v1".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileAuthConfig {
    pub enabled: Option<bool>,
    pub identity_api_base: Option<String>,
}

impl AuthConfig {
    /// Auth defaults to on whenever a Firebase key is available
    pub fn from_file(file: Option<FileAuthConfig>, api_key: Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            enabled: file.enabled.unwrap_or(api_key.is_some()),
            identity_api_base: file
                .identity_api_base
                .unwrap_or(defaults.identity_api_base),
            api_key,
        }
    }

    /// Enabled and holding a key
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Drive
// ─────────────────────────────────────────────────────────────────────────────

/// Remote file picker configuration
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Drive REST base URL
    pub api_base: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileDriveConfig {
    pub api_base: Option<String>,
}

impl DriveConfig {
    pub fn from_file(file: Option<FileDriveConfig>) -> Self {
        let file = file.unwrap_or_default();
        Self {
            api_base: file.api_base.unwrap_or_else(|| Self::default().api_base),
        }
    }
}
