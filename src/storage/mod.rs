// Storage module - persists saved analyses and signed-in user records
//
// Two backends sit behind the `AnalysisStore` trait:
// - SQLite (default): local file, pooled connections, writes on blocking threads
// - Firestore: REST documents API, one document per save
//
// Saving is a single write; there is no read-back API.

pub mod firestore;
pub mod sqlite;

use crate::config::{StorageBackend, StorageConfig};
use crate::models::{CourseAnalysis, UserProfile};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use firestore::FirestoreStore;
pub use sqlite::SqliteStore;

/// Owner id used when nobody is signed in
pub const ANONYMOUS_USER: &str = "anon";

/// One saved study guide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnalysis {
    pub user_id: String,
    pub data: CourseAnalysis,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

impl SavedAnalysis {
    pub fn new(user: Option<&UserProfile>, data: CourseAnalysis, original_text: String) -> Self {
        Self {
            user_id: user
                .map(|u| u.uid.clone())
                .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
            data,
            original_text,
            created_at: Utc::now(),
        }
    }
}

/// Profile snapshot written on every sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub last_login: DateTime<Utc>,
}

impl From<&UserProfile> for UserRecord {
    fn from(profile: &UserProfile) -> Self {
        Self {
            uid: profile.uid.clone(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            photo_url: profile.photo_url.clone(),
            last_login: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// No backend configured
    Disabled,
    Database(String),
    Remote { status: u16, message: String },
    Network(String),
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "cloud save is not configured"),
            Self::Database(msg) => write!(f, "database error: {}", msg),
            Self::Remote { status, message } => {
                write!(f, "storage service error ({}): {}", status, message)
            }
            Self::Network(msg) => write!(f, "storage network error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Persistence backend
pub trait AnalysisStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write one analysis; returns the new document id
    fn save(&self, record: SavedAnalysis) -> BoxFuture<'_, Result<String, StoreError>>;

    /// Create or refresh a user record
    fn upsert_user(&self, user: UserRecord) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Used when storage is disabled; every write fails with `Disabled`
pub struct NoStore;

impl AnalysisStore for NoStore {
    fn name(&self) -> &'static str {
        "none"
    }

    fn save(&self, _record: SavedAnalysis) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async { Err(StoreError::Disabled) })
    }

    fn upsert_user(&self, _user: UserRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Err(StoreError::Disabled) })
    }
}

/// 20-character alphanumeric document id
pub fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Build the configured backend
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn AnalysisStore>> {
    match config.backend {
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&config.db_path).with_context(|| {
                format!("Failed to open database at {}", config.db_path.display())
            })?;
            Ok(Arc::new(store))
        }
        StorageBackend::Firestore => {
            let store = FirestoreStore::new(config)?;
            Ok(Arc::new(store))
        }
        StorageBackend::None => Ok(Arc::new(NoStore)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_analysis_owner() {
        let data = CourseAnalysis::raw_text("T", "s".to_string());
        let anon = SavedAnalysis::new(None, data.clone(), "text".to_string());
        assert_eq!(anon.user_id, "anon");

        let user = UserProfile {
            uid: "u-42".to_string(),
            email: None,
            display_name: Some("Ada".to_string()),
            photo_url: None,
        };
        let owned = SavedAnalysis::new(Some(&user), data, "text".to_string());
        assert_eq!(owned.user_id, "u-42");

        let json = serde_json::to_value(&owned).unwrap();
        assert!(json.get("originalText").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["data"]["topicTitle"], "T");
    }

    #[test]
    fn test_document_id_shape() {
        let id = new_document_id();
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, new_document_id());
    }

    #[tokio::test]
    async fn test_no_store_rejects_writes() {
        let store = NoStore;
        let record = SavedAnalysis::new(None, CourseAnalysis::raw_text("T", String::new()), String::new());
        assert!(matches!(store.save(record).await, Err(StoreError::Disabled)));
    }

    #[test]
    fn test_create_store_none_backend() {
        let config = StorageConfig {
            backend: StorageBackend::None,
            ..StorageConfig::default()
        };
        assert_eq!(create_store(&config).unwrap().name(), "none");
    }
}
