//! SQLite backend
//!
//! Connections come from an r2d2 pool; every statement runs on a blocking
//! thread so the async runtime never waits on disk.

use super::{new_document_id, AnalysisStore, SavedAnalysis, StoreError, UserRecord};
use futures::future::BoxFuture;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use std::path::Path;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema
    pub fn open(db_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder().max_size(4).build(manager)?;

        let conn = pool.get()?;
        Self::init_schema(&conn)?;

        tracing::debug!("SQLite store ready at {}", db_path.display());
        Ok(Self { pool })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA busy_timeout=5000;

            CREATE TABLE IF NOT EXISTS saved_analyses (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                topic_title TEXT NOT NULL,
                data TEXT NOT NULL,
                original_text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_saved_analyses_user
                ON saved_analyses(user_id, created_at);

            CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                email TEXT,
                display_name TEXT,
                photo_url TEXT,
                last_login TEXT NOT NULL
            );
            "#,
        )
    }

    fn insert(&self, id: &str, record: &SavedAnalysis) -> Result<(), StoreError> {
        let data = serde_json::to_string(&record.data)?;
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO saved_analyses (id, user_id, topic_title, data, original_text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                record.user_id,
                record.data.topic_title,
                data,
                record.original_text,
                record.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn write_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (uid, email, display_name, photo_url, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(uid) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                photo_url = excluded.photo_url,
                last_login = excluded.last_login",
            params![
                user.uid,
                user.email,
                user.display_name,
                user.photo_url,
                user.last_login.to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Database(format!("storage task failed: {}", e)))?
}

impl AnalysisStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn save(&self, record: SavedAnalysis) -> BoxFuture<'_, Result<String, StoreError>> {
        let store = self.clone();
        Box::pin(async move {
            let id = new_document_id();
            let user_id = record.user_id.clone();
            let saved_id = id.clone();
            blocking(move || store.insert(&saved_id, &record)).await?;
            tracing::info!(document_id = %id, user_id = %user_id, "Analysis saved");
            Ok(id)
        })
    }

    fn upsert_user(&self, user: UserRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        let store = self.clone();
        Box::pin(async move {
            let uid = user.uid.clone();
            blocking(move || store.write_user(&user)).await?;
            tracing::debug!(uid = %uid, "User record updated");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseAnalysis;
    use chrono::Utc;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("nested/store.db")).unwrap();
        (dir, store)
    }

    fn record(user: &str) -> SavedAnalysis {
        SavedAnalysis {
            user_id: user.to_string(),
            data: CourseAnalysis::raw_text("Cells", "Mitosis---PAGE---Meiosis".to_string()),
            original_text: "Chapter 1 cells".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_round_trips_document() {
        let (_dir, store) = open_temp();
        let id = store.save(record("anon")).await.unwrap();

        let conn = store.pool.get().unwrap();
        let (user, title, data, original): (String, String, String, String) = conn
            .query_row(
                "SELECT user_id, topic_title, data, original_text FROM saved_analyses WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .unwrap();

        assert_eq!(user, "anon");
        assert_eq!(title, "Cells");
        assert_eq!(original, "Chapter 1 cells");
        let data: CourseAnalysis = serde_json::from_str(&data).unwrap();
        assert_eq!(data.summary, "Mitosis---PAGE---Meiosis");
    }

    #[tokio::test]
    async fn test_each_save_gets_new_id() {
        let (_dir, store) = open_temp();
        let a = store.save(record("u1")).await.unwrap();
        let b = store.save(record("u1")).await.unwrap();
        assert_ne!(a, b);

        let conn = store.pool.get().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM saved_analyses WHERE user_id = 'u1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_upsert_user_updates_in_place() {
        let (_dir, store) = open_temp();
        let mut user = UserRecord {
            uid: "u1".to_string(),
            email: Some("a@example.com".to_string()),
            display_name: Some("Ada".to_string()),
            photo_url: None,
            last_login: Utc::now(),
        };
        store.upsert_user(user.clone()).await.unwrap();

        user.display_name = Some("Ada L.".to_string());
        store.upsert_user(user).await.unwrap();

        let conn = store.pool.get().unwrap();
        let name: Option<String> = conn
            .query_row("SELECT display_name FROM users WHERE uid = 'u1'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name.as_deref(), Some("Ada L."));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        drop(SqliteStore::open(&path).unwrap());
        assert!(SqliteStore::open(&path).is_ok());
    }
}
