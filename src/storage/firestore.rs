//! Firestore backend over the REST documents API
//!
//! Documents are sent as Firestore typed values (`stringValue`, `mapValue`,
//! ...), converted from the serde JSON form of each record.

use super::{AnalysisStore, SavedAnalysis, StoreError, UserRecord};
use crate::config::StorageConfig;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

const ANALYSES_COLLECTION: &str = "saved_analyses";
const USERS_COLLECTION: &str = "users";

pub struct FirestoreStore {
    http: reqwest::Client,
    /// `{api_base}/projects/{project}/databases/(default)/documents`
    documents_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    name: String,
}

/// Convert a JSON value into a Firestore typed value
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // 64-bit integers travel as strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": to_fields(map) } }),
    }
}

fn to_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect()
}

/// Top-level document body; `timestamp_fields` are sent as `timestampValue`
fn document_body<T: serde::Serialize>(
    record: &T,
    timestamp_fields: &[&str],
) -> Result<Value, StoreError> {
    let Value::Object(map) = serde_json::to_value(record)? else {
        return Err(StoreError::Serialization("record is not an object".to_string()));
    };

    let mut fields = to_fields(&map);
    for name in timestamp_fields {
        if let Some(Value::String(ts)) = map.get(*name) {
            fields.insert((*name).to_string(), json!({ "timestampValue": ts }));
        }
    }
    Ok(json!({ "fields": fields }))
}

impl FirestoreStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let project = config
            .firestore_project
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .context("storage.firestore_project must be set for the firestore backend")?;

        if config.firestore_api_key.is_none() {
            tracing::warn!("FIREBASE_API_KEY not set; Firestore requests will be unauthenticated");
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create Firestore HTTP client")?;

        Ok(Self {
            http,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                config.firestore_api_base.trim_end_matches('/'),
                project
            ),
            api_key: config.firestore_api_key.clone(),
        })
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = self
            .with_key(request)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Remote {
                status: status.as_u16(),
                message: crate::util::truncate_chars(&message, 300).to_string(),
            });
        }
        Ok(response)
    }
}

impl AnalysisStore for FirestoreStore {
    fn name(&self) -> &'static str {
        "firestore"
    }

    fn save(&self, record: SavedAnalysis) -> BoxFuture<'_, Result<String, StoreError>> {
        Box::pin(async move {
            let body = document_body(&record, &["createdAt"])?;
            let url = format!("{}/{}", self.documents_url, ANALYSES_COLLECTION);

            let created: CreatedDocument = self
                .send(self.http.post(&url).json(&body))
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            let id = created
                .name
                .rsplit('/')
                .next()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| StoreError::Serialization(format!("bad document name: {}", created.name)))?
                .to_string();

            tracing::info!(document_id = %id, user_id = %record.user_id, "Analysis saved to Firestore");
            Ok(id)
        })
    }

    fn upsert_user(&self, user: UserRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let body = document_body(&user, &["lastLogin"])?;
            let url = format!("{}/{}/{}", self.documents_url, USERS_COLLECTION, user.uid);

            // PATCH creates the document when it does not exist yet
            self.send(self.http.patch(&url).json(&body)).await?;
            tracing::debug!(uid = %user.uid, "User record written to Firestore");
            Ok(())
        })
    }
}
