//! Sign-in through the Firebase identity REST API
//!
//! The browser signs in with the provider popup and hands the resulting ID
//! token to the server, which resolves it to a [`UserProfile`] with
//! `accounts:lookup`. Sign-out is purely local: the session forgets its user.

use crate::config::AuthConfig;
use crate::models::UserProfile;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub enum AuthError {
    Disabled,
    InvalidToken(String),
    Network(String),
    Remote { status: u16, message: String },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "sign-in is not configured"),
            Self::InvalidToken(reason) => write!(f, "invalid ID token: {}", reason),
            Self::Network(msg) => write!(f, "identity service unreachable: {}", msg),
            Self::Remote { status, message } => {
                write!(f, "identity service error ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for AuthError {}

pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    /// Resolve an ID token to the signed-in user
    fn verify(&self, id_token: &str) -> BoxFuture<'_, Result<UserProfile, AuthError>>;
}

pub struct DisabledIdentity;

impl IdentityProvider for DisabledIdentity {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn verify(&self, _id_token: &str) -> BoxFuture<'_, Result<UserProfile, AuthError>> {
        Box::pin(async { Err(AuthError::Disabled) })
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct FirebaseIdentity {
    http: reqwest::Client,
    lookup_url: String,
    api_key: String,
}

impl FirebaseIdentity {
    pub fn new(api_base: &str, api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create identity HTTP client")?;

        tracing::debug!(
            "Firebase identity using key {}",
            crate::util::fingerprint(&api_key)
        );

        Ok(Self {
            http,
            lookup_url: format!("{}/accounts:lookup", api_base.trim_end_matches('/')),
            api_key,
        })
    }

    async fn lookup(&self, id_token: String) -> Result<UserProfile, AuthError> {
        if id_token.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty token".to_string()));
        }

        let response = self
            .http
            .post(&self.lookup_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "idToken": id_token }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            // Identity Toolkit reports bad tokens as 400 INVALID_ID_TOKEN / USER_NOT_FOUND
            if status == reqwest::StatusCode::BAD_REQUEST {
                return Err(AuthError::InvalidToken(message));
            }
            return Err(AuthError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let lookup: LookupResponse = response.json().await.map_err(|e| AuthError::Remote {
            status: status.as_u16(),
            message: format!("bad lookup response: {}", e),
        })?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::InvalidToken("no user for token".to_string()))?;

        Ok(UserProfile {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
        })
    }
}

impl IdentityProvider for FirebaseIdentity {
    fn name(&self) -> &'static str {
        "firebase"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn verify(&self, id_token: &str) -> BoxFuture<'_, Result<UserProfile, AuthError>> {
        let id_token = id_token.to_string();
        Box::pin(self.lookup(id_token))
    }
}

pub fn create_identity(config: &AuthConfig) -> Result<Arc<dyn IdentityProvider>> {
    match (&config.api_key, config.is_active()) {
        (Some(key), true) => Ok(Arc::new(FirebaseIdentity::new(
            &config.identity_api_base,
            key.clone(),
        )?)),
        _ => {
            if config.enabled {
                tracing::warn!("Auth enabled but FIREBASE_API_KEY is not set; sign-in disabled");
            }
            Ok(Arc::new(DisabledIdentity))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn lookup_route(
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> Response {
        if q.get("key").map(String::as_str) != Some("web-key") {
            return (StatusCode::FORBIDDEN, "bad key").into_response();
        }
        match body["idToken"].as_str() {
            Some("good") => Json(json!({
                "users": [{
                    "localId": "uid-1",
                    "email": "ada@example.com",
                    "displayName": "Ada",
                    "photoUrl": "https://example.com/ada.png"
                }]
            }))
            .into_response(),
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {"code": 400, "message": "INVALID_ID_TOKEN"}})),
            )
                .into_response(),
        }
    }

    async fn mock_identity(key: &str) -> FirebaseIdentity {
        let app = Router::new().fallback(lookup_route);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        FirebaseIdentity::new(&format!("http://{}", addr), key.to_string()).unwrap()
    }

    #[tokio::test]
    async fn verify_resolves_profile() {
        let identity = mock_identity("web-key").await;
        let user = identity.verify("good").await.unwrap();
        assert_eq!(user.uid, "uid-1");
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(user.photo_url.as_deref(), Some("https://example.com/ada.png"));
    }

    #[tokio::test]
    async fn invalid_token_reported() {
        let identity = mock_identity("web-key").await;
        match identity.verify("forged").await {
            Err(AuthError::InvalidToken(msg)) => assert_eq!(msg, "INVALID_ID_TOKEN"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            identity.verify("  ").await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn wrong_key_is_remote_error() {
        let identity = mock_identity("other-key").await;
        assert!(matches!(
            identity.verify("good").await,
            Err(AuthError::Remote { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn disabled_without_key() {
        let config = AuthConfig {
            enabled: true,
            ..AuthConfig::default()
        };
        let identity = create_identity(&config).unwrap();
        assert!(!identity.is_enabled());
        assert!(matches!(identity.verify("t").await, Err(AuthError::Disabled)));
    }
}
