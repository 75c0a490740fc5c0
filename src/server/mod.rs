//! HTTP server setup and initialization
//!
//! Every route works on one session. Remote operations (detect, analyze,
//! more questions, chat) answer `202 Accepted` with the in-flight snapshot;
//! the browser polls `GET /api/sessions/{id}` until the status settles.

mod api;
pub mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::auth::{self, IdentityProvider};
use crate::config::Config;
use crate::ingest::DrivePicker;
use crate::llm::{self, AnalysisClient};
use crate::session::{SessionDriver, SessionStore};
use crate::storage::{self, AnalysisStore};

pub use error::ApiError;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Process-wide services shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub driver: SessionDriver,
    pub drive: Arc<DrivePicker>,
    pub store: Arc<dyn AnalysisStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub default_language: Arc<str>,
}

impl AppState {
    /// Build every service from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = llm::create_backend(&config.model);
        let client = AnalysisClient::new(backend, &config.model, config.limits.clone());
        let sessions = SessionStore::new(config.sessions.clone());

        Ok(Self {
            driver: SessionDriver::new(sessions, client),
            drive: Arc::new(DrivePicker::new(&config.drive)?),
            store: storage::create_store(&config.storage)?,
            identity: auth::create_identity(&config.auth)?,
            default_language: Arc::from(config.default_language.as_str()),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        // Session lifecycle and input
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/api/sessions/:id/input", put(api::set_input))
        .route("/api/sessions/:id/language", put(api::set_language))
        .route("/api/sessions/:id/ingest", post(api::ingest_file))
        .route("/api/sessions/:id/ingest/drive", post(api::ingest_drive))
        // Chapter detection and analysis
        .route("/api/sessions/:id/detect", post(api::detect))
        .route("/api/sessions/:id/select", post(api::select_chapter))
        .route("/api/sessions/:id/style", put(api::set_style))
        .route("/api/sessions/:id/analyze", post(api::analyze))
        .route("/api/sessions/:id/back", post(api::back))
        .route("/api/sessions/:id/reset", post(api::reset))
        // Quiz and chat
        .route(
            "/api/sessions/:id/quiz/:index/answer",
            post(api::answer_quiz),
        )
        .route("/api/sessions/:id/quiz/more", post(api::more_questions))
        .route(
            "/api/sessions/:id/chat",
            post(api::ask).delete(api::clear_chat),
        )
        // Results
        .route("/api/sessions/:id/document", get(api::document))
        .route("/api/sessions/:id/export.pdf", get(api::export_pdf))
        .route("/api/sessions/:id/save", post(api::save))
        // Identity
        .route("/api/sessions/:id/auth/sign-in", post(api::sign_in))
        .route("/api/sessions/:id/auth/sign-out", post(api::sign_out))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn start_server(bind_addr: SocketAddr, state: AppState) -> Result<()> {
    let sweeper = state.driver.store().spawn_sweeper();
    let app = router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Server error")?;

    sweeper.abort();
    tracing::info!("Server shut down gracefully");
    Ok(())
}
