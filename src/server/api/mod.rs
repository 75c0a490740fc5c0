// HTTP API handlers, one module per concern
//
// Handlers stay thin: decode the request, run one session action or service
// call, and return the resulting snapshot.

mod analysis;
mod auth;
mod documents;
mod ingest;
mod sessions;

use super::AppState;
use crate::config::VERSION;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub use analysis::{analyze, answer_quiz, ask, clear_chat, detect, more_questions};
pub use auth::{sign_in, sign_out};
pub use documents::{document, export_pdf, save};
pub use ingest::{ingest_drive, ingest_file};
pub use sessions::{
    back, create_session, delete_session, get_session, reset, select_chapter, set_input, set_language, set_style,
};

/// GET /health - liveness and service summary
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let client = state.driver.client();
    Json(json!({
        "status": "ok",
        "version": VERSION,
        "model": client.backend_name(),
        "modelReady": client.is_ready(),
        "sessions": state.driver.store().len().await,
        "storage": state.store.name(),
        "auth": state.identity.is_enabled(),
    }))
}
