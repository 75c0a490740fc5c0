// Session lifecycle, input and configuration endpoints

use crate::models::AnalysisStyle;
use crate::server::{ApiError, AppState};
use crate::session::SessionSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    pub chapter_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StyleRequest {
    pub style: AnalysisStyle,
}

/// POST /api/sessions - Create an idle session
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mut snapshot = state.driver.store().create(&state.default_language).await?;

    if let Some(language) = request.language.filter(|l| !l.trim().is_empty()) {
        snapshot = state
            .driver
            .apply(&snapshot.id, |s| {
                s.set_language(&language)?;
                Ok(s.snapshot())
            })
            .await?;
    }

    tracing::debug!(session = %snapshot.id, language = %snapshot.language, "Session created");
    Ok(Json(snapshot))
}

/// GET /api/sessions/:id - Current snapshot (poll target for running requests)
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.driver.snapshot(&id).await?))
}

/// DELETE /api/sessions/:id - Drop the session when its tab closes
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.driver.store().remove(&id).await {
        tracing::debug!(session = %id, "Session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Session not found".to_string()))
    }
}

/// PUT /api/sessions/:id/input - Replace the input text
pub async fn set_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<InputRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.set_input(&request.text)?;
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}

/// PUT /api/sessions/:id/language
pub async fn set_language(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LanguageRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.set_language(&request.language)?;
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/sessions/:id/select - Pick the chapter to analyze
pub async fn select_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.select_chapter(&request.chapter_id)?;
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}

/// PUT /api/sessions/:id/style
pub async fn set_style(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StyleRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.set_style(request.style)?;
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/sessions/:id/back - Success → Configuring, Configuring → Idle
pub async fn back(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.back()?;
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/sessions/:id/reset - Back to a blank Idle session
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.reset();
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}
