// Remote operations: detection, analysis, quiz and chat
//
// The long-running ones return 202 with the snapshot taken right after the
// request started; the outcome lands in the session when the model answers.

use crate::server::{ApiError, AppState};
use crate::session::driver::Pending;
use crate::session::quiz::AnswerState;
use crate::session::SessionSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

type Accepted = (StatusCode, Json<SessionSnapshot>);

/// The task keeps running after its handle is dropped
fn accepted(pending: Pending) -> Accepted {
    (StatusCode::ACCEPTED, Json(pending.snapshot))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

/// POST /api/sessions/:id/detect - Start chapter detection
pub async fn detect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, ApiError> {
    Ok(accepted(state.driver.detect(&id).await?))
}

/// POST /api/sessions/:id/analyze - Analyze the selected chapter
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, ApiError> {
    Ok(accepted(state.driver.analyze(&id).await?))
}

/// POST /api/sessions/:id/quiz/:index/answer - Lock in an answer
pub async fn answer_quiz(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerState>, ApiError> {
    let answer = state
        .driver
        .apply(&id, |s| s.answer_quiz(index, request.option))
        .await?;
    Ok(Json(answer))
}

/// POST /api/sessions/:id/quiz/more - Generate additional questions
pub async fn more_questions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, ApiError> {
    Ok(accepted(state.driver.more_questions(&id).await?))
}

/// POST /api/sessions/:id/chat - Ask a question about the document
pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Accepted, ApiError> {
    Ok(accepted(state.driver.ask(&id, &request.question).await?))
}

/// DELETE /api/sessions/:id/chat - Clear the transcript
pub async fn clear_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let snapshot = state
        .driver
        .apply(&id, |s| {
            s.clear_chat()?;
            Ok(s.snapshot())
        })
        .await?;
    Ok(Json(snapshot))
}
