// File ingestion endpoints: direct upload and Drive picker

use crate::ingest::{extract_as, extract_text, DocumentFormat, IngestionError};
use crate::server::{ApiError, AppState};
use crate::session::SessionSnapshot;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveRequest {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// False when the picker was cancelled
    pub appended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub chars: usize,
    pub session: SessionSnapshot,
}

/// Extract on a blocking thread, then append to the session input.
/// A known `format` wins over filename and magic-byte detection.
async fn append_document(
    state: &AppState,
    id: &str,
    filename: Option<String>,
    format: Option<DocumentFormat>,
    data: Bytes,
) -> Result<IngestResponse, ApiError> {
    // Fail fast for unknown sessions before parsing anything
    state.driver.view(id, |_| ()).await?;

    let name = filename.clone();
    let text = tokio::task::spawn_blocking(move || match format {
        Some(format) => extract_as(format, &data),
        None => extract_text(name.as_deref(), &data),
    })
    .await
        .map_err(|e| ApiError::Internal(format!("extraction task failed: {}", e)))??;

    let chars = text.chars().count();
    let session = state
        .driver
        .apply(id, |s| {
            s.append_input(&text)?;
            Ok(s.snapshot())
        })
        .await?;

    tracing::info!(session = %id, file = ?filename, chars, "Document ingested");
    Ok(IngestResponse {
        appended: true,
        filename,
        chars,
        session,
    })
}

/// POST /api/sessions/:id/ingest?filename= - Raw file body
pub async fn ingest_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    Ok(Json(
        append_document(&state, &id, query.filename, None, body).await?,
    ))
}

/// POST /api/sessions/:id/ingest/drive - File picked in Google Drive
///
/// A token in the request is stored on the session; later picks from the
/// same session may omit it. Drive rejecting the token clears it.
pub async fn ingest_drive(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DriveRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let token = state
        .driver
        .apply(&id, |s| {
            if let Some(token) = request.access_token.as_deref() {
                s.authorize_drive(token);
            }
            Ok(s.drive_token().map(str::to_string))
        })
        .await?;

    let picked = match state
        .drive
        .fetch(request.file_id.as_deref(), token.as_deref())
        .await
    {
        Ok(picked) => picked,
        Err(IngestionError::DriveUnauthorized) => {
            if let Some(rejected) = token.as_deref() {
                state
                    .driver
                    .apply(&id, |s| {
                        s.revoke_drive(rejected);
                        Ok(())
                    })
                    .await?;
            }
            return Err(IngestionError::DriveUnauthorized.into());
        }
        Err(e) => return Err(e.into()),
    };

    match picked {
        Some(file) => Ok(Json(
            append_document(&state, &id, Some(file.name), Some(file.format), file.bytes).await?,
        )),
        None => Ok(Json(IngestResponse {
            appended: false,
            filename: None,
            chars: 0,
            session: state.driver.snapshot(&id).await?,
        })),
    }
}
