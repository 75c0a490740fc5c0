// Result endpoints: HTML document, PDF export and cloud save

use crate::export::{self, pdf_filename};
use crate::render::{render_document, DocumentView};
use crate::server::{ApiError, AppState};
use crate::storage::SavedAnalysis;
use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;

const NO_DOCUMENT: &str = "No analysis available for this session";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub document_id: String,
}

/// GET /api/sessions/:id/document - Rendered HTML view
pub async fn document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let html = state
        .driver
        .view(&id, |s| {
            s.document().map(|analysis| {
                render_document(&DocumentView {
                    analysis: &analysis,
                    answers: s.quiz().answers(),
                    chat: s.chat().entries(),
                })
            })
        })
        .await?
        .ok_or_else(|| ApiError::Conflict(NO_DOCUMENT.to_string()))?;

    Ok(Html(html))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    let mut encoded = String::new();
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// GET /api/sessions/:id/export.pdf - PDF attachment named after the topic
pub async fn export_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let analysis = state
        .driver
        .view(&id, |s| s.document())
        .await?
        .ok_or_else(|| ApiError::Conflict(NO_DOCUMENT.to_string()))?;

    let filename = pdf_filename(&analysis.topic_title);
    let bytes = tokio::task::spawn_blocking(move || export::export_pdf(&analysis))
        .await
        .map_err(|e| ApiError::Internal(format!("export task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(session = %id, file = %filename, bytes = bytes.len(), "PDF exported");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/sessions/:id/save - Persist analysis and original text
pub async fn save(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SaveResponse>, ApiError> {
    let record = state
        .driver
        .view(&id, |s| {
            s.document()
                .map(|doc| SavedAnalysis::new(s.user(), doc, s.input().to_string()))
        })
        .await?
        .ok_or_else(|| ApiError::Conflict(NO_DOCUMENT.to_string()))?;

    let document_id = state.store.save(record).await?;
    Ok(Json(SaveResponse { document_id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_ascii_name() {
        assert_eq!(
            content_disposition("Cells.pdf"),
            "attachment; filename=\"Cells.pdf\"; filename*=UTF-8''Cells.pdf"
        );
    }

    #[test]
    fn disposition_non_ascii_name() {
        let value = content_disposition("Álgebra.pdf");
        assert!(value.contains("filename=\"_lgebra.pdf\""));
        assert!(value.ends_with("filename*=UTF-8''%C3%81lgebra.pdf"));
        assert!(value.is_ascii());
    }
}
