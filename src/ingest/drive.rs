//! Google Drive file retrieval for the remote file picker
//!
//! The browser runs the picker and OAuth flow; this side receives the picked
//! file id plus an access token, checks the file's MIME type against the
//! picker scope (PDF and DOCX) and downloads it with `alt=media`.
//!
//! The picker itself holds no credentials; the access token belongs to the
//! browser session that ran the OAuth flow and is passed in per fetch.

use super::{DocumentFormat, IngestionError, DOCX_MIME, PDF_MIME};
use crate::config::DriveConfig;
use anyhow::{Context, Result};
use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;

/// MIME types the picker offers
pub const PICKER_MIME_TYPES: [&str; 2] = [PDF_MIME, DOCX_MIME];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata {
    #[serde(default)]
    name: String,
    mime_type: String,
}

/// A downloaded file ready for extraction
#[derive(Debug)]
pub struct PickedFile {
    pub name: String,
    pub format: DocumentFormat,
    pub bytes: Bytes,
}

pub struct DrivePicker {
    http: reqwest::Client,
    api_base: String,
}

impl DrivePicker {
    pub fn new(config: &DriveConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create Drive HTTP client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch a picked file with the session's access token. `None` for
    /// `file_id` means the picker was cancelled and yields `Ok(None)`.
    pub async fn fetch(
        &self,
        file_id: Option<&str>,
        access_token: Option<&str>,
    ) -> Result<Option<PickedFile>, IngestionError> {
        let Some(file_id) = file_id.map(str::trim).filter(|id| !id.is_empty()) else {
            tracing::debug!("Drive picker cancelled");
            return Ok(None);
        };

        if !file_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(IngestionError::Drive(format!("invalid file id: {}", file_id)));
        }

        let token = access_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(IngestionError::DriveUnauthorized)?;

        let url = format!("{}/files/{}", self.api_base, file_id);

        let metadata: FileMetadata = self
            .get(&url, token, &[("fields", "name,mimeType")])
            .await?
            .json()
            .await
            .map_err(|e| IngestionError::Drive(format!("bad metadata response: {}", e)))?;

        if !PICKER_MIME_TYPES.contains(&metadata.mime_type.as_str()) {
            return Err(IngestionError::Unsupported(metadata.mime_type));
        }
        let format = DocumentFormat::from_mime(&metadata.mime_type)
            .ok_or_else(|| IngestionError::Unsupported(metadata.mime_type.clone()))?;

        let bytes = self
            .get(&url, token, &[("alt", "media")])
            .await?
            .bytes()
            .await
            .map_err(|e| IngestionError::Drive(e.to_string()))?;

        tracing::info!(
            file = %metadata.name,
            format = %format,
            bytes = bytes.len(),
            "Downloaded file from Drive"
        );

        Ok(Some(PickedFile {
            name: metadata.name,
            format,
            bytes,
        }))
    }

    async fn get(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, IngestionError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| IngestionError::Drive(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(IngestionError::DriveUnauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestionError::Drive(format!(
                "HTTP {}: {}",
                status.as_u16(),
                crate::util::truncate_chars(&body, 200)
            )));
        }
        Ok(response)
    }
}
