//! Content ingestion: uploaded files to plain text
//!
//! Each supported format implements [`TextExtractor`]; [`extractor_for`]
//! picks one from the detected [`DocumentFormat`]. Output is flat text only,
//! ready to be appended to a session's input buffer.

pub mod docx;
pub mod drive;
pub mod pdf;

pub use drive::DrivePicker;

use std::fmt;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "text",
        }
    }

    /// Format from a file name's extension
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".docx") {
            Some(Self::Docx)
        } else if lower.ends_with(".txt") || lower.ends_with(".md") || lower.ends_with(".text") {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    /// Format from a MIME type; only the picker's scope is recognized
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match mime.as_str() {
            PDF_MIME => Some(Self::Pdf),
            DOCX_MIME => Some(Self::Docx),
            "text/plain" | "text/markdown" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Format from magic bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if data.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum IngestionError {
    /// Nothing usable was extracted
    Empty,
    Unsupported(String),
    Parse {
        format: DocumentFormat,
        message: String,
    },
    /// The file picker needs an access token first
    DriveUnauthorized,
    Drive(String),
}

impl fmt::Display for IngestionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no text could be extracted from the file"),
            Self::Unsupported(what) => write!(f, "unsupported file type: {}", what),
            Self::Parse { format, message } => {
                write!(f, "failed to read {} file: {}", format, message)
            }
            Self::DriveUnauthorized => write!(f, "Google Drive access token missing"),
            Self::Drive(msg) => write!(f, "Google Drive error: {}", msg),
        }
    }
}

impl std::error::Error for IngestionError {}

pub trait TextExtractor {
    /// Extract flat text from raw file bytes
    fn extract(&self, data: &[u8]) -> Result<String, IngestionError>;

    fn format(&self) -> DocumentFormat;
}

pub fn extractor_for(format: DocumentFormat) -> Box<dyn TextExtractor> {
    match format {
        DocumentFormat::Pdf => Box::new(pdf::PdfExtractor),
        DocumentFormat::Docx => Box::new(docx::DocxExtractor::default()),
        DocumentFormat::PlainText => Box::new(PlainTextExtractor),
    }
}

/// Decide a format from magic bytes, then the file name, then UTF-8 validity
pub fn detect_format(filename: Option<&str>, data: &[u8]) -> Option<DocumentFormat> {
    DocumentFormat::sniff(data)
        .or_else(|| filename.and_then(DocumentFormat::from_filename))
        .or_else(|| {
            std::str::from_utf8(data)
                .is_ok()
                .then_some(DocumentFormat::PlainText)
        })
}

/// Extract text from an uploaded file. CPU bound; call from a blocking task.
pub fn extract_text(filename: Option<&str>, data: &[u8]) -> Result<String, IngestionError> {
    if data.is_empty() {
        return Err(IngestionError::Empty);
    }

    let format = detect_format(filename, data)
        .ok_or_else(|| IngestionError::Unsupported(filename.unwrap_or("binary data").to_string()))?;
    extract_as(format, data)
}

/// Extract with a format already known from the source, e.g. Drive's MIME type
pub fn extract_as(format: DocumentFormat, data: &[u8]) -> Result<String, IngestionError> {
    if data.is_empty() {
        return Err(IngestionError::Empty);
    }

    let text = extractor_for(format).extract(data)?;
    if text.trim().is_empty() {
        return Err(IngestionError::Empty);
    }

    tracing::debug!(
        format = %format,
        bytes = data.len(),
        chars = text.chars().count(),
        "Extracted document text"
    );
    Ok(text)
}

struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, data: &[u8]) -> Result<String, IngestionError> {
        let text = String::from_utf8_lossy(data);
        Ok(text.trim_start_matches('\u{FEFF}').replace("\r\n", "\n"))
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::PlainText
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_by_magic_before_extension() {
        assert_eq!(detect_format(Some("notes.txt"), b"%PDF-1.7 ..."), Some(DocumentFormat::Pdf));
        assert_eq!(detect_format(None, b"PK\x03\x04rest"), Some(DocumentFormat::Docx));
    }

    #[test]
    fn detect_by_extension_and_text() {
        assert_eq!(DocumentFormat::from_filename("Book.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_filename("essay.docx"), Some(DocumentFormat::Docx));
        assert_eq!(detect_format(Some("readme.md"), b"# hi"), Some(DocumentFormat::PlainText));
        assert_eq!(detect_format(None, "plain ñ".as_bytes()), Some(DocumentFormat::PlainText));
        assert_eq!(detect_format(Some("image.png"), &[0xFF, 0xD8, 0xFF, 0xE0]), None);
    }

    #[test]
    fn detect_from_mime() {
        assert_eq!(DocumentFormat::from_mime(PDF_MIME), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_mime(DOCX_MIME), Some(DocumentFormat::Docx));
        assert_eq!(
            DocumentFormat::from_mime("text/plain; charset=utf-8"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(DocumentFormat::from_mime("image/png"), None);
    }

    #[test]
    fn plain_text_passthrough() {
        let text = extract_text(Some("a.txt"), b"\xEF\xBB\xBFline one\r\nline two").unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn empty_and_unsupported_inputs() {
        assert!(matches!(extract_text(Some("a.txt"), b""), Err(IngestionError::Empty)));
        assert!(matches!(extract_text(Some("a.txt"), b"  \n "), Err(IngestionError::Empty)));
        assert!(matches!(
            extract_text(Some("photo.jpg"), &[0xFF, 0xD8, 0xFF]),
            Err(IngestionError::Unsupported(_))
        ));
    }

    #[test]
    fn known_format_skips_detection() {
        // Looks like a PDF by magic bytes and name, but the source says text
        let data = b"%PDF is where every header starts";
        assert!(matches!(
            extract_text(Some("notes.pdf"), data),
            Err(IngestionError::Parse { .. })
        ));
        assert_eq!(
            extract_as(DocumentFormat::PlainText, data).unwrap(),
            "%PDF is where every header starts"
        );
        assert!(matches!(
            extract_as(DocumentFormat::Docx, b""),
            Err(IngestionError::Empty)
        ));
    }
}
