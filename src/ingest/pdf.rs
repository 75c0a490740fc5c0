//! PDF text extraction backed by `pdf-extract`

use super::{DocumentFormat, IngestionError, TextExtractor};

pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, data: &[u8]) -> Result<String, IngestionError> {
        let text = pdf_extract::extract_text_from_mem(data).map_err(|e| IngestionError::Parse {
            format: DocumentFormat::Pdf,
            message: e.to_string(),
        })?;

        // Form feeds separate pages in the extracted text
        Ok(text.replace('\x0C', "\n").trim().to_string())
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export_pdf;
    use crate::export::pdf::write_pages;
    use crate::models::CourseAnalysis;

    #[test]
    fn rejects_non_pdf_bytes() {
        let result = PdfExtractor.extract(b"This is not a PDF");
        assert!(matches!(
            result,
            Err(IngestionError::Parse {
                format: DocumentFormat::Pdf,
                ..
            })
        ));
    }

    #[test]
    fn extracts_text_from_generated_pdf() {
        let bytes = write_pages(&[vec!["Photosynthesis converts light".to_string()]]).unwrap();
        let text = PdfExtractor.extract(&bytes).unwrap();
        assert!(text.contains("Photosynthesis"));
    }

    #[test]
    fn non_latin_export_reads_back() {
        let analysis = CourseAnalysis::raw_text(
            "Клетка",
            "Митохондрия производит энергию. Σ = 1".to_string(),
        );
        let bytes = export_pdf(&analysis).unwrap();
        let text = PdfExtractor.extract(&bytes).unwrap();

        assert!(!text.contains('?'));
        assert!(text.contains("КЛЕТКА"));
        for word in ["Митохондрия", "производит", "энергию.", "Σ"] {
            assert!(text.contains(word), "missing {word:?} in {text:?}");
        }
    }
}
