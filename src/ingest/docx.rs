//! DOCX raw text extraction
//!
//! Reads `word/document.xml` out of the zip container and walks it with
//! `roxmltree`. Only run text (`w:t`) is kept; paragraph ends, breaks and
//! tabs become whitespace. Field instructions, tracked deletions, property
//! blocks and markup-compatibility fallbacks are skipped so the result reads
//! like the rendered document.

use super::{DocumentFormat, IngestionError, TextExtractor};
use roxmltree::{Edge, Node, NodeId};
use std::io::{Cursor, Read};

const DOCUMENT_PART: &str = "word/document.xml";

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const COMPAT_NS: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// Largest uncompressed `word/document.xml` accepted
pub const MAX_DOCUMENT_XML_BYTES: u64 = 64 * 1024 * 1024;

/// WordprocessingML elements whose subtree never contributes visible text
const SKIPPED: &[&str] = &[
    "del",
    "delText",
    "instrText",
    "pPr",
    "rPr",
    "sectPr",
    "footnoteReference",
    "commentReference",
];

pub struct DocxExtractor {
    max_part_bytes: u64,
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::with_limit(MAX_DOCUMENT_XML_BYTES)
    }
}

impl DocxExtractor {
    pub fn with_limit(max_part_bytes: u64) -> Self {
        Self { max_part_bytes }
    }

    fn read_document_part(&self, data: &[u8]) -> Result<String, IngestionError> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(data)).map_err(|e| parse_error(e.to_string()))?;

        let part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| parse_error(format!("{}: {}", DOCUMENT_PART, e)))?;

        // The declared size can lie; the bounded read below is what holds
        if part.size() > self.max_part_bytes {
            return Err(self.too_large(part.size()));
        }

        let mut xml = String::new();
        part.take(self.max_part_bytes + 1)
            .read_to_string(&mut xml)
            .map_err(|e| parse_error(e.to_string()))?;

        if xml.len() as u64 > self.max_part_bytes {
            return Err(self.too_large(xml.len() as u64));
        }
        Ok(xml)
    }

    fn too_large(&self, size: u64) -> IngestionError {
        parse_error(format!(
            "{} is larger than the {} byte limit ({} bytes)",
            DOCUMENT_PART, self.max_part_bytes, size
        ))
    }
}

fn parse_error(message: String) -> IngestionError {
    IngestionError::Parse {
        format: DocumentFormat::Docx,
        message,
    }
}

fn is_word(node: Node, local: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(WORD_NS) && node.tag_name().name() == local
}

fn is_skipped(node: Node) -> bool {
    if !node.is_element() {
        return false;
    }
    let name = node.tag_name();
    match name.namespace() {
        Some(WORD_NS) => SKIPPED.iter().any(|skipped| *skipped == name.name()),
        Some(COMPAT_NS) => name.name() == "Fallback",
        _ => false,
    }
}

fn xml_to_text(xml: &str) -> Result<String, IngestionError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| parse_error(e.to_string()))?;

    let mut out = String::new();
    let mut skipping: Option<NodeId> = None;

    for edge in doc.root().traverse() {
        match edge {
            Edge::Open(node) => {
                if skipping.is_some() {
                    continue;
                }
                if is_skipped(node) {
                    skipping = Some(node.id());
                } else if node.is_text() {
                    if node.parent().is_some_and(|p| is_word(p, "t")) {
                        out.push_str(node.text().unwrap_or_default());
                    }
                } else if is_word(node, "tab") {
                    out.push('\t');
                } else if is_word(node, "br") || is_word(node, "cr") {
                    out.push('\n');
                }
            }
            Edge::Close(node) => {
                if skipping == Some(node.id()) {
                    skipping = None;
                } else if skipping.is_none() && is_word(node, "p") {
                    out.push('\n');
                }
            }
        }
    }

    Ok(out.trim().to_string())
}

impl TextExtractor for DocxExtractor {
    fn extract(&self, data: &[u8]) -> Result<String, IngestionError> {
        let xml = self.read_document_part(data)?;
        xml_to_text(&xml)
    }

    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn docx_with(part: &str, xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file(part, options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn body(paragraphs: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="{}" xmlns:mc="{}"><w:body>{}</w:body></w:document>"#
            ),
            WORD_NS, COMPAT_NS, paragraphs
        )
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
    }

    #[test]
    fn paragraphs_become_lines() {
        let xml = body(
            r#"
<w:p><w:r><w:t>Chapter 1</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Cats &amp; dogs</w:t><w:tab/><w:t>end</w:t></w:r></w:p>
<w:p><w:r><w:t>line</w:t><w:br/><w:t>break &#x3A9;</w:t></w:r></w:p>
"#,
        );

        let text = DocxExtractor::default().extract(&docx_with(DOCUMENT_PART, &xml)).unwrap();
        assert_eq!(lines(&text), vec!["Chapter 1", "Cats & dogs\tend", "line", "break Ω"]);
    }

    #[test]
    fn fields_and_deletions_are_not_text() {
        let xml = body(
            r#"
<w:p>
  <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
  <w:r><w:t xml:space="preserve">Page </w:t></w:r>
  <w:r><w:fldChar w:fldCharType="begin"/></w:r>
  <w:r><w:instrText xml:space="preserve"> PAGE \* MERGEFORMAT </w:instrText></w:r>
  <w:r><w:fldChar w:fldCharType="separate"/></w:r>
  <w:r><w:t>3</w:t></w:r>
  <w:r><w:fldChar w:fldCharType="end"/></w:r>
  <w:del w:id="1" w:author="Ann"><w:r><w:delText>removed draft sentence</w:delText></w:r></w:del>
  <w:ins w:id="2" w:author="Ann"><w:r><w:t xml:space="preserve"> of 9</w:t></w:r></w:ins>
</w:p>
<w:p><mc:AlternateContent>
  <mc:Choice Requires="wps"><w:r><w:t>Shape text</w:t></w:r></mc:Choice>
  <mc:Fallback><w:r><w:t>Shape text</w:t></w:r></mc:Fallback>
</mc:AlternateContent></w:p>
"#,
        );

        let text = DocxExtractor::default().extract(&docx_with(DOCUMENT_PART, &xml)).unwrap();
        assert_eq!(lines(&text), vec!["Page 3 of 9", "Shape text"]);
    }

    #[test]
    fn oversized_document_part_is_rejected() {
        let xml = body(&"<w:p><w:r><w:t>filler</w:t></w:r></w:p>".repeat(50));
        let bytes = docx_with(DOCUMENT_PART, &xml);

        let err = DocxExtractor::with_limit(256).extract(&bytes).unwrap_err();
        assert!(matches!(
            &err,
            IngestionError::Parse {
                format: DocumentFormat::Docx,
                message,
            } if message.contains("limit")
        ));
        assert!(DocxExtractor::with_limit(xml.len() as u64).extract(&bytes).is_ok());
    }

    #[test]
    fn missing_document_part_is_an_error() {
        let bytes = docx_with("word/other.xml", "<w:p/>");
        assert!(matches!(
            DocxExtractor::default().extract(&bytes),
            Err(IngestionError::Parse {
                format: DocumentFormat::Docx,
                ..
            })
        ));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let bytes = docx_with(DOCUMENT_PART, "<w:document><w:body>");
        assert!(matches!(
            DocxExtractor::default().extract(&bytes),
            Err(IngestionError::Parse { .. })
        ));
    }

    #[test]
    fn not_a_zip_is_an_error() {
        assert!(DocxExtractor::default().extract(b"plain words").is_err());
    }
}
