//! PDF text and metadata extraction.
//!
//! Text comes from pdf-extract; document metadata (page count, Info
//! dictionary fields) is read with lopdf on a best-effort basis - a PDF
//! with a broken Info dictionary still ingests with its text alone.

use crate::types::{AppError, DocumentMetadata, Result};
use chrono::Utc;
use std::path::Path;
use tracing::debug;

/// Extracted text plus source metadata for one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedPdf {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Extracts text and metadata from PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Extract the full text of a PDF along with its metadata.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be parsed as a PDF at all; metadata
    /// fields that cannot be read are simply left empty.
    pub fn extract(path: &Path) -> Result<ExtractedPdf> {
        let text = pdf_extract::extract_text(path)
            .map_err(|e| AppError::Ingestion(format!("Failed to parse {}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let (page_count, title, author) = Self::document_info(path);

        debug!(
            file = %file_name,
            pages = page_count.unwrap_or(0),
            chars = text.len(),
            "extracted pdf"
        );

        Ok(ExtractedPdf {
            text,
            metadata: DocumentMetadata {
                title: title.unwrap_or_else(|| file_name.clone()),
                source: path.to_string_lossy().to_string(),
                author,
                page_count,
                created_at: Utc::now(),
                tags: Vec::new(),
            },
        })
    }

    /// Page count and Info dictionary fields, best-effort.
    fn document_info(path: &Path) -> (Option<usize>, Option<String>, Option<String>) {
        let Ok(doc) = lopdf::Document::load(path) else {
            return (None, None, None);
        };

        let page_count = Some(doc.get_pages().len());

        let info = doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| obj.as_reference().ok())
            .and_then(|id| doc.get_object(id).ok())
            .and_then(|obj| obj.as_dict().ok());

        let field = |name: &[u8]| {
            info.and_then(|dict| dict.get(name).ok())
                .and_then(|obj| obj.as_str().ok())
                .map(decode_pdf_string)
                .filter(|s| !s.trim().is_empty())
        };

        (page_count, field(b"Title"), field(b"Author"))
    }
}

/// Decode a PDF string: UTF-16BE when BOM-prefixed, Latin-ish bytes
/// otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&utf16)
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_bytes() {
        assert_eq!(decode_pdf_string(b"Simple Title"), "Simple Title");
    }

    #[test]
    fn decodes_utf16be_with_bom() {
        // "Hi" in UTF-16BE with BOM
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn missing_file_is_an_ingestion_error() {
        let result = PdfExtractor::extract(Path::new("/nonexistent/ghost.pdf"));
        assert!(matches!(result, Err(AppError::Ingestion(_))));
    }
}
