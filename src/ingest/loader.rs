//! Directory document loading.
//!
//! Discovers PDF, text, and markdown files under a directory tree and
//! extracts them into [`LoadedDocument`]s. A file that fails to parse is
//! logged and reported as skipped; it never aborts the batch.

use crate::ingest::captions::{CaptionRef, CaptionScanner};
use crate::ingest::pdf::PdfExtractor;
use crate::types::{AppError, DocumentMetadata, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// A source file extracted and ready for chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub captions: Vec<CaptionRef>,
}

/// A file the loader gave up on.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a directory load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<LoadedDocument>,
    pub skipped: Vec<SkippedFile>,
}

/// Loads documents from the filesystem.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load every supported document under `dir`, recursively.
    ///
    /// Supported: `.pdf`, `.txt`, `.md`. Files named `*_output.pdf` are
    /// artifacts of earlier annotation runs and are ignored.
    ///
    /// # Errors
    ///
    /// Fails only when `dir` is missing or not a directory; individual
    /// file failures land in the report's `skipped` list.
    pub fn load_from_directory(dir: impl AsRef<Path>) -> Result<LoadReport> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AppError::InvalidInput(format!(
                "Directory does not exist or is not a directory: {}",
                dir.display()
            )));
        }

        let mut files = Vec::new();
        Self::discover(dir, &mut files)?;
        files.sort();

        if files.is_empty() {
            warn!(dir = %dir.display(), "no documents found");
            return Ok(LoadReport::default());
        }

        let mut report = LoadReport::default();
        for path in files {
            match Self::load_file(&path) {
                Ok(doc) => report.documents.push(doc),
                Err(e) => {
                    error!(file = %path.display(), error = %e, "failed to load document");
                    report.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Load one file by extension.
    pub fn load_file(path: &Path) -> Result<LoadedDocument> {
        match extension_of(path).as_str() {
            "pdf" => {
                let extracted = PdfExtractor::extract(path)?;
                let captions = CaptionScanner::scan(&extracted.text);
                Ok(LoadedDocument {
                    content: extracted.text,
                    metadata: extracted.metadata,
                    captions,
                })
            }
            "txt" | "md" => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Ingestion(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let captions = CaptionScanner::scan(&content);
                Ok(LoadedDocument {
                    content,
                    metadata: DocumentMetadata {
                        title: file_name,
                        source: path.to_string_lossy().to_string(),
                        author: None,
                        page_count: None,
                        created_at: Utc::now(),
                        tags: Vec::new(),
                    },
                    captions,
                })
            }
            other => Err(AppError::InvalidInput(format!(
                "Unsupported file type '.{}': {}",
                other,
                path.display()
            ))),
        }
    }

    fn discover(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            AppError::Ingestion(format!("Failed to read directory {}: {}", dir.display(), e))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                AppError::Ingestion(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.is_dir() {
                Self::discover(&path, files)?;
                continue;
            }

            if !matches!(extension_of(&path).as_str(), "pdf" | "txt" | "md") {
                continue;
            }

            // Annotated copies produced by earlier runs.
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if name.ends_with("_output.pdf") {
                continue;
            }

            files.push(path);
        }

        Ok(())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_invalid_input() {
        let result = DocumentLoader::load_from_directory("/nonexistent/data");
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn empty_directory_yields_empty_report() {
        let dir = TempDir::new().unwrap();
        let report = DocumentLoader::load_from_directory(dir.path()).unwrap();
        assert!(report.documents.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn loads_text_files_recursively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.txt"), "alpha document").unwrap();
        fs::write(dir.path().join("nested/b.md"), "# beta document").unwrap();
        fs::write(dir.path().join("ignored.json"), "{}").unwrap();

        let report = DocumentLoader::load_from_directory(dir.path()).unwrap();

        assert_eq!(report.documents.len(), 2);
        assert!(report
            .documents
            .iter()
            .any(|d| d.content == "alpha document"));
        assert!(report
            .documents
            .iter()
            .any(|d| d.metadata.title == "b.md"));
    }

    #[test]
    fn skips_output_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("paper_output.pdf"), b"not a real pdf").unwrap();

        let report = DocumentLoader::load_from_directory(dir.path()).unwrap();
        assert!(report.documents.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn broken_pdf_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.txt"), "fine").unwrap();
        fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();

        let report = DocumentLoader::load_from_directory(dir.path()).unwrap();

        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("broken.pdf"));
    }

    #[test]
    fn text_document_metadata_points_at_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "some notes").unwrap();

        let doc = DocumentLoader::load_file(&path).unwrap();
        assert_eq!(doc.metadata.title, "notes.txt");
        assert_eq!(doc.metadata.source, path.to_string_lossy());
        assert!(doc.captions.is_empty());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.png");
        fs::write(&path, "png").unwrap();

        assert!(matches!(
            DocumentLoader::load_file(&path),
            Err(AppError::InvalidInput(_))
        ));
    }
}
