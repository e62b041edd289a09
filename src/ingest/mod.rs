//! Document ingestion: discovery, extraction, caption detection.
//!
//! The loader walks a directory for PDF/text/markdown sources, pulls text
//! and metadata out of each, and scans for figure/table captions. Parsing
//! failures are per-file: one broken PDF never sinks a batch.

pub mod captions;
pub mod loader;
pub mod pdf;

pub use captions::{CaptionKind, CaptionRef, CaptionScanner};
pub use loader::{DocumentLoader, LoadReport, LoadedDocument, SkippedFile};
pub use pdf::{ExtractedPdf, PdfExtractor};
