//! Document ingestion for PageRush
//!
//! This crate takes the files a student selects, decides which of them can be
//! read, pulls plain text out of them and reports how the batch went.
//!
//! # Features
//!
//! - Lenient format detection by MIME type or file extension (PDF, DOCX,
//!   Markdown, plain text)
//! - Duplicate-aware selection handling
//! - Page-ordered PDF extraction and raw DOCX text extraction behind
//!   swappable parser backends
//! - Sequential batch processing with per-file failure isolation, progress
//!   callbacks and cooperative cancellation
//! - Text export helpers and an owner-scoped document library interface

pub mod batch;
pub mod config;
pub mod export;
pub mod extractors;
pub mod format;
pub mod library;
pub mod selection;

// Re-exports
pub use batch::{
    BatchController, BatchObserver, BatchOutcome, BatchReport, BatchSummary,
    ExtractionOutcome, ExtractionResult, NoopObserver, ProcessedFile, Progress,
};
pub use config::BatchConfig;
pub use export::{
    combined_export, combined_export_file_name, export_file_name, unique_export_file_names,
    ExportEntry,
};
pub use extractors::{
    ContentExtractor, DocxBackend, DocxExtractor, DocxRsBackend, LopdfBackend,
    MarkdownExtractor, PdfBackend, PdfExtractor, PdfPages, PlainTextExtractor, TextExtractor,
};
pub use format::{classify, FormatKind};
pub use library::{
    DocumentLibrary, DocumentPatch, InMemoryLibrary, LibraryError, NewDocument, StoredDocument,
};
pub use selection::{admit, Admission, CandidateFile, FileSource, PendingFile, Selection};

/// Why a single file produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExtractionErrorKind {
    /// The file parsed but held no usable text.
    EmptyContent,
    /// The underlying parser or reader raised an error.
    LibraryFailure,
}

impl std::fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionErrorKind::EmptyContent => write!(f, "empty content"),
            ExtractionErrorKind::LibraryFailure => write!(f, "library failure"),
        }
    }
}

/// Failure to extract text from one file.
///
/// `detail` is free-form text, usually carrying the parser's own message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub detail: String,
}

impl ExtractionError {
    pub fn empty_content(detail: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::EmptyContent,
            detail: detail.into(),
        }
    }

    pub fn library_failure(detail: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::LibraryFailure,
            detail: detail.into(),
        }
    }
}

/// Error types for ingestion operations
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Please select at least one file")]
    EmptySelection,

    #[error("A batch is already being processed")]
    BatchInProgress,

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestionError::EmptySelection;
        assert!(err.to_string().contains("at least one file"));

        let err = IngestionError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        assert_eq!(err.to_string(), "IO error: no such file");
    }

    #[test]
    fn test_extraction_error_constructors() {
        let err = ExtractionError::empty_content("nothing here");
        assert_eq!(err.kind, ExtractionErrorKind::EmptyContent);

        let err = ExtractionError::library_failure("boom");
        assert_eq!(err.kind, ExtractionErrorKind::LibraryFailure);
        assert_eq!(err.kind.to_string(), "library failure");
    }
}
