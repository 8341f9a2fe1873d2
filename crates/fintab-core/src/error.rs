//! Error types for the fintab-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the fintab library.
///
/// Only document-level failures surface through this type. Per-backend,
/// per-table and per-cell failures are contained where they happen.
#[derive(Error, Debug)]
pub enum FintabError {
    /// Document could not be opened or recognized.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Table backend error.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// OCR capability error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Fatal input errors. These abort processing of a single document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The input file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension is not one of the supported formats.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The document exists but no content can be read from it.
    #[error("unreadable document: {0}")]
    Unreadable(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors raised by a single table backend call.
///
/// The collector logs these and treats the call as having produced no tables.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend does not handle this kind of document.
    #[error("{backend} does not support {kind} documents")]
    Unsupported { backend: String, kind: String },

    /// The backend failed while reading the document.
    #[error("{backend} failed: {reason}")]
    Extraction { backend: String, reason: String },

    /// PDF-level failure inside a backend.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// OCR failure that prevented a whole page from being processed.
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl BackendError {
    /// Shorthand for an extraction failure.
    pub fn extraction(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Extraction {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from the OCR capability.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configured regex pattern does not compile.
    #[error("invalid pattern for {name}: {reason}")]
    Pattern { name: String, reason: String },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Result type for the fintab library.
pub type Result<T> = std::result::Result<T, FintabError>;
