//! PDF loading, text layer and embedded page images.
//!
//! Pages are 1-based throughout. Text comes from `pdf-extract` for the whole
//! document and from a content stream walk per page, which keeps one output
//! line per text line so column gaps survive for the text-layer backend.

mod extractor;

pub use extractor::PdfExtractor;

use image::DynamicImage;

use crate::error::PdfError;

pub type Result<T> = std::result::Result<T, PdfError>;

/// What a PDF carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfType {
    /// Text layer only.
    Text,
    /// Page images only (a scan).
    Image,
    /// Text layer and images.
    Hybrid,
    /// Neither.
    Empty,
}

impl PdfType {
    /// Whether text-layer table extraction can work on this document.
    pub fn has_text_layer(&self) -> bool {
        matches!(self, PdfType::Text | PdfType::Hybrid)
    }
}

/// Read access to a loaded PDF.
pub trait PdfProcessor {
    fn load(&mut self, data: &[u8]) -> Result<()>;

    fn page_count(&self) -> u32;

    /// Classify by text length and embedded images.
    fn analyze(&self) -> PdfType;

    /// Text of the whole document.
    fn extract_text(&self) -> Result<String>;

    /// Text of one page, one text line per output line.
    fn extract_page_text(&self, page: u32) -> Result<String>;

    /// Images embedded in one page.
    fn extract_images(&self, page: u32) -> Result<Vec<DynamicImage>>;
}
