//! Input documents: file type detection and loading.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::DynamicImage;
use tracing::{debug, info};

use crate::error::{ConfigError, DocumentError, Result};
use crate::models::result::DocumentKind;
use crate::pdf::{PdfExtractor, PdfProcessor, PdfType};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv"];

/// Document kind from the file extension (case-insensitive).
pub fn detect_kind(path: &Path) -> std::result::Result<DocumentKind, DocumentError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))?;

    if ext == "pdf" {
        Ok(DocumentKind::Pdf)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(DocumentKind::Image)
    } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        Ok(DocumentKind::Spreadsheet)
    } else if DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(DocumentKind::Delimited)
    } else {
        Err(DocumentError::UnsupportedFormat(format!(".{}", ext)))
    }
}

/// Inclusive, 1-based page range. `end: None` means "to the last page".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl PageRange {
    /// Every page.
    pub fn all() -> Self {
        Self { start: 1, end: None }
    }

    /// Pages `start..=end`.
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: start.max(1),
            end: Some(end.max(start.max(1))),
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        page >= self.start && self.end.is_none_or(|end| page <= end)
    }

    /// Pages of a `page_count`-page document inside the range.
    pub fn pages(&self, page_count: u32) -> std::ops::RangeInclusive<u32> {
        let end = self.end.map_or(page_count, |e| e.min(page_count));
        self.start..=end
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

impl FromStr for PageRange {
    type Err = ConfigError;

    /// Accepts `3`, `1-3` and `2-` (open end).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ConfigError::Parse(format!("invalid page range '{}'", s));
        let parse = |v: &str| v.trim().parse::<u32>().ok().filter(|p| *p > 0).ok_or_else(invalid);

        match s.split_once('-') {
            None => {
                let page = parse(s)?;
                Ok(Self::new(page, page))
            }
            Some((start, end)) if end.trim().is_empty() => Ok(Self {
                start: parse(start)?,
                end: None,
            }),
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if end < start {
                    return Err(invalid());
                }
                Ok(Self::new(start, end))
            }
        }
    }
}

enum Content {
    Pdf(Box<PdfExtractor>),
    Image(DynamicImage),
    /// Read lazily by the backend that handles it.
    File,
}

/// An opened input document.
pub struct Document {
    path: PathBuf,
    kind: DocumentKind,
    page_count: u32,
    content: Content,
}

impl Document {
    /// Open a document, failing on missing, unsupported or unreadable files.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocumentError::NotFound(path.to_path_buf()).into());
        }
        let kind = detect_kind(path)?;

        let (content, page_count) = match kind {
            DocumentKind::Pdf => {
                let data = std::fs::read(path)?;
                let pdf = PdfExtractor::from_bytes(&data)
                    .map_err(|e| DocumentError::Unreadable(format!("{}: {}", path.display(), e)))?;
                let pages = pdf.page_count();
                (Content::Pdf(Box::new(pdf)), pages)
            }
            DocumentKind::Image => {
                let image = image::open(path)
                    .map_err(|e| DocumentError::Unreadable(format!("{}: {}", path.display(), e)))?;
                (Content::Image(image), 1)
            }
            DocumentKind::Spreadsheet => (Content::File, spreadsheet_sheet_count(path)?),
            DocumentKind::Delimited => (Content::File, 1),
        };

        info!("Opened {} ({}, {} pages)", path.display(), kind, page_count);
        Ok(Self {
            path: path.to_path_buf(),
            kind,
            page_count,
            content,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Pages for PDFs, sheets for spreadsheets, 1 otherwise.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// The loaded PDF, for PDF documents.
    pub fn pdf(&self) -> Option<&PdfExtractor> {
        match &self.content {
            Content::Pdf(pdf) => Some(pdf.as_ref()),
            _ => None,
        }
    }

    /// The decoded image, for image documents.
    pub fn image(&self) -> Option<&DynamicImage> {
        match &self.content {
            Content::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Page images in the range: the image itself, or each PDF page's
    /// embedded images (scanned pages).
    pub fn page_images(&self, pages: &PageRange) -> Vec<(u32, DynamicImage)> {
        match &self.content {
            Content::Image(image) if pages.contains(1) => vec![(1, image.clone())],
            Content::Pdf(pdf) => pages
                .pages(self.page_count)
                .flat_map(|page| {
                    let images = pdf.extract_images(page).unwrap_or_else(|e| {
                        debug!("No images on page {}: {}", page, e);
                        Vec::new()
                    });
                    images.into_iter().map(move |img| (page, img))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Text layer of one PDF page.
    pub fn page_text(&self, page: u32) -> Option<String> {
        self.pdf().and_then(|pdf| pdf.extract_page_text(page).ok())
    }

    /// Full PDF text layer, empty for other kinds.
    pub fn text_layer(&self) -> String {
        self.pdf()
            .and_then(|pdf| pdf.extract_text().ok())
            .unwrap_or_default()
    }

    /// PDF content analysis, `None` for other kinds.
    pub fn pdf_type(&self) -> Option<PdfType> {
        self.pdf().map(|pdf| pdf.analyze())
    }
}

#[cfg(feature = "spreadsheet")]
fn spreadsheet_sheet_count(path: &Path) -> Result<u32> {
    use calamine::{open_workbook_auto, Reader};

    let workbook = open_workbook_auto(path)
        .map_err(|e| DocumentError::Unreadable(format!("{}: {}", path.display(), e)))?;
    Ok(workbook.sheet_names().len().max(1) as u32)
}

#[cfg(not(feature = "spreadsheet"))]
fn spreadsheet_sheet_count(_path: &Path) -> Result<u32> {
    Ok(1)
}
