//! Column-aligned tables in the PDF text layer.

use tracing::{debug, warn};

use super::{BackendKind, RawTable, TableBackend};
use crate::document::{Document, PageRange};
use crate::error::BackendError;
use crate::models::result::DocumentKind;
use crate::models::table::TableMethod;
use crate::pdf::PdfProcessor;

/// Minimum cells for a line to belong to a table.
const MIN_LINE_CELLS: usize = 2;
/// Minimum consecutive table lines (header included).
const MIN_BLOCK_LINES: usize = 2;

/// Reads tables from the text layer of born-digital PDFs.
#[derive(Debug, Clone)]
pub struct TextLayerBackend {
    confidence: f32,
}

impl TextLayerBackend {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

impl TableBackend for TextLayerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::TextLayer
    }

    fn method(&self) -> TableMethod {
        TableMethod::TextLayer
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Pdf
    }

    fn extract(&self, document: &Document, pages: &PageRange) -> Result<Vec<RawTable>, BackendError> {
        let pdf = document.pdf().ok_or(BackendError::Unsupported {
            backend: BackendKind::TextLayer.as_str().to_string(),
            kind: document.kind().to_string(),
        })?;

        let mut tables = Vec::new();
        for page in pages.pages(document.page_count()) {
            match pdf.extract_page_text(page) {
                Ok(text) => {
                    let found = tables_from_text(&text, page);
                    debug!("Page {}: {} text-layer tables", page, found.len());
                    tables.extend(found);
                }
                Err(e) => warn!("No text layer on page {}: {}", page, e),
            }
        }
        Ok(tables)
    }
}

/// Split a line on tabs or runs of two or more whitespace characters.
pub fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0usize;

    let mut flush = |current: &mut String| {
        let cell = current.trim();
        if !cell.is_empty() {
            cells.push(cell.to_string());
        }
        current.clear();
    };

    for ch in trimmed.chars() {
        if ch == '\t' {
            flush(&mut current);
            whitespace_run = 0;
        } else if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                flush(&mut current);
            } else {
                current.push(' ');
            }
        } else {
            whitespace_run = 0;
            current.push(ch);
        }
    }
    flush(&mut current);

    cells
}

/// Blocks of consecutive multi-cell lines; the first line of a block is its header.
pub fn tables_from_text(text: &str, page: u32) -> Vec<RawTable> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let cells = split_line_into_cells(line);
        if cells.len() >= MIN_LINE_CELLS {
            block.push(cells);
        } else if !block.is_empty() {
            close_block(&mut block, page, &mut tables);
        }
    }
    close_block(&mut block, page, &mut tables);

    tables
}

fn close_block(block: &mut Vec<Vec<String>>, page: u32, tables: &mut Vec<RawTable>) {
    if block.len() >= MIN_BLOCK_LINES {
        tables.push(RawTable::from_matrix(page, std::mem::take(block)));
    } else {
        block.clear();
    }
}
