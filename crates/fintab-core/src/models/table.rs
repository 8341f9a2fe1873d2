//! Canonical table record shared by every extraction backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Extraction method that produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMethod {
    /// Hough line detection on the page image.
    LineDetection,
    /// Morphology and projection profile on the page image.
    GridDetection,
    /// Rectangular contour detection on the page image.
    ContourDetection,
    /// Column alignment in the PDF text layer.
    TextLayer,
    /// Worksheet read from a spreadsheet file.
    Spreadsheet,
    /// Delimited text file (CSV, TSV, ...).
    Delimited,
    /// Lineless table rebuilt from OCR word positions.
    Ocr,
}

impl TableMethod {
    /// Stable snake_case name, used in table ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableMethod::LineDetection => "line_detection",
            TableMethod::GridDetection => "grid_detection",
            TableMethod::ContourDetection => "contour_detection",
            TableMethod::TextLayer => "text_layer",
            TableMethod::Spreadsheet => "spreadsheet",
            TableMethod::Delimited => "delimited",
            TableMethod::Ocr => "ocr",
        }
    }
}

impl fmt::Display for TableMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Financial role of a table, assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    /// Holdings list (securities, ISINs, quantities, values).
    Portfolio,
    /// Breakdown by asset class.
    AssetAllocation,
    /// Revenue / expense statement.
    IncomeStatement,
    /// Assets / liabilities statement.
    BalanceSheet,
    /// Not recognized.
    #[default]
    Unknown,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Portfolio => "portfolio",
            TableType::AssetAllocation => "asset_allocation",
            TableType::IncomeStatement => "income_statement",
            TableType::BalanceSheet => "balance_sheet",
            TableType::Unknown => "unknown",
        }
    }

    /// Whether this is a financial statement table.
    pub fn is_statement(&self) -> bool {
        matches!(self, TableType::IncomeStatement | TableType::BalanceSheet)
    }
}

/// A single cell value: text, number, or nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric value (spreadsheet numbers).
    Number(f64),
    /// Text value.
    Text(String),
    /// Empty cell.
    #[default]
    Empty,
}

impl CellValue {
    /// Build a cell from text; blank text becomes `Empty`.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else if trimmed.len() == text.len() {
            CellValue::Text(text)
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    /// Whether the cell holds no value.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Numeric view of the cell, parsing text with [`crate::securities::parse_number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => crate::securities::parse_number(s),
            CellValue::Empty => None,
        }
    }

    /// Text view of the cell.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::from_text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::from_text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Canonical table record.
///
/// Rows may be ragged: `rows[i].len()` need not equal `headers.len()`.
/// Use [`TableRecord::cell`] for bounds-checked access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    /// Identifier, unique within a document.
    pub id: String,

    /// Page number (1-based; sheet index for spreadsheets).
    pub page: u32,

    /// Extraction method.
    pub method: TableMethod,

    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,

    /// Header row.
    pub headers: Vec<String>,

    /// Data rows.
    pub rows: Vec<Vec<CellValue>>,

    /// Region on the page, when the backend knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    /// Financial role assigned by the classifier.
    #[serde(default)]
    pub table_type: TableType,
}

impl TableRecord {
    /// Create a record; confidence is clamped into [0, 1].
    pub fn new(
        id: impl Into<String>,
        page: u32,
        method: TableMethod,
        confidence: f32,
        headers: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            id: id.into(),
            page: page.max(1),
            method,
            confidence,
            headers,
            rows,
            bbox: None,
            table_type: TableType::Unknown,
        }
    }

    /// Attach a bounding box.
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Cell at a data row / column, `None` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Header text at a column, `None` when out of range.
    pub fn header(&self, col: usize) -> Option<&str> {
        self.headers.get(col).map(String::as_str)
    }

    /// Number of rows including the header row.
    pub fn row_count(&self) -> usize {
        self.rows.len() + usize::from(!self.headers.is_empty())
    }

    /// Widest row (headers included).
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    /// Index of the first header containing any of the given keywords (case-insensitive).
    pub fn find_column(&self, keywords: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| {
            let h = h.to_lowercase();
            keywords.iter().any(|k| h.contains(k))
        })
    }

    /// Row joined into a single line, for context strings.
    pub fn row_text(&self, row: usize) -> String {
        self.rows
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .map(CellValue::as_text)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .unwrap_or_default()
    }
}
