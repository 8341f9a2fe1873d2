//! Worksheets read with calamine, one table per non-empty sheet.

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, warn};

use super::{BackendKind, RawTable, TableBackend};
use crate::document::{Document, PageRange};
use crate::error::BackendError;
use crate::models::result::DocumentKind;
use crate::models::table::{CellValue, TableMethod};

#[derive(Debug, Clone)]
pub struct SpreadsheetBackend {
    confidence: f32,
}

impl SpreadsheetBackend {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

impl TableBackend for SpreadsheetBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Spreadsheet
    }

    fn method(&self) -> TableMethod {
        TableMethod::Spreadsheet
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Spreadsheet
    }

    fn extract(&self, document: &Document, pages: &PageRange) -> Result<Vec<RawTable>, BackendError> {
        let mut workbook = open_workbook_auto(document.path())
            .map_err(|e| BackendError::extraction("spreadsheet", e.to_string()))?;

        let mut tables = Vec::new();
        let sheet_names = workbook.sheet_names().to_vec();
        for (index, name) in sheet_names.iter().enumerate() {
            let page = index as u32 + 1;
            if !pages.contains(page) {
                continue;
            }

            let range = match workbook.worksheet_range(name) {
                Ok(range) => range,
                Err(e) => {
                    warn!("Cannot read sheet '{}': {}", name, e);
                    continue;
                }
            };

            let mut rows: Vec<Vec<CellValue>> = range
                .rows()
                .map(|row| row.iter().map(cell_value).collect::<Vec<_>>())
                .filter(|row| row.iter().any(|c| !c.is_empty()))
                .collect();
            if rows.is_empty() {
                debug!("Sheet '{}' is empty", name);
                continue;
            }

            let headers = rows.remove(0).iter().map(CellValue::as_text).collect();
            debug!("Sheet '{}': {} data rows", name, rows.len());
            tables.push(RawTable::new(page, headers, rows));
        }

        Ok(tables)
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::String(s) => CellValue::from_text(s.as_str()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Text(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
