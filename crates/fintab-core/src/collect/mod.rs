//! Multi-backend table collection.
//!
//! Every backend turns a [`Document`] into [`RawTable`]s. The collector
//! decides once which backends can run ([`available_backends`]), calls each
//! supporting backend over the requested pages, contains backend failures
//! and normalizes the output into [`TableRecord`]s.

mod delimited;
mod image;
#[cfg(feature = "spreadsheet")]
mod spreadsheet;
mod text_layer;

pub use self::delimited::{sniff_delimiter, DelimitedBackend};
pub use self::image::ImagePipelineBackend;
#[cfg(feature = "spreadsheet")]
pub use self::spreadsheet::SpreadsheetBackend;
pub use self::text_layer::{split_line_into_cells, tables_from_text, TextLayerBackend};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{Document, PageRange};
use crate::error::BackendError;
use crate::geometry::BoundingBox;
use crate::models::config::{CollectorConfig, FintabConfig};
use crate::models::result::DocumentKind;
use crate::models::table::{CellValue, TableMethod, TableRecord};
use crate::ocr::OcrProvider;

/// Table extraction backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Column-aligned text in the PDF text layer.
    TextLayer,
    /// Worksheets (calamine).
    Spreadsheet,
    /// CSV / TSV files.
    Delimited,
    /// Region detection and cell OCR on page images.
    ImagePipeline,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::TextLayer,
        BackendKind::Spreadsheet,
        BackendKind::Delimited,
        BackendKind::ImagePipeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::TextLayer => "text_layer",
            BackendKind::Spreadsheet => "spreadsheet",
            BackendKind::Delimited => "delimited",
            BackendKind::ImagePipeline => "image_pipeline",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table as returned by a backend, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub page: u32,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    pub bbox: Option<BoundingBox>,
    /// Overrides the backend's default method.
    pub method: Option<TableMethod>,
    /// Overrides the backend's default confidence.
    pub confidence: Option<f32>,
}

impl RawTable {
    pub fn new(page: u32, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            page,
            headers,
            rows,
            bbox: None,
            method: None,
            confidence: None,
        }
    }

    /// Split a text matrix into header row and data rows.
    pub fn from_matrix(page: u32, mut matrix: Vec<Vec<String>>) -> Self {
        let headers = if matrix.is_empty() {
            Vec::new()
        } else {
            matrix.remove(0).into_iter().map(|h| h.trim().to_string()).collect()
        };
        let rows = matrix
            .into_iter()
            .map(|row| row.into_iter().map(CellValue::from_text).collect())
            .collect();
        Self::new(page, headers, rows)
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_method(mut self, method: TableMethod, confidence: f32) -> Self {
        self.method = Some(method);
        self.confidence = Some(confidence);
        self
    }
}

/// A source of tables.
pub trait TableBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Method recorded on tables that do not override it.
    fn method(&self) -> TableMethod;

    /// Confidence recorded on tables that do not override it.
    fn confidence(&self) -> f32;

    /// Whether the backend reads this kind of document.
    fn supports(&self, kind: DocumentKind) -> bool;

    /// Extract raw tables from the pages in `pages`.
    fn extract(&self, document: &Document, pages: &PageRange) -> Result<Vec<RawTable>, BackendError>;
}

/// Backends that can run with this configuration and build.
///
/// Disabled and unavailable backends are logged here, once.
pub fn available_backends(config: &CollectorConfig, ocr_present: bool) -> BTreeSet<BackendKind> {
    let mut available = BTreeSet::new();

    for kind in BackendKind::ALL {
        if !config.backends.contains(&kind) {
            info!("{} backend disabled by configuration", kind);
            continue;
        }
        match kind {
            BackendKind::Spreadsheet if !cfg!(feature = "spreadsheet") => {
                warn!("{} backend unavailable: built without the `spreadsheet` feature", kind);
            }
            BackendKind::ImagePipeline if !ocr_present => {
                warn!("{} backend unavailable: no OCR provider", kind);
            }
            _ => {
                available.insert(kind);
            }
        }
    }

    debug!("Available backends: {:?}", available);
    available
}

/// Runs every available backend and normalizes their tables.
pub struct TableCollector {
    config: CollectorConfig,
    available: BTreeSet<BackendKind>,
    backends: Vec<Box<dyn TableBackend>>,
}

impl TableCollector {
    /// Build the collector, probing backend availability once.
    pub fn new(config: &FintabConfig, ocr: Option<Arc<dyn OcrProvider>>) -> Self {
        let collector = &config.collector;
        let available = available_backends(collector, ocr.is_some());

        let mut backends: Vec<Box<dyn TableBackend>> = Vec::new();
        for kind in &available {
            match kind {
                BackendKind::TextLayer => {
                    backends.push(Box::new(TextLayerBackend::new(collector.text_layer_confidence)));
                }
                #[cfg(feature = "spreadsheet")]
                BackendKind::Spreadsheet => {
                    backends.push(Box::new(SpreadsheetBackend::new(collector.spreadsheet_confidence)));
                }
                #[cfg(not(feature = "spreadsheet"))]
                BackendKind::Spreadsheet => {}
                BackendKind::Delimited => {
                    backends.push(Box::new(DelimitedBackend::new(collector.delimited_confidence)));
                }
                BackendKind::ImagePipeline => {
                    if let Some(ocr) = &ocr {
                        backends.push(Box::new(ImagePipelineBackend::new(config, Arc::clone(ocr))));
                    }
                }
            }
        }

        Self {
            config: collector.clone(),
            available,
            backends,
        }
    }

    /// Build a collector around explicit backends.
    pub fn with_backends(config: CollectorConfig, backends: Vec<Box<dyn TableBackend>>) -> Self {
        let available = backends.iter().map(|b| b.kind()).collect();
        Self {
            config,
            available,
            backends,
        }
    }

    /// Backends resolved at construction.
    pub fn available(&self) -> &BTreeSet<BackendKind> {
        &self.available
    }

    /// Available backends that read this kind of document.
    pub fn backends_for(&self, kind: DocumentKind) -> BTreeSet<BackendKind> {
        self.backends
            .iter()
            .filter(|b| b.supports(kind))
            .map(|b| b.kind())
            .collect()
    }

    /// Collect tables from every supporting backend.
    ///
    /// A failing backend contributes no tables; other backends still run.
    pub fn collect(&self, document: &Document, pages: &PageRange) -> Vec<TableRecord> {
        let mut tables = Vec::new();
        let mut counters: BTreeMap<(u32, TableMethod), usize> = BTreeMap::new();

        for backend in self.backends.iter().filter(|b| b.supports(document.kind())) {
            let raw = match backend.extract(document, pages) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("{} backend failed on {}: {}", backend.kind(), document.path().display(), e);
                    continue;
                }
            };

            let found = raw.len();
            let before = tables.len();
            for table in raw {
                if let Some(record) = self.normalize(table, backend.as_ref(), &mut counters) {
                    tables.push(record);
                }
            }
            debug!(
                "{} backend: {} raw tables, {} kept",
                backend.kind(),
                found,
                tables.len() - before
            );
        }

        info!("Collected {} tables from {}", tables.len(), document.path().display());
        tables
    }

    /// Assign id, method and confidence; drop noise tables.
    fn normalize(
        &self,
        raw: RawTable,
        backend: &dyn TableBackend,
        counters: &mut BTreeMap<(u32, TableMethod), usize>,
    ) -> Option<TableRecord> {
        let method = raw.method.unwrap_or_else(|| backend.method());
        let confidence = raw.confidence.unwrap_or_else(|| backend.confidence());
        let page = raw.page.max(1);

        let mut record = TableRecord::new(String::new(), page, method, confidence, raw.headers, raw.rows);
        record.bbox = raw.bbox;

        if record.row_count() < self.config.min_rows || record.column_count() < self.config.min_columns {
            debug!(
                "Dropping {}x{} {} table on page {}",
                record.row_count(),
                record.column_count(),
                method,
                page
            );
            return None;
        }

        let n = counters.entry((page, method)).or_insert(0);
        record.id = format!("p{}-{}-{}", page, method, n);
        *n += 1;
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct FixedBackend {
        tables: Vec<RawTable>,
    }

    impl TableBackend for FixedBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Delimited
        }
        fn method(&self) -> TableMethod {
            TableMethod::Delimited
        }
        fn confidence(&self) -> f32 {
            0.95
        }
        fn supports(&self, kind: DocumentKind) -> bool {
            kind == DocumentKind::Delimited
        }
        fn extract(&self, _: &Document, _: &PageRange) -> Result<Vec<RawTable>, BackendError> {
            Ok(self.tables.clone())
        }
    }

    struct FailingBackend;

    impl TableBackend for FailingBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::TextLayer
        }
        fn method(&self) -> TableMethod {
            TableMethod::TextLayer
        }
        fn confidence(&self) -> f32 {
            0.75
        }
        fn supports(&self, _: DocumentKind) -> bool {
            true
        }
        fn extract(&self, _: &Document, _: &PageRange) -> Result<Vec<RawTable>, BackendError> {
            Err(BackendError::extraction("text_layer", "corrupt page"))
        }
    }

    fn matrix(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    fn csv_document(dir: &Path) -> Document {
        let path = dir.join("t.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();
        Document::open(&path).unwrap()
    }

    #[test]
    fn test_available_backends_respects_config_and_ocr() {
        let config = CollectorConfig::default();
        let without_ocr = available_backends(&config, false);
        assert!(!without_ocr.contains(&BackendKind::ImagePipeline));
        assert!(without_ocr.contains(&BackendKind::Delimited));

        let with_ocr = available_backends(&config, true);
        assert!(with_ocr.contains(&BackendKind::ImagePipeline));

        let only_text = CollectorConfig {
            backends: vec![BackendKind::TextLayer],
            ..CollectorConfig::default()
        };
        let set = available_backends(&only_text, true);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![BackendKind::TextLayer]);
    }

    #[test]
    fn test_failing_backend_is_contained_and_noise_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let document = csv_document(dir.path());

        let fixed = FixedBackend {
            tables: vec![
                RawTable::from_matrix(1, matrix(&[&["Name", "Value"], &["A", "1"]])),
                // Header only: one row.
                RawTable::from_matrix(1, matrix(&[&["Name", "Value"]])),
                // One column.
                RawTable::from_matrix(1, matrix(&[&["Name"], &["A"], &["B"]])),
                RawTable::from_matrix(1, matrix(&[&["x", "y"], &["1", "2"]]))
                    .with_method(TableMethod::Ocr, 0.6),
                RawTable::from_matrix(1, matrix(&[&["c", "d"], &["3", "4"]])),
            ],
        };
        let collector = TableCollector::with_backends(
            CollectorConfig::default(),
            vec![Box::new(FailingBackend), Box::new(fixed)],
        );

        let tables = collector.collect(&document, &PageRange::all());
        let ids: Vec<&str> = tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["p1-delimited-0", "p1-ocr-0", "p1-delimited-1"]);
        assert_eq!(tables[0].confidence, 0.95);
        assert_eq!(tables[1].confidence, 0.6);
    }

    #[test]
    fn test_unsupported_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let document = csv_document(dir.path());
        let collector = TableCollector::with_backends(
            CollectorConfig::default(),
            vec![Box::new(TextLayerBackend::new(0.75))],
        );
        assert!(collector.collect(&document, &PageRange::all()).is_empty());
    }
}
