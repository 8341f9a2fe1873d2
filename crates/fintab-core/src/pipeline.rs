//! End-to-end document processing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::analysis::{detect_currency, extract_asset_allocation, extract_line_items, extract_total_value};
use crate::classify::TableClassifier;
use crate::collect::{BackendKind, TableCollector};
use crate::dedupe::TableDeduplicator;
use crate::document::{Document, PageRange};
use crate::error::Result;
use crate::models::config::FintabConfig;
use crate::models::result::{DocumentKind, Metadata, ProcessingResult};
use crate::models::security::Security;
use crate::models::table::{CellValue, TableRecord, TableType};
use crate::ocr::OcrProvider;
use crate::securities::{reconcile, SecurityScanner};
use crate::validation::LlmValidator;

/// Turns financial documents into [`ProcessingResult`]s.
///
/// Collection, deduplication, classification, security reconciliation and
/// portfolio analysis run in that order. OCR and model validation are
/// optional capabilities.
pub struct FinancialExtractor {
    config: FintabConfig,
    ocr: Option<Arc<dyn OcrProvider>>,
    validator: Option<LlmValidator>,
    pages: PageRange,
    scanner: SecurityScanner,
    classifier: TableClassifier,
    deduplicator: TableDeduplicator,
    /// Built on first use so backend availability is probed once.
    collector: OnceLock<TableCollector>,
}

impl FinancialExtractor {
    /// Create an extractor; fails on invalid configuration.
    pub fn new(config: FintabConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scanner: SecurityScanner::new(&config.extraction)?,
            classifier: TableClassifier::new(&config.classifier),
            deduplicator: TableDeduplicator::new(config.dedupe.clone()),
            config,
            ocr: None,
            validator: None,
            pages: PageRange::all(),
            collector: OnceLock::new(),
        })
    }

    /// Enable the image pipeline and OCR text for images and scans.
    pub fn with_ocr(mut self, ocr: Arc<dyn OcrProvider>) -> Self {
        self.ocr = Some(ocr);
        self.collector = OnceLock::new();
        self
    }

    /// Cross-check totals with a model after extraction.
    pub fn with_validator(mut self, validator: LlmValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Restrict processing to a page range.
    pub fn with_pages(mut self, pages: PageRange) -> Self {
        self.pages = pages;
        self
    }

    pub fn config(&self) -> &FintabConfig {
        &self.config
    }

    fn collector(&self) -> &TableCollector {
        self.collector
            .get_or_init(|| TableCollector::new(&self.config, self.ocr.clone()))
    }

    /// Backends that can run in this process.
    pub fn available_backends(&self) -> &BTreeSet<BackendKind> {
        self.collector().available()
    }

    /// Open and process a file.
    ///
    /// Only a missing, unsupported or unreadable file is an error; a
    /// document without tables or securities is a valid result.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<ProcessingResult> {
        let document = Document::open(path)?;
        Ok(self.process_document(&document))
    }

    /// Process an opened document.
    pub fn process_document(&self, document: &Document) -> ProcessingResult {
        let start = Instant::now();
        let mut warnings = Vec::new();
        info!("Processing {}", document.path().display());

        let collector = self.collector();
        let collected = collector.collect(document, &self.pages);
        let mut tables = self.deduplicator.dedupe(collected);
        self.classifier.classify_all(&mut tables);
        if tables.is_empty() {
            warnings.push("No tables found".to_string());
        }

        let text = self.document_text(document, &tables, &mut warnings);
        debug!("Document text: {} characters", text.len());

        let text_securities = self.scanner.scan_text(&text);
        let table_securities = self.scan_tables(&tables);
        let securities = reconcile(text_securities, table_securities);
        if securities.is_empty() {
            warnings.push("No securities found".to_string());
        }

        let patterns = self.scanner.patterns();
        let asset_allocation = extract_asset_allocation(&tables);
        let total_value = extract_total_value(&text, &tables, &securities, patterns);
        let currency = detect_currency(&text, &securities, patterns)
            .or_else(|| self.config.extraction.default_currency.clone());
        let line_items = extract_line_items(&tables);

        let mut result = ProcessingResult {
            tables,
            securities,
            asset_allocation,
            total_value,
            currency,
            line_items,
            metadata: Metadata {
                source_path: document.path().display().to_string(),
                document_kind: document.kind(),
                page_count: document.page_count(),
                backends_used: collector.backends_for(document.kind()),
                processed_at: chrono::Utc::now().to_rfc3339(),
                processing_time_ms: 0,
                warnings,
            },
        };

        if let Some(validator) = &self.validator {
            let images: Vec<PathBuf> = match document.kind() {
                DocumentKind::Image => vec![document.path().to_path_buf()],
                _ => Vec::new(),
            };
            validator.validate_totals(&mut result, &images);
        }

        result.metadata.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Processed {}: {} tables, {} securities in {}ms",
            document.path().display(),
            result.tables.len(),
            result.securities.len(),
            result.metadata.processing_time_ms
        );
        result
    }

    /// Portfolio tables first so their rows seed the reconciliation.
    fn scan_tables(&self, tables: &[TableRecord]) -> Vec<Security> {
        let (portfolio, other): (Vec<&TableRecord>, Vec<&TableRecord>) =
            tables.iter().partition(|t| t.table_type == TableType::Portfolio);
        portfolio
            .into_iter()
            .chain(other)
            .flat_map(|t| self.scanner.scan_table(t))
            .collect()
    }

    /// Text layer for PDFs (OCR for scans), OCR for images, cell text for
    /// spreadsheets and delimited files.
    fn document_text(&self, document: &Document, tables: &[TableRecord], warnings: &mut Vec<String>) -> String {
        match document.kind() {
            DocumentKind::Pdf => {
                let text = document.text_layer();
                if !text.trim().is_empty() {
                    return text;
                }
                debug!("Empty text layer, treating {} as scanned", document.path().display());
                self.ocr_text(document, warnings)
            }
            DocumentKind::Image => self.ocr_text(document, warnings),
            DocumentKind::Spreadsheet | DocumentKind::Delimited => tables_text(tables),
        }
    }

    fn ocr_text(&self, document: &Document, warnings: &mut Vec<String>) -> String {
        let Some(ocr) = &self.ocr else {
            warnings.push("No OCR provider: page text unavailable".to_string());
            return String::new();
        };

        let mut pages = Vec::new();
        for (page, image) in document.page_images(&self.pages) {
            match ocr.recognize(&image, &self.config.ocr.language) {
                Ok(output) => pages.push(output.text),
                Err(e) => {
                    warn!("OCR failed on page {}: {}", page, e);
                    warnings.push(format!("OCR failed on page {}", page));
                }
            }
        }
        pages.join("\n")
    }
}

/// Tables as tab-separated lines.
fn tables_text(tables: &[TableRecord]) -> String {
    let mut lines = Vec::new();
    for table in tables {
        lines.push(table.headers.join("\t"));
        for row in &table.rows {
            lines.push(row.iter().map(CellValue::as_text).collect::<Vec<_>>().join("\t"));
        }
    }
    lines.join("\n")
}
