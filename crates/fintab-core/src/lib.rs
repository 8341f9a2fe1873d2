//! Core library for financial document table extraction.
//!
//! This crate provides:
//! - Table region detection on page images (lines, grids, contours)
//! - Grid inference and per-cell OCR for ruled tables
//! - Multi-backend table collection (PDF text layer, spreadsheets, CSV, images)
//! - Table deduplication and financial classification
//! - ISIN extraction, validation and security reconciliation
//! - Portfolio analysis (allocation, totals, currency, statement line items)

pub mod analysis;
pub mod cells;
pub mod classify;
pub mod collect;
pub mod dedupe;
pub mod detect;
pub mod document;
pub mod error;
pub mod geometry;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod securities;
pub mod similarity;
pub mod validation;

pub use cells::{CellTextExtractor, GridExtractor, GridStructure};
pub use classify::TableClassifier;
pub use collect::{available_backends, BackendKind, RawTable, TableBackend, TableCollector};
pub use dedupe::TableDeduplicator;
pub use detect::{DetectedRegion, RegionTableDetector};
pub use document::{Document, PageRange};
pub use error::{FintabError, Result};
pub use geometry::{group_lines, BoundingBox, LineGroup, LineSegment};
pub use models::{
    AllocationEntry, AssetAllocation, CellValue, DocumentKind, FintabConfig, LineItem, ProcessingResult, Security,
    SecuritySource, TableMethod, TableRecord, TableType,
};
pub use ocr::{OcrOutput, OcrProvider, OcrWord};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfExtractor, PdfProcessor, PdfType};
pub use pipeline::FinancialExtractor;
pub use securities::{extract_isins, parse_number, reconcile, validate_isin, SecurityScanner};
pub use similarity::{Levenshtein, SequenceRatio, Similarity};
pub use validation::{find_json_block, LlmValidator, ValidationError, ValidationModel};
