//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::collect::BackendKind;
use crate::error::ConfigError;
use crate::models::table::TableType;

/// Main configuration for the fintab pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FintabConfig {
    /// Region table detection on page images.
    pub detection: DetectionConfig,

    /// Grid inference inside a detected table.
    pub grid: GridConfig,

    /// Backend selection and normalization.
    pub collector: CollectorConfig,

    /// Duplicate table suppression.
    pub dedupe: DedupeConfig,

    /// Table classification keywords.
    pub classifier: ClassifierConfig,

    /// Securities and totals extraction.
    pub extraction: ExtractionConfig,

    /// OCR engine settings.
    pub ocr: OcrConfig,
}

/// Region table detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Run the Hough line based detector.
    pub enable_lines: bool,
    /// Run the morphology/projection detector.
    pub enable_grid: bool,
    /// Run the contour detector.
    pub enable_contours: bool,

    /// Canny low threshold.
    pub canny_low: f32,
    /// Canny high threshold.
    pub canny_high: f32,
    /// Minimum Hough votes as a fraction of the shorter image side.
    pub hough_vote_fraction: f32,
    /// Hough non-maximum suppression radius.
    pub hough_suppression_radius: u32,
    /// Allowed deviation from horizontal/vertical, in degrees.
    pub angle_tolerance_deg: f32,
    /// Edge pixel gap tolerated inside one segment.
    pub segment_gap: u32,
    /// Shorter segments are dropped.
    pub min_line_length: f32,
    /// Pixel gap that starts a new line group.
    pub line_group_threshold: f32,
    /// Slack when testing whether a horizontal and a vertical line cross.
    pub line_intersection_tolerance: f32,
    /// Minimum table width for the line detector.
    pub min_line_table_width: f32,
    /// Minimum table height for the line detector.
    pub min_line_table_height: f32,

    /// Adaptive threshold block size (odd).
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean.
    pub adaptive_c: i32,
    /// Share of a row/column that must be foreground to count as a ruling line.
    pub projection_fill_ratio: f32,
    /// Rulings needed on each axis (strictly more than this).
    pub min_grid_lines: usize,

    /// Binary threshold for the contour detector.
    pub binary_threshold: u8,
    /// Minimum contour bounding box width.
    pub min_contour_width: u32,
    /// Minimum contour bounding box height.
    pub min_contour_height: u32,
    /// Accepted aspect ratio range (width / height).
    pub min_aspect_ratio: f32,
    /// Accepted aspect ratio range (width / height).
    pub max_aspect_ratio: f32,
    /// Minimum contour area / bounding box area.
    pub min_fill_ratio: f32,

    /// Overlap (intersection / smaller area) above which two regions collapse.
    pub overlap_threshold: f32,

    /// Confidence assigned to line detections.
    pub line_confidence: f32,
    /// Confidence assigned to grid detections.
    pub grid_confidence: f32,
    /// Confidence assigned to contour detections.
    pub contour_confidence: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enable_lines: true,
            enable_grid: true,
            enable_contours: true,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_fraction: 0.125,
            hough_suppression_radius: 8,
            angle_tolerance_deg: 2.0,
            segment_gap: 2,
            min_line_length: 60.0,
            line_group_threshold: 15.0,
            line_intersection_tolerance: 5.0,
            min_line_table_width: 100.0,
            min_line_table_height: 50.0,
            adaptive_block_size: 15,
            adaptive_c: 5,
            projection_fill_ratio: 0.5,
            min_grid_lines: 3,
            binary_threshold: 128,
            min_contour_width: 200,
            min_contour_height: 100,
            min_aspect_ratio: 0.2,
            max_aspect_ratio: 5.0,
            min_fill_ratio: 0.3,
            overlap_threshold: 0.5,
            line_confidence: 0.8,
            grid_confidence: 0.85,
            contour_confidence: 0.7,
        }
    }
}

/// Grid inference and cell OCR configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Pixel gap that starts a new grid line group.
    pub line_group_threshold: f32,
    /// Minimum Hough votes as a fraction of the shorter crop side.
    pub hough_vote_fraction: f32,
    /// Grid lines must cover this share of the crop along their direction.
    pub min_line_fraction: f32,
    /// Margin added around a region before grid inference.
    pub crop_margin: u32,
    /// Pixels trimmed from each cell side to drop ruling lines.
    pub cell_padding: u32,
    /// Mean intensity above which a cell is treated as blank.
    pub blank_intensity: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            line_group_threshold: 10.0,
            hough_vote_fraction: 0.33,
            min_line_fraction: 0.5,
            crop_margin: 6,
            cell_padding: 4,
            blank_intensity: 250.0,
        }
    }
}

/// Table collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Backends allowed to run; unavailable ones are skipped at startup.
    pub backends: Vec<BackendKind>,
    /// Minimum rows (header row included).
    pub min_rows: usize,
    /// Minimum columns.
    pub min_columns: usize,
    /// Rebuild lineless tables from OCR words when no region is detected.
    pub ocr_layout_fallback: bool,
    /// Confidence of text-layer tables.
    pub text_layer_confidence: f32,
    /// Confidence of spreadsheet tables.
    pub spreadsheet_confidence: f32,
    /// Confidence of delimited-file tables.
    pub delimited_confidence: f32,
    /// Confidence of OCR-layout tables.
    pub ocr_layout_confidence: f32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            backends: vec![
                BackendKind::TextLayer,
                BackendKind::Spreadsheet,
                BackendKind::Delimited,
                BackendKind::ImagePipeline,
            ],
            min_rows: 2,
            min_columns: 2,
            ocr_layout_fallback: true,
            text_layer_confidence: 0.75,
            spreadsheet_confidence: 0.95,
            delimited_confidence: 0.95,
            ocr_layout_confidence: 0.6,
        }
    }
}

/// Deduplicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Bounding box overlap (intersection / smaller area) that marks duplicates.
    pub overlap_threshold: f32,
    /// Fraction of similar header pairs that marks duplicates.
    pub header_match_ratio: f32,
    /// Similarity ratio above which two header strings are similar.
    pub string_similarity: f32,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.5,
            header_match_ratio: 0.7,
            string_similarity: 0.7,
        }
    }
}

/// Keyword category for the table classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCategory {
    /// Table type assigned on match.
    pub table_type: TableType,
    /// Lower-case keywords matched as substrings of the joined headers.
    pub keywords: Vec<String>,
}

impl KeywordCategory {
    pub fn new(table_type: TableType, keywords: &[&str]) -> Self {
        Self {
            table_type,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

/// Classifier configuration; categories are checked in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub categories: Vec<KeywordCategory>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                KeywordCategory::new(
                    TableType::Portfolio,
                    &["security", "isin", "quantity", "price", "value", "weight", "%", "symbol", "name"],
                ),
                KeywordCategory::new(
                    TableType::AssetAllocation,
                    &["asset", "class", "allocation", "weight", "%", "value", "type"],
                ),
                KeywordCategory::new(
                    TableType::IncomeStatement,
                    &["revenue", "income", "expense", "profit", "loss", "ebitda", "net"],
                ),
                KeywordCategory::new(
                    TableType::BalanceSheet,
                    &["asset", "liability", "equity", "total", "current", "non-current"],
                ),
            ],
        }
    }
}

/// Regex sources for free-text security extraction.
///
/// Each pattern must have one capture group holding the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub name: String,
    pub quantity_labeled: String,
    pub quantity_unit: String,
    pub price: String,
    pub value: String,
    pub value_with_currency: String,
    pub currency: String,
    pub total_value: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            name: r"(?i)\b(?:name|security|description)\s*[:=]\s*([^\n:|]+?)\s*(?:\||\n|$|ISIN)".to_string(),
            quantity_labeled: r"(?i)\b(?:quantity|qty|nominal|units|shares)\s*[:=]?\s*([0-9][0-9',.]*)".to_string(),
            quantity_unit: r"(?i)([0-9][0-9',.]*)\s*(?:shares|units|pcs|pieces|stk)\b".to_string(),
            price: r"(?i)\b(?:price|rate|course)\s*[:=]?\s*(?:[A-Z]{3}\s*)?([0-9][0-9',.]*)".to_string(),
            value: r"(?i)\b(?:market\s+value|value|amount)\s*[:=]?\s*(?:[A-Z]{3}\s*)?([0-9][0-9',.]*)".to_string(),
            value_with_currency: r"([0-9][0-9',.]*)\s*(?:USD|EUR|CHF|GBP|JPY)\b".to_string(),
            currency: r"\b(USD|EUR|CHF|GBP|JPY|CAD|AUD|SEK|NOK|DKK)\b".to_string(),
            total_value: r"(?i)\btotal(?:\s+portfolio)?(?:\s+(?:market\s+)?value|\s+assets)?\s*[:=]?\s*(?:[A-Z]{3}\s*)?([0-9][0-9',.]*[0-9])".to_string(),
        }
    }
}

/// Securities and totals extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Characters of context taken on each side of an ISIN.
    pub context_window: usize,
    /// Free-text regexes.
    pub patterns: PatternConfig,
    /// Currency used when none is detected.
    pub default_currency: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window: 150,
            patterns: PatternConfig::default(),
            default_currency: None,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory with det.onnx, latin_rec.onnx and latin_dict.txt.
    pub model_dir: Option<PathBuf>,
    /// Language hint passed to the OCR capability.
    pub language: String,
    /// Keep `[UNK]` tokens in recognized text.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            language: "en".to_string(),
            keep_unk: false,
        }
    }
}

impl FintabConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.adaptive_block_size % 2 == 0 {
            return Err(ConfigError::Parse(
                "detection.adaptive_block_size must be odd".to_string(),
            ));
        }
        if self.collector.min_rows == 0 || self.collector.min_columns == 0 {
            return Err(ConfigError::Parse(
                "collector.min_rows and collector.min_columns must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: FintabConfig =
            serde_json::from_str(r#"{"dedupe": {"overlap_threshold": 0.6}}"#).unwrap();
        assert_eq!(config.dedupe.overlap_threshold, 0.6);
        assert_eq!(config.dedupe.header_match_ratio, 0.7);
        assert_eq!(config.detection.grid_confidence, 0.85);
        assert_eq!(config.classifier.categories.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = FintabConfig::default();
        config.extraction.context_window = 99;
        config.save(&path).unwrap();

        let loaded = FintabConfig::from_file(&path).unwrap();
        assert_eq!(loaded.extraction.context_window, 99);
        assert_eq!(loaded.collector.backends, config.collector.backends);
    }

    #[test]
    fn test_validate_rejects_even_block() {
        let mut config = FintabConfig::default();
        assert!(config.validate().is_ok());
        config.detection.adaptive_block_size = 16;
        assert!(config.validate().is_err());
    }
}
