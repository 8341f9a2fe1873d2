//! Document processing result.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::security::{AssetAllocation, LineItem, Security};
use super::table::{TableRecord, TableType};
use crate::collect::BackendKind;

/// Input document kind, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    Spreadsheet,
    Delimited,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
            DocumentKind::Spreadsheet => "spreadsheet",
            DocumentKind::Delimited => "delimited",
        };
        f.write_str(name)
    }
}

/// Processing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Input path as given.
    pub source_path: String,
    /// Detected document kind.
    pub document_kind: DocumentKind,
    /// Pages (or sheets) in the document.
    pub page_count: u32,
    /// Backends that were available for this run.
    pub backends_used: BTreeSet<BackendKind>,
    /// Processing timestamp, ISO-8601.
    pub processed_at: String,
    /// Wall-clock processing time.
    pub processing_time_ms: u64,
    /// Contained, non-fatal problems.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub tables: Vec<TableRecord>,
    pub securities: Vec<Security>,
    pub asset_allocation: AssetAllocation,
    pub total_value: Option<f64>,
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    pub metadata: Metadata,
}

impl ProcessingResult {
    /// Number of tables with the given type.
    pub fn count_tables(&self, table_type: TableType) -> usize {
        self.tables.iter().filter(|t| t.table_type == table_type).count()
    }

    /// Security by ISIN.
    pub fn security(&self, isin: &str) -> Option<&Security> {
        self.securities.iter().find(|s| s.isin == isin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::table::TableMethod;

    fn sample() -> ProcessingResult {
        let mut table = TableRecord::new(
            "p1-delimited-0",
            1,
            TableMethod::Delimited,
            0.95,
            vec!["ISIN".into(), "Value".into()],
            vec![vec!["US0378331005".into(), 10.0.into()]],
        );
        table.table_type = TableType::Portfolio;

        ProcessingResult {
            tables: vec![table],
            securities: vec![Security::new(
                "US0378331005",
                crate::models::SecuritySource::Table("p1-delimited-0".into()),
            )],
            asset_allocation: AssetAllocation::new(),
            total_value: Some(10.0),
            currency: None,
            line_items: vec![],
            metadata: Metadata {
                source_path: "a.csv".into(),
                document_kind: DocumentKind::Delimited,
                page_count: 1,
                backends_used: [BackendKind::Delimited].into_iter().collect(),
                processed_at: "2024-01-01T00:00:00+00:00".into(),
                processing_time_ms: 3,
                warnings: vec![],
            },
        }
    }

    #[test]
    fn test_result_json_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["tables"][0]["method"], "delimited");
        assert_eq!(value["tables"][0]["table_type"], "portfolio");
        assert_eq!(value["securities"][0]["source"], "table_p1-delimited-0");
        assert_eq!(value["metadata"]["document_kind"], "delimited");
        assert_eq!(value["metadata"]["backends_used"][0], "delimited");
        assert!(value["currency"].is_null());
        assert!(value.get("line_items").is_none());
    }

    #[test]
    fn test_lookup_helpers() {
        let result = sample();
        assert_eq!(result.count_tables(TableType::Portfolio), 1);
        assert!(result.security("US0378331005").is_some());
        assert!(result.security("US5949181045").is_none());
    }
}
