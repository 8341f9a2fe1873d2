mod common;

use std::path::PathBuf;
use std::sync::Arc;

use fintab_core::models::config::FintabConfig;
use fintab_core::{
    validate_isin, BackendKind, Document, DocumentKind, FinancialExtractor, LlmValidator, PageRange, PdfType, SecuritySource,
    TableMethod, TableType, ValidationError, ValidationModel,
};
use pretty_assertions::assert_eq;

use common::{GridCellOcr, HOLDINGS};

fn extractor() -> FinancialExtractor {
    FinancialExtractor::new(FintabConfig::default()).unwrap()
}

#[test]
fn test_ruled_table_image_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("statement.png");
    common::portfolio_table_image().save(&path).unwrap();

    let result = extractor().with_ocr(Arc::new(GridCellOcr)).process_file(&path).unwrap();

    assert!(!result.tables.is_empty());
    let table = &result.tables[0];
    assert_eq!(table.table_type, TableType::Portfolio);
    assert_eq!(table.headers, common::HEADERS.to_vec());
    assert_eq!(table.rows.len(), HOLDINGS.len());
    assert!(table.bbox.is_some());
    assert!(matches!(
        table.method,
        TableMethod::GridDetection | TableMethod::LineDetection | TableMethod::ContourDetection
    ));

    assert_eq!(result.securities.len(), HOLDINGS.len());
    for security in &result.securities {
        assert!(validate_isin(&security.isin), "{}", security.isin);
        assert_eq!(security.source, SecuritySource::Table(table.id.clone()));
    }

    let apple = result.security("US0378331005").unwrap();
    assert_eq!(apple.name.as_deref(), Some("Apple Inc"));
    assert_eq!(apple.quantity, Some(100.0));
    assert_eq!(apple.price, Some(185.5));
    assert_eq!(apple.value, Some(18_550.0));

    let expected_total: f64 = HOLDINGS
        .iter()
        .map(|h| h[4].replace(',', "").parse::<f64>().unwrap())
        .sum();
    assert!((result.total_value.unwrap() - expected_total).abs() < 0.01);
    assert_eq!(result.metadata.document_kind, DocumentKind::Image);
    assert!(result.metadata.backends_used.contains(&BackendKind::ImagePipeline));
}

#[test]
fn test_text_layer_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("statement.pdf");
    common::create_text_pdf(
        &path,
        &[vec![
            "Portfolio statement as of 2024-06-30",
            "",
            "Security          ISIN            Quantity    Value",
            "Apple Inc         US0378331005    100         18550.00",
            "Nestle SA         CH0038863350    120         11448.00",
            "",
            "Total portfolio value: 29998.00 USD",
        ]],
    )
    .unwrap();

    let document = Document::open(&path).unwrap();
    assert_eq!(document.pdf_type(), Some(PdfType::Text));
    let result = extractor().process_document(&document);

    assert_eq!(result.metadata.document_kind, DocumentKind::Pdf);
    assert_eq!(result.metadata.page_count, 1);
    let table = result
        .tables
        .iter()
        .find(|t| t.method == TableMethod::TextLayer)
        .expect("text layer table");
    assert_eq!(table.table_type, TableType::Portfolio);
    assert_eq!(table.rows.len(), 2);

    assert_eq!(result.securities.len(), 2);
    let nestle = result.security("CH0038863350").unwrap();
    assert_eq!(nestle.quantity, Some(120.0));
    assert_eq!(nestle.value, Some(11_448.0));
    assert!(nestle.source.is_table());
    assert_eq!(result.total_value, Some(29_998.0));
    assert_eq!(result.currency.as_deref(), Some("USD"));
}

#[test]
fn test_page_range_limits_pdf_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_pages.pdf");
    common::create_text_pdf(
        &path,
        &[
            vec!["Name          ISIN", "Apple Inc     US0378331005", "Tesla Inc     US88160R1014"],
            vec!["Name          ISIN", "Siemens AG    DE0007164600", "BP plc        GB0002374006"],
        ],
    )
    .unwrap();

    let result = extractor().with_pages(PageRange::new(2, 2)).process_file(&path).unwrap();
    assert!(!result.tables.is_empty());
    assert!(result.tables.iter().all(|t| t.page == 2));
    assert!(result
        .securities
        .iter()
        .filter(|s| s.source.is_table())
        .all(|s| s.isin == "DE0007164600" || s.isin == "GB0002374006"));
}

#[test]
fn test_semicolon_csv_with_european_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depot.csv");
    std::fs::write(
        &path,
        "Name;ISIN;Quantity;Price;Value\n\
         Siemens AG;DE0007164600;70;175,00;12.250,00\n\
         iShares Core MSCI World;IE00B4L5Y983;250;90,60;22.650,00\n",
    )
    .unwrap();

    let result = extractor().process_file(&path).unwrap();
    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.tables[0].method, TableMethod::Delimited);
    let siemens = result.security("DE0007164600").unwrap();
    assert_eq!(siemens.price, Some(175.0));
    assert_eq!(siemens.value, Some(12_250.0));
    assert_eq!(result.total_value, Some(34_900.0));
}

#[test]
fn test_allocation_weights_sum_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("allocation.csv");
    std::fs::write(
        &path,
        "Asset Class,Allocation\nEquities,60\nBonds,30\nCash,10\nTotal,100\n",
    )
    .unwrap();

    let result = extractor().process_file(&path).unwrap();
    assert_eq!(result.count_tables(TableType::AssetAllocation), 1);
    assert_eq!(result.asset_allocation.len(), 3);
    assert!(!result.asset_allocation.contains_key("Total"));

    let sum: f64 = result.asset_allocation.values().filter_map(|e| e.weight).sum();
    assert!((sum - 1.0).abs() < 1e-9, "weights sum to {}", sum);
    assert_eq!(result.asset_allocation["Equities"].weight, Some(0.6));
}

struct CannedModel(&'static str);

impl ValidationModel for CannedModel {
    fn call(&self, _prompt: &str, _images: &[PathBuf]) -> Result<String, ValidationError> {
        Ok(self.0.to_string())
    }
}

struct DownModel;

impl ValidationModel for DownModel {
    fn call(&self, _prompt: &str, _images: &[PathBuf]) -> Result<String, ValidationError> {
        Err(ValidationError::Call("connection refused".to_string()))
    }
}

fn write_holdings(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("holdings.csv");
    std::fs::write(
        &path,
        "Security,ISIN,Value,Currency\nApple Inc,US0378331005,1000,USD\nBP plc,GB0002374006,500,USD\n",
    )
    .unwrap();
    path
}

#[test]
fn test_validation_failure_keeps_extracted_totals() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_holdings(dir.path());

    let result = extractor()
        .with_validator(LlmValidator::new(Arc::new(DownModel)))
        .process_file(&path)
        .unwrap();
    assert_eq!(result.total_value, Some(1_500.0));
    assert_eq!(result.currency.as_deref(), Some("USD"));
}

#[test]
fn test_validation_answer_replaces_totals() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_holdings(dir.path());

    let model = CannedModel("Checked.\n```json\n{\"total_value\": \"1,750.00\", \"currency\": \"EUR\"}\n```");
    let result = extractor()
        .with_validator(LlmValidator::new(Arc::new(model)))
        .process_file(&path)
        .unwrap();
    assert_eq!(result.total_value, Some(1_750.0));
    assert_eq!(result.currency.as_deref(), Some("EUR"));
    assert_eq!(result.securities.len(), 2);
}
