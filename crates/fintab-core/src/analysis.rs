//! Portfolio-level figures derived from classified tables and securities.

use std::collections::HashMap;

use tracing::debug;

use crate::models::security::{AllocationEntry, AssetAllocation, LineItem, Security};
use crate::models::table::{CellValue, TableRecord, TableType};
use crate::securities::{capture, parse_number, CompiledPatterns};

const CLASS_COLUMNS: &[&str] = &["asset", "class", "category", "type"];
const WEIGHT_COLUMNS: &[&str] = &["weight", "%", "allocation", "share"];
const VALUE_COLUMNS: &[&str] = &["value", "amount", "market"];

fn find_other_column(table: &TableRecord, keywords: &[&str], taken: &[Option<usize>]) -> Option<usize> {
    table.headers.iter().enumerate().position(|(i, h)| {
        let h = h.to_lowercase();
        !taken.contains(&Some(i)) && keywords.iter().any(|k| h.contains(k))
    })
}

fn is_total_label(label: &str) -> bool {
    label.trim().to_lowercase().starts_with("total")
}

/// Weight as a fraction: `%` cells are already divided, bare numbers above 1
/// are percentages.
fn weight_value(cell: &CellValue) -> Option<f64> {
    let weight = cell.as_number()?;
    let has_percent = matches!(cell, CellValue::Text(t) if t.contains('%'));
    Some(if !has_percent && weight > 1.0 { weight / 100.0 } else { weight })
}

/// Allocation per asset class from `asset_allocation` tables.
///
/// The class is the first class-like column (or the first column), value
/// and weight come from their headers. Total rows are skipped.
pub fn extract_asset_allocation(tables: &[TableRecord]) -> AssetAllocation {
    let mut allocation = AssetAllocation::new();

    for table in tables.iter().filter(|t| t.table_type == TableType::AssetAllocation) {
        let class_col = table.find_column(CLASS_COLUMNS).unwrap_or(0);
        let weight_col = find_other_column(table, WEIGHT_COLUMNS, &[Some(class_col)]);
        let value_col = find_other_column(table, VALUE_COLUMNS, &[Some(class_col), weight_col]);
        if weight_col.is_none() && value_col.is_none() {
            debug!("{}: no value or weight column", table.id);
            continue;
        }

        for row in 0..table.rows.len() {
            let Some(class) = table
                .cell(row, class_col)
                .map(CellValue::as_text)
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty() && !is_total_label(c))
            else {
                continue;
            };

            let entry = AllocationEntry {
                value: value_col.and_then(|c| table.cell(row, c)).and_then(CellValue::as_number),
                weight: weight_col.and_then(|c| table.cell(row, c)).and_then(weight_value),
            };
            if entry.value.is_none() && entry.weight.is_none() {
                continue;
            }

            let slot = allocation.entry(class).or_default();
            slot.value = slot.value.or(entry.value);
            slot.weight = slot.weight.or(entry.weight);
        }
    }

    debug!("Asset allocation: {} classes", allocation.len());
    allocation
}

/// Total portfolio value: labeled total in the text, else the total row of a
/// portfolio table, else the sum of security values.
pub fn extract_total_value(
    text: &str,
    tables: &[TableRecord],
    securities: &[Security],
    patterns: &CompiledPatterns,
) -> Option<f64> {
    if let Some(total) = capture(&patterns.total_value, text).and_then(parse_number) {
        debug!("Total value from text: {}", total);
        return Some(total);
    }

    for table in tables.iter().filter(|t| t.table_type == TableType::Portfolio) {
        let value_col = table.find_column(VALUE_COLUMNS);
        for (row, cells) in table.rows.iter().enumerate() {
            let label = cells.iter().map(CellValue::as_text).find(|t| !t.trim().is_empty());
            if !label.as_deref().is_some_and(is_total_label) {
                continue;
            }
            let total = value_col
                .and_then(|c| table.cell(row, c))
                .and_then(CellValue::as_number)
                .or_else(|| cells.iter().rev().find_map(CellValue::as_number));
            if total.is_some() {
                debug!("Total value from table {}", table.id);
                return total;
            }
        }
    }

    let values: Vec<f64> = securities.iter().filter_map(|s| s.value).collect();
    (!values.is_empty()).then(|| values.iter().sum())
}

/// Most frequent security currency, else the first currency code in the text.
pub fn detect_currency(text: &str, securities: &[Security], patterns: &CompiledPatterns) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, currency) in securities.iter().filter_map(|s| s.currency.as_deref()).enumerate() {
        counts.entry(currency).or_insert((0, order)).0 += 1;
    }

    counts
        .into_iter()
        // Most frequent, earliest first-seen on ties.
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(currency, _)| currency.to_string())
        .or_else(|| capture(&patterns.currency, text).map(str::to_uppercase))
}

/// Labeled numeric rows of income statement and balance sheet tables.
pub fn extract_line_items(tables: &[TableRecord]) -> Vec<LineItem> {
    let mut items = Vec::new();

    for table in tables.iter().filter(|t| t.table_type.is_statement()) {
        for cells in &table.rows {
            let Some(label_col) = cells.iter().position(|c| !c.is_empty() && c.as_number().is_none()) else {
                continue;
            };
            let values: Vec<Option<f64>> = cells[label_col + 1..].iter().map(CellValue::as_number).collect();
            if values.iter().all(Option::is_none) {
                continue;
            }
            items.push(LineItem {
                label: cells[label_col].as_text().trim().to_string(),
                values,
                statement: table.table_type,
                table_id: table.id.clone(),
            });
        }
    }

    debug!("Extracted {} line items", items.len());
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::PatternConfig;
    use crate::models::security::SecuritySource;
    use crate::models::table::TableMethod;
    use pretty_assertions::assert_eq;

    fn table(table_type: TableType, headers: &[&str], rows: Vec<Vec<CellValue>>) -> TableRecord {
        let mut t = TableRecord::new(
            "t",
            1,
            TableMethod::Spreadsheet,
            0.95,
            headers.iter().map(|h| h.to_string()).collect(),
            rows,
        );
        t.table_type = table_type;
        t
    }

    fn patterns() -> CompiledPatterns {
        CompiledPatterns::new(&PatternConfig::default()).unwrap()
    }

    fn with_value(isin: &str, value: Option<f64>, currency: Option<&str>) -> Security {
        let mut s = Security::new(isin, SecuritySource::Text);
        s.value = value;
        s.currency = currency.map(str::to_string);
        s
    }

    #[test]
    fn test_allocation_weights_sum_to_one() {
        let t = table(
            TableType::AssetAllocation,
            &["Asset Class", "Allocation", "Amount"],
            vec![
                vec!["Equities".into(), "60%".into(), "600,000".into()],
                vec!["Bonds".into(), 30.0.into(), "300,000".into()],
                vec!["Cash".into(), "0.1".into()],
                vec!["Total".into(), "100%".into(), "1,000,000".into()],
                vec![CellValue::Empty, "5%".into()],
            ],
        );

        let allocation = extract_asset_allocation(&[t]);
        assert_eq!(allocation.len(), 3);
        assert_eq!(allocation["Equities"].weight, Some(0.6));
        assert_eq!(allocation["Equities"].value, Some(600_000.0));
        assert_eq!(allocation["Bonds"].weight, Some(0.3));
        assert_eq!(allocation["Cash"].value, None);

        let sum: f64 = allocation.values().filter_map(|e| e.weight).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocation_ignores_other_tables() {
        let t = table(TableType::Portfolio, &["Asset", "Weight"], vec![vec!["Equities".into(), "50%".into()]]);
        assert!(extract_asset_allocation(&[t]).is_empty());
    }

    #[test]
    fn test_total_value_precedence() {
        let p = patterns();
        let portfolio = table(
            TableType::Portfolio,
            &["Security", "Value"],
            vec![vec!["Apple".into(), 10.0.into()], vec!["Total".into(), "1,500.00".into()]],
        );
        let securities = vec![with_value("US0378331005", Some(10.0), None), with_value("CH0038863350", Some(5.0), None)];

        let text = "Statement\nTotal portfolio value: USD 2,000.00\n";
        assert_eq!(extract_total_value(text, &[portfolio.clone()], &securities, &p), Some(2000.0));
        assert_eq!(extract_total_value("", &[portfolio], &securities, &p), Some(1500.0));
        assert_eq!(extract_total_value("", &[], &securities, &p), Some(15.0));
        assert_eq!(extract_total_value("", &[], &[], &p), None);
    }

    #[test]
    fn test_detect_currency() {
        let p = patterns();
        let securities = vec![
            with_value("A", None, Some("CHF")),
            with_value("B", None, Some("USD")),
            with_value("C", None, Some("USD")),
        ];
        assert_eq!(detect_currency("EUR", &securities, &p).as_deref(), Some("USD"));

        let tie = vec![with_value("A", None, Some("CHF")), with_value("B", None, Some("USD"))];
        assert_eq!(detect_currency("", &tie, &p).as_deref(), Some("CHF"));

        assert_eq!(detect_currency("Amounts in EUR", &[], &p).as_deref(), Some("EUR"));
        assert_eq!(detect_currency("", &[], &p), None);
    }

    #[test]
    fn test_line_items() {
        let income = table(
            TableType::IncomeStatement,
            &["", "2023", "2022"],
            vec![
                vec!["Revenue".into(), "1,200".into(), "1,000".into()],
                vec!["Net income".into(), "(50)".into(), CellValue::Empty],
                vec!["Notes".into()],
            ],
        );
        let other = table(TableType::Unknown, &["a", "b"], vec![vec!["x".into(), 1.0.into()]]);

        let items = extract_line_items(&[income, other]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "Revenue");
        assert_eq!(items[0].values, vec![Some(1200.0), Some(1000.0)]);
        assert_eq!(items[1].values, vec![Some(-50.0), None]);
        assert_eq!(items[1].statement, TableType::IncomeStatement);
    }
}
