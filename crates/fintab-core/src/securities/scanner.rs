//! Security scans over free text and classified tables.

use std::collections::HashMap;

use tracing::debug;

use super::isin::{extract_isins, validate_isin, ISIN_PATTERN};
use super::numbers::parse_number;
use super::patterns::{capture, CompiledPatterns};
use crate::collect::split_line_into_cells;
use crate::error::ConfigError;
use crate::models::config::ExtractionConfig;
use crate::models::security::{Security, SecuritySource};
use crate::models::table::{CellValue, TableRecord};

const NAME_COLUMNS: &[&str] = &["security", "name", "description", "instrument"];
const QUANTITY_COLUMNS: &[&str] = &["quantity", "qty", "nominal", "units", "shares", "holding"];
const PRICE_COLUMNS: &[&str] = &["price", "rate", "course"];
const VALUE_COLUMNS: &[&str] = &["market value", "value", "amount"];
const CURRENCY_COLUMNS: &[&str] = &["currency", "ccy"];

/// Longest name taken from the text in front of an ISIN.
const MAX_NAME_CHARS: usize = 80;

/// Builds [`Security`] records around ISIN occurrences.
#[derive(Debug, Clone)]
pub struct SecurityScanner {
    patterns: CompiledPatterns,
    context_window: usize,
}

impl SecurityScanner {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            patterns: CompiledPatterns::new(&config.patterns)?,
            context_window: config.context_window,
        })
    }

    pub fn patterns(&self) -> &CompiledPatterns {
        &self.patterns
    }

    /// One security per valid ISIN in the text, fields read from the
    /// surrounding context. Later occurrences fill fields the first left empty.
    pub fn scan_text(&self, text: &str) -> Vec<Security> {
        let matches: Vec<(usize, usize)> = ISIN_PATTERN.find_iter(text).map(|m| (m.start(), m.end())).collect();

        let mut securities: Vec<Security> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (n, &(start, end)) in matches.iter().enumerate() {
            let isin = &text[start..end];
            if !validate_isin(isin) {
                continue;
            }

            // Lines holding a neighboring ISIN belong to that ISIN.
            let lower = n.checked_sub(1).map_or(0, |p| {
                let prev_end = matches[p].1;
                text[prev_end..start].find('\n').map_or(prev_end, |i| prev_end + i + 1)
            });
            let upper = matches.get(n + 1).map_or(text.len(), |&(next_start, _)| {
                text[end..next_start].rfind('\n').map_or(next_start, |i| end + i)
            });
            let (ctx_start, ctx_end) = context_bounds(text, start, end, self.context_window);
            let before = &text[ctx_start.max(lower)..start];
            let after = &text[end..ctx_end.min(upper)];

            let security = self.security_from_context(isin, before, after, &text[ctx_start..ctx_end]);
            match index.get(isin) {
                Some(&i) => securities[i].backfill_from(&security),
                None => {
                    index.insert(isin.to_string(), securities.len());
                    securities.push(security);
                }
            }
        }

        debug!("Text scan found {} securities", securities.len());
        securities
    }

    fn security_from_context(&self, isin: &str, before: &str, after: &str, context: &str) -> Security {
        let p = &self.patterns;
        let find = |regexes: &[&regex::Regex]| {
            [after, before]
                .into_iter()
                .find_map(|part| regexes.iter().find_map(|r| capture(r, part)))
        };

        let mut security = Security::new(isin, SecuritySource::Text);
        security.name = find(&[&p.name])
            .map(str::to_string)
            .or_else(|| name_before(before));
        security.quantity = find(&[&p.quantity_labeled, &p.quantity_unit]).and_then(parse_number);
        security.price = find(&[&p.price]).and_then(parse_number);
        security.value = find(&[&p.value, &p.value_with_currency]).and_then(parse_number);
        security.currency = find(&[&p.currency]).map(str::to_uppercase);
        security.context = context.trim().to_string();
        security
    }

    /// One security per row holding a valid ISIN, fields read from the
    /// columns whose headers name them.
    pub fn scan_table(&self, table: &TableRecord) -> Vec<Security> {
        let isin_col = table.find_column(&["isin"]);
        let name_col = table.find_column(NAME_COLUMNS).filter(|c| Some(*c) != isin_col);
        let quantity_col = table.find_column(QUANTITY_COLUMNS);
        let price_col = table.find_column(PRICE_COLUMNS);
        let value_col = table.find_column(VALUE_COLUMNS);
        let currency_col = table.find_column(CURRENCY_COLUMNS);

        // "Value (USD)" style headers.
        let header_currency = [value_col, price_col]
            .into_iter()
            .flatten()
            .filter_map(|c| table.header(c))
            .find_map(|h| capture(&self.patterns.currency, h))
            .map(str::to_uppercase);

        let number = |row: usize, col: Option<usize>| col.and_then(|c| table.cell(row, c)).and_then(CellValue::as_number);
        let text = |row: usize, col: Option<usize>| {
            col.and_then(|c| table.cell(row, c))
                .map(CellValue::as_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let mut securities: Vec<Security> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (row, cells) in table.rows.iter().enumerate() {
            let from_column = text(row, isin_col).and_then(|t| extract_isins(&t).into_iter().next());
            let Some(isin) = from_column.or_else(|| {
                cells
                    .iter()
                    .find_map(|c| extract_isins(&c.as_text()).into_iter().next())
            }) else {
                continue;
            };

            let row_text = table.row_text(row);
            let mut security = Security::new(isin.as_str(), SecuritySource::Table(table.id.clone()));
            security.name = text(row, name_col).filter(|n| !n.contains(&isin));
            security.quantity = number(row, quantity_col);
            security.price = number(row, price_col);
            security.value = number(row, value_col);
            security.currency = text(row, currency_col)
                .and_then(|c| capture(&self.patterns.currency, &c).map(str::to_uppercase))
                .or_else(|| header_currency.clone())
                .or_else(|| capture(&self.patterns.currency, &row_text).map(str::to_uppercase));
            security.context = row_text;

            match index.get(&isin) {
                Some(&i) => securities[i].backfill_from(&security),
                None => {
                    index.insert(isin, securities.len());
                    securities.push(security);
                }
            }
        }

        debug!("Table {} yielded {} securities", table.id, securities.len());
        securities
    }
}

/// Byte bounds of up to `window` characters on each side of `start..end`.
fn context_bounds(text: &str, start: usize, end: usize, window: usize) -> (usize, usize) {
    let lower = if window == 0 {
        start
    } else {
        text[..start].char_indices().rev().nth(window - 1).map_or(0, |(i, _)| i)
    };
    let upper = text[end..].char_indices().nth(window).map_or(text.len(), |(i, _)| end + i);
    (lower, upper)
}

/// The cell in front of an ISIN on the same line, e.g. `Apple Inc  US0378331005`.
fn name_before(before: &str) -> Option<String> {
    let line = before.rsplit('\n').next().unwrap_or(before);
    let cells = split_line_into_cells(line);
    let cell = cells.last()?.rsplit('|').next()?.trim();

    let mut name = cell.trim_end_matches([':', ',', ';', '-', '(']).trim();
    if name.to_ascii_lowercase().ends_with("isin") {
        name = name[..name.len() - 4].trim_end_matches([':', ',', ';', '-', '(']).trim();
    }

    let valid = name.chars().any(char::is_alphabetic)
        && name.chars().count() <= MAX_NAME_CHARS
        && parse_number(name).is_none();
    valid.then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::table::TableMethod;
    use pretty_assertions::assert_eq;

    fn scanner() -> SecurityScanner {
        SecurityScanner::new(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_context_bounds_respect_char_boundaries() {
        let text = "ééééé US0378331005 ààààà";
        let start = text.find("US").unwrap();
        let end = start + 12;
        let (lo, hi) = context_bounds(text, start, end, 3);
        assert_eq!(&text[lo..start], "éé ");
        assert_eq!(&text[end..hi], " àà");
        assert_eq!(context_bounds(text, start, end, 500), (0, text.len()));
    }

    #[test]
    fn test_scan_text_labeled_fields() {
        let text = "Holdings\n\
                    Name: Apple Inc | ISIN: US0378331005 | Quantity: 1,000 | Price: USD 150.25 | Market value: 150,250.00 USD\n\
                    Nestle SA  CH0038863350  250 shares  value CHF 26'500.00\n\
                    Unknown XS0000000000 ignored";
        let found = scanner().scan_text(text);
        assert_eq!(found.len(), 2);

        let apple = &found[0];
        assert_eq!(apple.isin, "US0378331005");
        assert_eq!(apple.name.as_deref(), Some("Apple Inc"));
        assert_eq!(apple.quantity, Some(1000.0));
        assert_eq!(apple.price, Some(150.25));
        assert_eq!(apple.value, Some(150_250.0));
        assert_eq!(apple.currency.as_deref(), Some("USD"));
        assert_eq!(apple.source, SecuritySource::Text);

        let nestle = &found[1];
        assert_eq!(nestle.name.as_deref(), Some("Nestle SA"));
        assert_eq!(nestle.quantity, Some(250.0));
        assert_eq!(nestle.value, Some(26_500.0));
        assert_eq!(nestle.currency.as_deref(), Some("CHF"));
    }

    #[test]
    fn test_scan_text_without_isins() {
        assert!(scanner().scan_text("no identifiers here, value 100 USD").is_empty());
        assert!(scanner().scan_text("").is_empty());
    }

    #[test]
    fn test_scan_table_by_header_roles() {
        let table = TableRecord::new(
            "p1-delimited-0",
            1,
            TableMethod::Delimited,
            0.95,
            vec!["Security".into(), "ISIN".into(), "Quantity".into(), "Price".into(), "Value (USD)".into()],
            vec![
                vec!["Apple Inc".into(), "US0378331005".into(), "100".into(), "150.00".into(), "15,000.00".into()],
                vec!["Microsoft".into(), "US5949181045".into(), 50.0.into()],
                vec!["Bad".into(), "US0378331006".into(), "1".into()],
                vec!["Total".into(), CellValue::Empty, CellValue::Empty, CellValue::Empty, "15,000.00".into()],
            ],
        );

        let found = scanner().scan_table(&table);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name.as_deref(), Some("Apple Inc"));
        assert_eq!(found[0].quantity, Some(100.0));
        assert_eq!(found[0].value, Some(15_000.0));
        assert_eq!(found[0].currency.as_deref(), Some("USD"));
        assert_eq!(found[0].source, SecuritySource::Table("p1-delimited-0".into()));
        assert_eq!(found[0].context, "Apple Inc | US0378331005 | 100 | 150.00 | 15,000.00");

        // Ragged row: missing cells are None, not a panic.
        assert_eq!(found[1].quantity, Some(50.0));
        assert_eq!(found[1].price, None);
    }

    #[test]
    fn test_scan_table_isin_outside_isin_column() {
        let table = TableRecord::new(
            "t",
            1,
            TableMethod::TextLayer,
            0.75,
            vec!["Position".into(), "Amount".into()],
            vec![vec!["Nestle CH0038863350".into(), "2.500,00".into()]],
        );
        let found = scanner().scan_table(&table);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].isin, "CH0038863350");
        assert_eq!(found[0].value, Some(2500.0));
        assert_eq!(found[0].name, None);
    }
}
