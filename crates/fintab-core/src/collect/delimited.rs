//! CSV / TSV files.

use tracing::debug;

use super::{BackendKind, RawTable, TableBackend};
use crate::document::{Document, PageRange};
use crate::error::BackendError;
use crate::models::result::DocumentKind;
use crate::models::table::TableMethod;

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Lines inspected when sniffing the delimiter.
const SNIFF_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct DelimitedBackend {
    confidence: f32,
}

impl DelimitedBackend {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

impl TableBackend for DelimitedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Delimited
    }

    fn method(&self) -> TableMethod {
        TableMethod::Delimited
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }

    fn supports(&self, kind: DocumentKind) -> bool {
        kind == DocumentKind::Delimited
    }

    fn extract(&self, document: &Document, pages: &PageRange) -> Result<Vec<RawTable>, BackendError> {
        if !pages.contains(1) {
            return Ok(Vec::new());
        }

        let bytes = std::fs::read(document.path())
            .map_err(|e| BackendError::extraction("delimited", e.to_string()))?;
        let content = String::from_utf8_lossy(&bytes);
        let delimiter = sniff_delimiter(&content);
        debug!("Delimiter {:?} for {}", delimiter as char, document.path().display());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut matrix = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| BackendError::extraction("delimited", e.to_string()))?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            matrix.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if matrix.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![RawTable::from_matrix(1, matrix)])
    }
}

/// Pick the candidate delimiter that splits the leading lines most consistently.
///
/// A delimiter scores by how many lines have the same non-zero count as the
/// first line, then by that count. Falls back to `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    CANDIDATE_DELIMITERS
        .iter()
        .filter_map(|&delimiter| {
            let counts: Vec<usize> = lines
                .iter()
                .map(|l| l.bytes().filter(|&b| b == delimiter).count())
                .collect();
            let first = *counts.first()?;
            if first == 0 {
                return None;
            }
            let consistent = counts.iter().filter(|&&c| c == first).count();
            Some((consistent, first, delimiter))
        })
        // Earlier candidates win ties.
        .fold(None, |best: Option<(usize, usize, u8)>, candidate| match best {
            Some(b) if (b.0, b.1) >= (candidate.0, candidate.1) => Some(b),
            _ => Some(candidate),
        })
        .map_or(b',', |(_, _, delimiter)| delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::TableCollector;
    use crate::models::config::CollectorConfig;
    use crate::models::table::CellValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("name;value\nApple;1,5\nNestle;2,25\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
        assert_eq!(sniff_delimiter("a|b|c\n1|2|3\n"), b'|');
        assert_eq!(sniff_delimiter("just text\n"), b',');
    }

    #[test]
    fn test_semicolon_file_with_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holdings.csv");
        std::fs::write(
            &path,
            "ISIN;Name;Value\nUS0378331005;Apple;1.234,50\n\nCH0038863350;Nestle\n",
        )
        .unwrap();

        let document = Document::open(&path).unwrap();
        let tables = DelimitedBackend::new(0.95).extract(&document, &PageRange::all()).unwrap();
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.headers, vec!["ISIN", "Name", "Value"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2].as_number(), Some(1234.5));
        assert_eq!(table.rows[1].len(), 2);
        assert_eq!(table.rows[1][1], CellValue::Text("Nestle".to_string()));

        let collector = TableCollector::with_backends(
            CollectorConfig::default(),
            vec![Box::new(DelimitedBackend::new(0.95))],
        );
        let records = collector.collect(&document, &PageRange::all());
        assert_eq!(records[0].id, "p1-delimited-0");
    }
}
