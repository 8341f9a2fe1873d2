//! Lineless table reconstruction from OCR word positions.

use tracing::debug;

use crate::geometry::{group_positions, BoundingBox};
use crate::ocr::{median_height, OcrWord};

/// Words closer than this many median heights are part of one phrase.
pub const PHRASE_GAP: f32 = 1.0;

/// Phrase left edges within this many median heights share a column.
pub const COLUMN_GAP: f32 = 2.0;

/// Rows need at least this many phrases to belong to the table.
pub const MIN_ROW_CELLS: usize = 2;

/// Table rebuilt from word boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTable {
    /// Cell text, first row is the header.
    pub rows: Vec<Vec<String>>,
    /// Union of the contributing word boxes.
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone)]
struct Phrase {
    text: String,
    left: f32,
    bbox: BoundingBox,
}

/// Merge a row's words (sorted by x) into phrases separated by wide gaps.
fn phrases(row: &[&OcrWord], max_gap: f32) -> Vec<Phrase> {
    let mut out: Vec<Phrase> = Vec::new();
    let mut last_right = f32::NEG_INFINITY;

    for word in row {
        match out.last_mut() {
            Some(phrase) if word.x - last_right <= max_gap => {
                phrase.text.push(' ');
                phrase.text.push_str(&word.text);
                phrase.bbox = union(&phrase.bbox, &word.bbox());
            }
            _ => out.push(Phrase {
                text: word.text.clone(),
                left: word.x,
                bbox: word.bbox(),
            }),
        }
        last_right = word.right();
    }

    out
}

fn union(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    BoundingBox::from_corners(
        a.x.min(b.x),
        a.y.min(b.y),
        a.right().max(b.right()),
        a.bottom().max(b.bottom()),
    )
}

/// Cluster words into rows (by vertical center) and columns (by phrase left
/// edge). Rows with fewer than [`MIN_ROW_CELLS`] phrases are dropped.
///
/// Returns `None` when fewer than two rows or two columns remain.
pub fn reconstruct_table(words: &[OcrWord]) -> Option<LayoutTable> {
    let words: Vec<&OcrWord> = words.iter().filter(|w| !w.text.trim().is_empty()).collect();
    if words.len() < 4 {
        return None;
    }

    let height = median_height(words.iter().map(|w| w.height));
    let centers: Vec<f32> = words.iter().map(|w| w.center_y()).collect();

    let mut rows: Vec<Vec<Phrase>> = group_positions(&centers, height / 2.0)
        .into_iter()
        .map(|members| {
            let mut row: Vec<&OcrWord> = members.into_iter().map(|i| words[i]).collect();
            row.sort_by(|a, b| a.x.total_cmp(&b.x));
            phrases(&row, height * PHRASE_GAP)
        })
        .filter(|row| row.len() >= MIN_ROW_CELLS)
        .collect();

    if rows.len() < 2 {
        return None;
    }

    let lefts: Vec<f32> = rows.iter().flatten().map(|p| p.left).collect();
    let columns = group_positions(&lefts, height * COLUMN_GAP);
    if columns.len() < 2 {
        return None;
    }

    // Column index of every phrase, in flattened order.
    let mut column_of = vec![0usize; lefts.len()];
    for (col, members) in columns.iter().enumerate() {
        for &idx in members {
            column_of[idx] = col;
        }
    }

    let mut bbox: Option<BoundingBox> = None;
    let mut table: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    let mut flat = 0usize;
    for row in rows.drain(..) {
        let mut cells = vec![String::new(); columns.len()];
        for phrase in row {
            let cell = &mut cells[column_of[flat]];
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(&phrase.text);
            bbox = Some(match bbox {
                Some(b) => union(&b, &phrase.bbox),
                None => phrase.bbox,
            });
            flat += 1;
        }
        table.push(cells);
    }

    debug!("OCR layout: {} rows x {} columns", table.len(), columns.len());

    Some(LayoutTable {
        rows: table,
        bbox: bbox?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x: f32, y: f32) -> OcrWord {
        OcrWord::new(text, 0.9, x, y, text.len() as f32 * 8.0, 12.0)
    }

    #[test]
    fn test_reconstructs_columns() {
        let words = vec![
            word("Asset", 10.0, 10.0),
            word("Class", 58.0, 10.0),
            word("Weight", 200.0, 11.0),
            word("Equities", 10.0, 40.0),
            word("60%", 200.0, 41.0),
            word("Bonds", 10.0, 70.0),
            word("40%", 204.0, 69.0),
        ];

        let table = reconstruct_table(&words).unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec!["Asset Class".to_string(), "Weight".to_string()],
                vec!["Equities".to_string(), "60%".to_string()],
                vec!["Bonds".to_string(), "40%".to_string()],
            ]
        );
        assert_eq!(table.bbox.x, 10.0);
    }

    #[test]
    fn test_prose_is_not_a_table() {
        let words = vec![
            word("This", 10.0, 10.0),
            word("is", 46.0, 10.0),
            word("plain", 66.0, 10.0),
            word("text", 10.0, 40.0),
            word("only", 46.0, 40.0),
        ];
        assert!(reconstruct_table(&words).is_none());
    }
}
