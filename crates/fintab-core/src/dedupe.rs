//! Duplicate table suppression across extraction methods.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::config::DedupeConfig;
use crate::models::table::TableRecord;
use crate::similarity::{similar_strings, SequenceRatio, Similarity};

/// Keeps the most confident table of every group of similar tables.
pub struct TableDeduplicator {
    config: DedupeConfig,
    similarity: Box<dyn Similarity>,
}

impl TableDeduplicator {
    pub fn new(config: DedupeConfig) -> Self {
        Self::with_similarity(config, Box::new(SequenceRatio))
    }

    pub fn with_similarity(config: DedupeConfig, similarity: Box<dyn Similarity>) -> Self {
        Self { config, similarity }
    }

    /// Greedy per-page selection in descending confidence order.
    ///
    /// The output is ordered by page, then confidence. Running it again on
    /// its own output changes nothing.
    pub fn dedupe(&self, tables: Vec<TableRecord>) -> Vec<TableRecord> {
        let total = tables.len();
        let mut by_page: BTreeMap<u32, Vec<TableRecord>> = BTreeMap::new();
        for table in tables {
            by_page.entry(table.page).or_default().push(table);
        }

        let mut result = Vec::with_capacity(total);
        for (page, mut candidates) in by_page {
            candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

            let mut kept: Vec<TableRecord> = Vec::new();
            for table in candidates {
                match kept.iter().find(|k| self.is_duplicate(k, &table)) {
                    Some(winner) => debug!("Page {}: {} duplicates {}", page, table.id, winner.id),
                    None => kept.push(table),
                }
            }
            result.extend(kept);
        }

        debug!("Deduplicated {} tables to {}", total, result.len());
        result
    }

    /// Overlapping boxes, or matching header rows.
    pub fn is_duplicate(&self, a: &TableRecord, b: &TableRecord) -> bool {
        if let (Some(box_a), Some(box_b)) = (&a.bbox, &b.bbox) {
            if box_a.overlap_ratio(box_b) > self.config.overlap_threshold {
                return true;
            }
        }
        self.headers_match(&a.headers, &b.headers)
    }

    fn headers_match(&self, a: &[String], b: &[String]) -> bool {
        if a.is_empty() || a.len() != b.len() {
            return false;
        }
        let threshold = self.config.string_similarity as f64;
        let similar = a
            .iter()
            .zip(b)
            .filter(|(x, y)| similar_strings(self.similarity.as_ref(), x, y, threshold))
            .count();
        similar as f32 / a.len() as f32 >= self.config.header_match_ratio
    }
}

impl Default for TableDeduplicator {
    fn default() -> Self {
        Self::new(DedupeConfig::default())
    }
}
