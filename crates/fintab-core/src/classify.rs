//! Keyword-based financial table typing.

use tracing::debug;

use crate::models::config::{ClassifierConfig, KeywordCategory};
use crate::models::table::{TableRecord, TableType};

/// Assigns the first category whose keywords appear in the joined headers.
#[derive(Debug, Clone)]
pub struct TableClassifier {
    categories: Vec<KeywordCategory>,
}

impl TableClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let categories = config
            .categories
            .iter()
            .map(|c| KeywordCategory {
                table_type: c.table_type,
                keywords: c.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Self { categories }
    }

    pub fn classify(&self, table: &TableRecord) -> TableType {
        let headers = table.headers.join(" ").to_lowercase();
        self.categories
            .iter()
            .find(|c| c.keywords.iter().any(|k| !k.is_empty() && headers.contains(k.as_str())))
            .map_or(TableType::Unknown, |c| c.table_type)
    }

    /// Annotate every table in place.
    pub fn classify_all(&self, tables: &mut [TableRecord]) {
        for table in tables.iter_mut() {
            table.table_type = self.classify(table);
            debug!("{} classified as {:?}", table.id, table.table_type);
        }
    }
}

impl Default for TableClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
