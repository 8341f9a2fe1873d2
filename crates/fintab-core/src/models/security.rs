//! Security and portfolio data models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::table::TableType;

/// Where a security record was discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecuritySource {
    /// Free-text scan of the document.
    Text,
    /// Row of the table with the given id.
    Table(String),
}

impl SecuritySource {
    /// Whether the record came from a table.
    pub fn is_table(&self) -> bool {
        matches!(self, SecuritySource::Table(_))
    }
}

impl fmt::Display for SecuritySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecuritySource::Text => f.write_str("text"),
            SecuritySource::Table(id) => write!(f, "table_{}", id),
        }
    }
}

impl Serialize for SecuritySource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SecuritySource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.strip_prefix("table_") {
            Some(id) => Ok(SecuritySource::Table(id.to_string())),
            None if s == "text" => Ok(SecuritySource::Text),
            None => Err(serde::de::Error::custom(format!(
                "unknown security source: {}",
                s
            ))),
        }
    }
}

/// A security identified by its ISIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Security {
    /// ISIN code (12 characters, check digit validated by the scanners).
    pub isin: String,

    /// Security name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Number of units / nominal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,

    /// Unit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Position value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    /// ISO 4217 currency code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Provenance.
    pub source: SecuritySource,

    /// Surrounding text or table row.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

impl Security {
    /// Create a security with only the ISIN and source set.
    pub fn new(isin: impl Into<String>, source: SecuritySource) -> Self {
        Self {
            isin: isin.into(),
            name: None,
            quantity: None,
            price: None,
            value: None,
            currency: None,
            source,
            context: String::new(),
        }
    }

    /// Fill every missing field from `other`. Existing values are kept.
    pub fn backfill_from(&mut self, other: &Security) {
        if self.name.is_none() {
            self.name = other.name.clone();
        }
        if self.quantity.is_none() {
            self.quantity = other.quantity;
        }
        if self.price.is_none() {
            self.price = other.price;
        }
        if self.value.is_none() {
            self.value = other.value;
        }
        if self.currency.is_none() {
            self.currency = other.currency.clone();
        }
        if self.context.is_empty() {
            self.context = other.context.clone();
        }
    }

    /// Number of populated optional fields.
    pub fn completeness(&self) -> usize {
        [
            self.name.is_some(),
            self.quantity.is_some(),
            self.price.is_some(),
            self.value.is_some(),
            self.currency.is_some(),
        ]
        .iter()
        .filter(|f| **f)
        .count()
    }
}

/// Value and weight of one asset class.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationEntry {
    /// Absolute value.
    pub value: Option<f64>,
    /// Fraction of the portfolio (0.0 - 1.0).
    pub weight: Option<f64>,
}

/// Asset allocation keyed by asset class.
pub type AssetAllocation = BTreeMap<String, AllocationEntry>;

/// A financial statement line (income statement or balance sheet row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Row label.
    pub label: String,
    /// Numeric values for each remaining column; `None` where not numeric.
    pub values: Vec<Option<f64>>,
    /// Statement type of the source table.
    pub statement: TableType,
    /// Source table id.
    pub table_id: String,
}
