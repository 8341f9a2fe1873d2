//! Merging of text- and table-sourced security records.

use std::collections::HashMap;

use tracing::debug;

use crate::models::security::Security;

/// Merge security lists by ISIN.
///
/// Table records seed the result: the first record per ISIN is the base and
/// later duplicates only fill its empty fields. Text records then fill empty
/// fields of known ISINs or are appended as new entries. Order is first-seen.
pub fn reconcile(text_securities: Vec<Security>, table_securities: Vec<Security>) -> Vec<Security> {
    let mut merged: Vec<Security> = Vec::with_capacity(table_securities.len() + text_securities.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for security in table_securities.into_iter().chain(text_securities) {
        if let Some(&i) = index.get(&security.isin) {
            merged[i].backfill_from(&security);
        } else {
            index.insert(security.isin.clone(), merged.len());
            merged.push(security);
        }
    }

    debug!("Reconciled {} securities", merged.len());
    merged
}
