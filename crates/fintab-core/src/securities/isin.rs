//! ISIN extraction and check-digit validation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Two-letter country code, nine alphanumerics, numeric check digit.
    pub static ref ISIN_PATTERN: Regex = Regex::new(r"\b[A-Z]{2}[A-Z0-9]{9}[0-9]\b").unwrap();
}

/// Distinct valid ISINs in order of first appearance.
pub fn extract_isins(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for m in ISIN_PATTERN.find_iter(text) {
        if !seen.iter().any(|s| s == m.as_str()) {
            seen.push(m.as_str().to_string());
        }
    }
    seen.retain(|isin| validate_isin(isin));
    seen
}

/// Validate an ISIN with the Luhn check over its digit expansion.
///
/// Letters expand to two digits (A=10 .. Z=35). Walking the digits from the
/// right, even positions add the digit and odd positions add the digit sum
/// of twice the digit. Malformed input is invalid.
pub fn validate_isin(isin: &str) -> bool {
    let bytes = isin.as_bytes();
    if bytes.len() != 12
        || !bytes[..2].iter().all(u8::is_ascii_uppercase)
        || !bytes[2..11].iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        || !bytes[11].is_ascii_digit()
    {
        return false;
    }

    let mut digits: Vec<u32> = Vec::with_capacity(24);
    for &b in bytes {
        if b.is_ascii_digit() {
            digits.push(u32::from(b - b'0'));
        } else {
            let value = u32::from(b - b'A') + 10;
            digits.push(value / 10);
            digits.push(value % 10);
        }
    }

    let total: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                d
            } else {
                let doubled = d * 2;
                doubled / 10 + doubled % 10
            }
        })
        .sum();

    total % 10 == 0
}
