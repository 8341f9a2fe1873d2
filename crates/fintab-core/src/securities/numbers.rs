//! Lenient number parsing for financial cells and text.

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₣', '₹'];

/// Parse a financial number, `None` when nothing numeric remains.
///
/// Whitespace, apostrophes, currency symbols and a leading or trailing
/// three-letter currency code are dropped; any other letter rejects the
/// input. `(x)` is negative and a `%` suffix divides by 100. A comma
/// after the last dot is the decimal separator (`1.234,50`); a lone comma
/// followed by one or two digits is one too (`12,5`). Other commas and
/// repeated dots are thousands separators.
pub fn parse_number(input: &str) -> Option<f64> {
    let mut s = strip_currency_code(input);
    let mut negative = false;

    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = strip_currency_code(inner);
    }
    let percent = s.ends_with('%');
    let s = s.trim_end_matches('%');

    let mut cleaned = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '0'..='9' | '.' | ',' | '-' | '+' => cleaned.push(ch),
            '\'' | '’' => {}
            c if c.is_whitespace() || CURRENCY_SYMBOLS.contains(&c) => {}
            _ => return None,
        }
    }

    if let Some(rest) = cleaned.strip_prefix('-') {
        negative = !negative;
        cleaned = rest.to_string();
    } else if let Some(rest) = cleaned.strip_prefix('+') {
        cleaned = rest.to_string();
    }
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(c), None) => {
            let decimals = cleaned.len() - c - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    let mut value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if negative {
        value = -value;
    }
    if percent {
        value /= 100.0;
    }
    Some(value)
}

fn is_code(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// `USD 1,000` / `1,000 USD` without the code.
fn strip_currency_code(s: &str) -> &str {
    let mut s = s.trim();
    if let Some(prefix) = s.get(..3).filter(|p| is_code(p)) {
        s = s[prefix.len()..].trim_start();
    }
    if let Some(split) = s.len().checked_sub(3).filter(|&i| s.get(i..).is_some_and(is_code)) {
        s = s[..split].trim_end();
    }
    s
}
