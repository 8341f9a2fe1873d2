//! ISIN-keyed security extraction and reconciliation.

mod isin;
mod numbers;
mod patterns;
mod reconcile;
mod scanner;

pub use self::isin::{extract_isins, validate_isin, ISIN_PATTERN};
pub use self::numbers::parse_number;
pub use self::patterns::{capture, CompiledPatterns};
pub use self::reconcile::reconcile;
pub use self::scanner::SecurityScanner;
