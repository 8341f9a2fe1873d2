//! Optional cross-check of extracted totals by a language model.
//!
//! No client ships with the crate: callers plug their model in through
//! [`ValidationModel`]. Every failure keeps the extracted values.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::result::ProcessingResult;
use crate::securities::parse_number;

/// Upper bound for one model call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Model call failed: {0}")]
    Call(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unparseable model response: {0}")]
    Parse(String),
}

/// A text (optionally vision) model answering a prompt.
pub trait ValidationModel: Send + Sync {
    fn call(&self, prompt: &str, images: &[PathBuf]) -> Result<String, ValidationError>;

    fn name(&self) -> &str {
        "model"
    }
}

/// First balanced `{...}` block, skipping braces inside JSON strings.
pub fn find_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct TotalsAnswer {
    #[serde(default)]
    total_value: Option<serde_json::Value>,
    #[serde(default)]
    currency: Option<String>,
}

/// Asks a [`ValidationModel`] to confirm total value and currency.
pub struct LlmValidator {
    model: Arc<dyn ValidationModel>,
    timeout: Duration,
}

impl LlmValidator {
    pub fn new(model: Arc<dyn ValidationModel>) -> Self {
        Self {
            model,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace total value and currency with the model's answer.
    ///
    /// Returns whether the result changed. Call, timeout and parse errors
    /// are logged and leave the result untouched.
    pub fn validate_totals(&self, result: &mut ProcessingResult, images: &[PathBuf]) -> bool {
        let prompt = totals_prompt(result);
        let answer = match self.call_with_timeout(prompt, images.to_vec()).and_then(|r| parse_totals(&r)) {
            Ok(answer) => answer,
            Err(e) => {
                error!("Validation with {} failed, keeping extracted totals: {}", self.model.name(), e);
                return false;
            }
        };

        let mut changed = false;
        if let Some(total) = answer.0.filter(|t| result.total_value != Some(*t)) {
            info!("Validated total value: {:?} -> {}", result.total_value, total);
            result.total_value = Some(total);
            changed = true;
        }
        if let Some(currency) = answer.1.filter(|c| result.currency.as_ref() != Some(c)) {
            info!("Validated currency: {:?} -> {}", result.currency, currency);
            result.currency = Some(currency);
            changed = true;
        }
        changed
    }

    fn call_with_timeout(&self, prompt: String, images: Vec<PathBuf>) -> Result<String, ValidationError> {
        let (tx, rx) = mpsc::channel();
        let model = Arc::clone(&self.model);

        // A hung call keeps its thread; the caller moves on.
        thread::spawn(move || {
            let _ = tx.send(model.call(&prompt, &images));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(response) => response,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ValidationError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(ValidationError::Call("model thread exited without answering".to_string()))
            }
        }
    }
}

fn totals_prompt(result: &ProcessingResult) -> String {
    let holdings: Vec<String> = result
        .securities
        .iter()
        .take(50)
        .map(|s| format!("- {} {} value={:?}", s.isin, s.name.as_deref().unwrap_or(""), s.value))
        .collect();

    format!(
        "You are checking figures extracted from a financial statement.\n\
         Extracted total portfolio value: {:?}\n\
         Extracted currency: {:?}\n\
         Holdings:\n{}\n\n\
         Reply with a JSON object {{\"total_value\": number or null, \"currency\": \"ISO code\" or null}} \
         holding the correct total value and currency of the document.",
        result.total_value,
        result.currency,
        holdings.join("\n")
    )
}

/// `(total_value, currency)` from a free-text response.
fn parse_totals(response: &str) -> Result<(Option<f64>, Option<String>), ValidationError> {
    let block = find_json_block(response)
        .ok_or_else(|| ValidationError::Parse("no JSON object in response".to_string()))?;
    let answer: TotalsAnswer =
        serde_json::from_str(block).map_err(|e| ValidationError::Parse(e.to_string()))?;

    let total = match answer.total_value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => parse_number(&s),
        _ => None,
    };
    let currency = answer
        .currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()));

    debug!("Model answer: total={:?} currency={:?}", total, currency);
    Ok((total, currency))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::{DocumentKind, Metadata};
    use crate::models::security::AssetAllocation;
    use pretty_assertions::assert_eq;

    struct Scripted(Result<String, String>);

    impl ValidationModel for Scripted {
        fn call(&self, prompt: &str, _images: &[PathBuf]) -> Result<String, ValidationError> {
            assert!(prompt.contains("total portfolio value"));
            self.0.clone().map_err(ValidationError::Call)
        }
    }

    struct Sleepy;

    impl ValidationModel for Sleepy {
        fn call(&self, _: &str, _: &[PathBuf]) -> Result<String, ValidationError> {
            thread::sleep(Duration::from_millis(500));
            Ok(r#"{"total_value": 1}"#.to_string())
        }
    }

    fn result() -> ProcessingResult {
        ProcessingResult {
            tables: Vec::new(),
            securities: Vec::new(),
            asset_allocation: AssetAllocation::new(),
            total_value: Some(100.0),
            currency: Some("USD".to_string()),
            line_items: Vec::new(),
            metadata: Metadata {
                source_path: "x.pdf".into(),
                document_kind: DocumentKind::Pdf,
                page_count: 1,
                backends_used: Default::default(),
                processed_at: String::new(),
                processing_time_ms: 0,
                warnings: Vec::new(),
            },
        }
    }

    #[test]
    fn test_find_json_block_nested_and_strings() {
        let text = r#"Sure! ```json {"a": {"b": "}{"}, "c": "quote \" }"} ``` trailing }"#;
        assert_eq!(find_json_block(text), Some(r#"{"a": {"b": "}{"}, "c": "quote \" }"}"#));
        assert_eq!(find_json_block("no braces"), None);
        assert_eq!(find_json_block("{ unbalanced"), None);
    }

    #[test]
    fn test_validated_values_replace_extracted() {
        let validator = LlmValidator::new(Arc::new(Scripted(Ok(
            "The answer is {\"total_value\": \"1,250.50\", \"currency\": \"chf\"}".to_string(),
        ))));
        let mut r = result();
        assert!(validator.validate_totals(&mut r, &[]));
        assert_eq!(r.total_value, Some(1250.5));
        assert_eq!(r.currency.as_deref(), Some("CHF"));
    }

    #[test]
    fn test_failures_keep_extracted_values() {
        let cases: Vec<Arc<dyn ValidationModel>> = vec![
            Arc::new(Scripted(Err("401 unauthorized".to_string()))),
            Arc::new(Scripted(Ok("I cannot tell.".to_string()))),
            Arc::new(Scripted(Ok("{\"total_value\": [}".to_string()))),
        ];
        for model in cases {
            let mut r = result();
            assert!(!LlmValidator::new(model).validate_totals(&mut r, &[]));
            assert_eq!(r.total_value, Some(100.0));
            assert_eq!(r.currency.as_deref(), Some("USD"));
        }
    }

    #[test]
    fn test_timeout_keeps_extracted_values() {
        let validator = LlmValidator::new(Arc::new(Sleepy)).with_timeout(Duration::from_millis(20));
        let mut r = result();
        assert!(!validator.validate_totals(&mut r, &[]));
        assert_eq!(r.total_value, Some(100.0));
    }

    #[test]
    fn test_null_answer_changes_nothing() {
        let validator = LlmValidator::new(Arc::new(Scripted(Ok(
            r#"{"total_value": null, "currency": null}"#.to_string(),
        ))));
        let mut r = result();
        assert!(!validator.validate_totals(&mut r, &[]));
        assert_eq!(r.total_value, Some(100.0));
    }
}
