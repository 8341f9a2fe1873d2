//! Compiled free-text extraction patterns.

use regex::Regex;

use crate::error::ConfigError;
use crate::models::config::PatternConfig;

/// Regexes compiled once from [`PatternConfig`].
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    pub name: Regex,
    pub quantity_labeled: Regex,
    pub quantity_unit: Regex,
    pub price: Regex,
    pub value: Regex,
    pub value_with_currency: Regex,
    pub currency: Regex,
    pub total_value: Regex,
}

fn compile(name: &str, source: &str) -> Result<Regex, ConfigError> {
    let regex = Regex::new(source).map_err(|e| ConfigError::Pattern {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if regex.captures_len() < 2 {
        return Err(ConfigError::Pattern {
            name: name.to_string(),
            reason: "pattern needs a capture group".to_string(),
        });
    }
    Ok(regex)
}

impl CompiledPatterns {
    pub fn new(config: &PatternConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: compile("name", &config.name)?,
            quantity_labeled: compile("quantity_labeled", &config.quantity_labeled)?,
            quantity_unit: compile("quantity_unit", &config.quantity_unit)?,
            price: compile("price", &config.price)?,
            value: compile("value", &config.value)?,
            value_with_currency: compile("value_with_currency", &config.value_with_currency)?,
            currency: compile("currency", &config.currency)?,
            total_value: compile("total_value", &config.total_value)?,
        })
    }
}

/// First capture group of the first match.
pub fn capture<'t>(regex: &Regex, text: &'t str) -> Option<&'t str> {
    regex
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}
