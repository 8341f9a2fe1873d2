//! Subcommands and the setup they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use indicatif::ProgressStyle;
use tracing::{debug, info};

use fintab_core::models::config::FintabConfig;
use fintab_core::{FinancialExtractor, PureOcrEngine};

/// Configuration from `--config`, else the user config file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FintabConfig> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => {
            let path = config::default_config_path();
            if !path.exists() {
                return Ok(FintabConfig::default());
            }
            path
        }
    };

    debug!("Loading config from {}", path.display());
    FintabConfig::from_file(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// Extractor for `config`, with the OCR engine attached when a model
/// directory is given or configured.
pub fn build_extractor(mut config: FintabConfig, model_dir: Option<PathBuf>) -> anyhow::Result<FinancialExtractor> {
    if model_dir.is_some() {
        config.ocr.model_dir = model_dir;
    }
    let ocr_config = config.ocr.clone();
    let extractor = FinancialExtractor::new(config)?;

    let Some(dir) = ocr_config.model_dir.as_deref() else {
        info!("No OCR model directory, images and scanned pages yield no text");
        return Ok(extractor);
    };

    let engine = PureOcrEngine::from_dir(dir, ocr_config.clone())
        .with_context(|| format!("Failed to load OCR models from {}", dir.display()))?;
    Ok(extractor.with_ocr(Arc::new(engine)))
}

pub fn bar_style(template: &str) -> anyhow::Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar().template(template)?.progress_chars("=>-"))
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
