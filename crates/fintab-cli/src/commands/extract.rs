//! Extract command - tables and securities from a single document.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use tracing::debug;

use fintab_core::{PageRange, ProcessingResult};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (PDF, image, spreadsheet or CSV)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pages to process, e.g. 3, 1-3 or 2-
    #[arg(short, long)]
    pages: Option<PageRange>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print a short summary to stderr
    #[arg(long)]
    summary: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let mut extractor = super::build_extractor(config, args.model_dir.clone())?;
    if let Some(pages) = args.pages {
        extractor = extractor.with_pages(pages);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(super::bar_style("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting {}", super::display_name(&args.input)));
    pb.enable_steady_tick(Duration::from_millis(100));

    let input = args.input.clone();
    let result = tokio::task::spawn_blocking(move || extractor.process_file(&input)).await??;
    pb.finish_and_clear();

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &json)?;
        eprintln!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", json);
    }

    if args.summary {
        eprintln!();
        eprint!("{}", format_summary(&result));
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

/// Human-readable digest of a result.
pub fn format_summary(result: &ProcessingResult) -> String {
    let mut output = String::new();
    let meta = &result.metadata;

    output.push_str(&format!(
        "Document: {} ({}, {} pages)\n",
        meta.source_path, meta.document_kind, meta.page_count
    ));

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for table in &result.tables {
        *by_type.entry(table.table_type.as_str()).or_default() += 1;
    }
    let breakdown: Vec<String> = by_type.iter().map(|(t, n)| format!("{} {}", n, t)).collect();
    if breakdown.is_empty() {
        output.push_str("Tables: 0\n");
    } else {
        output.push_str(&format!("Tables: {} ({})\n", result.tables.len(), breakdown.join(", ")));
    }

    output.push_str(&format!("Securities: {}\n", result.securities.len()));
    for security in result.securities.iter().take(10) {
        output.push_str(&format!(
            "  {} {}{}\n",
            security.isin,
            security.name.as_deref().unwrap_or("-"),
            security.value.map(|v| format!("  {:.2}", v)).unwrap_or_default()
        ));
    }
    if result.securities.len() > 10 {
        output.push_str(&format!("  ... and {} more\n", result.securities.len() - 10));
    }

    match (result.total_value, result.currency.as_deref()) {
        (Some(total), Some(currency)) => output.push_str(&format!("Total value: {:.2} {}\n", total, currency)),
        (Some(total), None) => output.push_str(&format!("Total value: {:.2}\n", total)),
        (None, _) => output.push_str("Total value: -\n"),
    }

    if !result.asset_allocation.is_empty() {
        output.push_str("Allocation:\n");
        for (class, entry) in &result.asset_allocation {
            let weight = entry.weight.map(|w| format!("{:.1}%", w * 100.0)).unwrap_or_else(|| "-".into());
            output.push_str(&format!("  {:<20} {}\n", class, weight));
        }
    }

    for warning in &meta.warnings {
        output.push_str(&format!("Warning: {}\n", warning));
    }
    output.push_str(&format!("Processed in {}ms\n", meta.processing_time_ms));
    output
}
