//! Batch command - extract from every document matching a glob.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use fintab_core::document::detect_kind;
use fintab_core::ProcessingResult;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input documents
    #[arg(required = true)]
    input: String,

    /// Output directory for per-document JSON and summary.csv
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Outcome for one document.
struct FileOutcome {
    path: PathBuf,
    result: Result<ProcessingResult, String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && detect_kind(p).is_ok())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());
    fs::create_dir_all(&args.output_dir)?;

    let extractor = Arc::new(super::build_extractor(config, args.model_dir.clone())?);
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(super::bar_style(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files",
    )?);

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let extractor = Arc::clone(&extractor);
        let pb = pb.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let file_start = Instant::now();
            let result = extractor.process_file(&path).map_err(|e| e.to_string());
            pb.inc(1);
            FileOutcome {
                path,
                result,
                processing_time_ms: file_start.elapsed().as_millis() as u64,
            }
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = handle.await?;
        match &outcome.result {
            Ok(result) => write_result(&args.output_dir, &outcome.path, result, args.pretty)?,
            Err(e) if args.continue_on_error => {
                warn!("Failed to process {}: {}", outcome.path.display(), e);
            }
            Err(e) => {
                error!("Failed to process {}: {}", outcome.path.display(), e);
                anyhow::bail!("Processing failed for {}: {}", outcome.path.display(), e);
            }
        }
        outcomes.push(outcome);
    }
    pb.finish_and_clear();

    let summary_path = args.output_dir.join("summary.csv");
    write_summary(&summary_path, &outcomes)?;

    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red()
    );
    eprintln!("{} Summary written to {}", style("✓").green(), summary_path.display());

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for outcome in &failed {
            if let Err(e) = &outcome.result {
                eprintln!("  - {}: {}", outcome.path.display(), e);
            }
        }
    }

    Ok(())
}

/// Output file for an input: `<stem>.json` in the output directory.
fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
    output_dir.join(format!("{}.json", stem))
}

fn write_result(output_dir: &Path, input: &Path, result: &ProcessingResult, pretty: bool) -> anyhow::Result<()> {
    let path = output_path(output_dir, input);
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    fs::write(&path, json)?;
    debug!("Wrote output to {}", path.display());
    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "tables",
        "securities",
        "total_value",
        "currency",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = super::display_name(&outcome.path);
        let time = outcome.processing_time_ms.to_string();

        match &outcome.result {
            Ok(result) => wtr.write_record([
                filename.as_str(),
                "success",
                &result.tables.len().to_string(),
                &result.securities.len().to_string(),
                &result.total_value.map(|v| format!("{:.2}", v)).unwrap_or_default(),
                result.currency.as_deref().unwrap_or(""),
                &time,
                "",
            ])?,
            Err(e) => wtr.write_record([filename.as_str(), "error", "", "", "", "", &time, e.as_str()])?,
        }
    }

    wtr.flush()?;
    Ok(())
}
