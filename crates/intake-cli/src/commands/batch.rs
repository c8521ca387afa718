//! Batch command - extract text from every file matching a pattern.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use intake_core::{DocumentExtractor, ExtractionResult, ProcessingError};

use super::{file_name, load_config, resolve_mime};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file JSON results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of extracting a single file.
struct FileOutcome {
    path: PathBuf,
    result: Result<ExtractionResult, ProcessingError>,
    processed_at: DateTime<Utc>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let continue_on_error = args.continue_on_error;
    let worker_pb = pb.clone();

    // One extractor serves the whole batch, on a single blocking worker.
    let outcomes = tokio::task::spawn_blocking(move || {
        let extractor = DocumentExtractor::from_config(&config);
        let mut outcomes = Vec::with_capacity(files.len());

        for path in files {
            let outcome = extract_file(&extractor, path);
            worker_pb.inc(1);

            let failed = outcome.result.is_err();
            outcomes.push(outcome);
            if failed && !continue_on_error {
                break;
            }
        }

        outcomes
    })
    .await?;

    pb.finish_and_clear();

    if !continue_on_error {
        if let Some(failure) = outcomes.iter().find(|o| o.result.is_err()) {
            if let Err(err) = &failure.result {
                error!("Failed to process {}: {}", failure.path.display(), err);
                anyhow::bail!(
                    "Processing failed for {}: {}",
                    failure.path.display(),
                    err.code
                );
            }
        }
    }

    if let Some(output_dir) = &args.output_dir {
        write_results(output_dir, &outcomes)?;
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for outcome in &failed {
            if let Err(err) = &outcome.result {
                println!("  - {}: {}", outcome.path.display(), err.user_message);
            }
        }
    }

    Ok(())
}

fn extract_file(extractor: &DocumentExtractor, path: PathBuf) -> FileOutcome {
    let file_start = Instant::now();
    let processed_at = Utc::now();

    let result = match fs::read(&path) {
        Ok(data) => {
            let mime = resolve_mime(&path, None);
            extractor.extract(&data, &mime, &file_name(&path))
        }
        Err(e) => Err(ProcessingError::extraction_failed(format!(
            "failed to read {}: {}",
            path.display(),
            e
        ))),
    };

    if let Err(err) = &result {
        warn!("Failed to process {}: {}", path.display(), err);
    }

    FileOutcome {
        path,
        result,
        processed_at,
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    }
}

fn write_results(output_dir: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    for outcome in outcomes {
        let Ok(result) = &outcome.result else {
            continue;
        };

        let output_name = outcome
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let output_path = output_dir.join(format!("{}.json", output_name));

        fs::write(&output_path, serde_json::to_string_pretty(result)?)?;
        debug!("Wrote output to {}", output_path.display());
    }
    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "method",
        "chars",
        "confidence",
        "error_code",
        "processed_at",
        "processing_time_ms",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let processed_at = outcome.processed_at.to_rfc3339();
        let elapsed = outcome.processing_time_ms.to_string();

        match &outcome.result {
            Ok(result) => {
                let method = serde_json::to_value(result.extraction_method)?;
                wtr.write_record([
                    filename,
                    "success",
                    method.as_str().unwrap_or_default(),
                    &result.text_len().to_string(),
                    &result
                        .ocr_confidence
                        .map(|c| format!("{:.1}", c))
                        .unwrap_or_default(),
                    "",
                    &processed_at,
                    &elapsed,
                ])?;
            }
            Err(err) => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    err.code.as_str(),
                    &processed_at,
                    &elapsed,
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
