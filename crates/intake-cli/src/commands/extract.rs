//! Extract command - extract text from a single file.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use intake_core::{DocumentExtractor, ExtractionResult, ProcessingError};

use super::{file_name, load_config, resolve_mime};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF, Word document, text file or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Declared MIME type (default: guessed from the extension)
    #[arg(short, long)]
    mime: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Extracted text only
    Text,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let data = fs::read(&args.input)?;
    let mime = resolve_mime(&args.input, args.mime.as_deref());
    let name = file_name(&args.input);

    info!("Extracting {} as {}", args.input.display(), mime);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting {}...", name));
    pb.enable_steady_tick(Duration::from_millis(100));

    // Every adapter blocks; the extractor is built on the worker thread that uses it.
    let outcome = tokio::task::spawn_blocking(move || {
        DocumentExtractor::from_config(&config).extract(&data, &mime, &name)
    })
    .await?;

    pb.finish_and_clear();
    debug!("Total extraction time: {:?}", start.elapsed());

    match outcome {
        Ok(result) => {
            let output = format_result(&result, args.format)?;
            if let Some(output_path) = &args.output {
                fs::write(output_path, &output)?;
                println!(
                    "{} Output written to {}",
                    style("✓").green(),
                    output_path.display()
                );
            } else {
                println!("{}", output);
            }
            Ok(())
        }
        Err(err) => {
            report_error(&err, args.format)?;
            anyhow::bail!("Extraction failed: {}", err.code)
        }
    }
}

fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => result.text.clone(),
    })
}

/// Print a failure the way a caller would surface it: the full record for JSON, the user
/// message and suggestions for text.
fn report_error(err: &ProcessingError, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(err)?),
        OutputFormat::Text => {
            eprintln!("{} {}", style("✗").red(), err.user_message);
            for suggestion in &err.suggestions {
                eprintln!("  - {}", suggestion);
            }
        }
    }
    Ok(())
}
