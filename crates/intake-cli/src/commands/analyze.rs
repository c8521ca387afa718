//! Analyze command - validate a classifier payload.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use intake_core::AnalysisValidator;

use super::load_config;

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// JSON file produced by the classifier
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: AnalyzeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let content = fs::read_to_string(&args.input)?;
    let raw: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("{} is not valid JSON: {}", args.input.display(), e))?;

    let Some(result) = AnalysisValidator::new(config.analysis).validate(&raw) else {
        eprintln!(
            "{} The classifier output has no usable shape (documentTitle, summary, confidence, items)",
            style("✗").red()
        );
        anyhow::bail!("Unusable analysis payload: {}", args.input.display());
    };

    info!("Validated classifier payload from {}", args.input.display());
    eprintln!(
        "{} {} items ({} selected), primary category {}",
        style("✓").green(),
        result.items.len(),
        result.selected_items().count(),
        serde_json::to_value(result.primary_category)?
            .as_str()
            .unwrap_or("mixed")
    );

    let output = serde_json::to_string_pretty(&result)?;
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
