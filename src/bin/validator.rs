//! Metric Key Validator CLI
//!
//! Checks every `(sensorType, metricKey)` pair used by consumer components
//! against the schema extracted from the registry. Exits with status 1 when
//! any reference is invalid.
//!
//! Usage:
//!   metric-key-validator --registry src/registry.ts --consumers src/widgets
//!   metric-key-validator --format json --include '*Card.tsx'

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sensor_registry::validate::report::{render_json, render_text};
use sensor_registry::{OutputFormat, RegistryFile, RegistryToolConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metric-key-validator")]
#[command(about = "Validate metric keys used by consumer components against the sensor registry")]
struct Cli {
    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the registry source file
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Directory of consumer components
    #[arg(long)]
    consumers: Option<PathBuf>,

    /// File name globs to scan (repeatable, replaces the configured list)
    #[arg(short, long)]
    include: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether validation passed
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = RegistryToolConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let format = cli.format.unwrap_or(config.output.format);
    let include = if cli.include.is_empty() {
        config.validation.include.clone()
    } else {
        cli.include
    };

    let registry = RegistryFile::read(config.registry_path(cli.registry)?)?;
    let schema = registry.extract(&config.extractor())?;

    let consumers = config.consumers_dir(cli.consumers)?;
    let report = config
        .validator(&schema)
        .validate_directory(&consumers, &include)
        .with_context(|| format!("Failed to scan {}", consumers.display()))?;

    let rendered = match format {
        OutputFormat::Text => render_text(&schema, &report),
        OutputFormat::Json => render_json(&schema, &report)?,
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✅ Report written to {}", path.display());
        }
        None => println!("{}", rendered.trim_end()),
    }

    Ok(!report.has_errors())
}
