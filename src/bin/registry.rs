//! Sensor Registry CLI
//!
//! Extracts schemas from the sensor configuration registry and maintains the
//! mnemonic codes of its field definitions.
//!
//! Usage:
//!   sensor-registry --registry src/registry.ts schema
//!   sensor-registry --registry src/registry.ts sync --dry-run
//!   sensor-registry --help

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sensor_registry::mnemonic::{AssignOutcome, StripOutcome};
use sensor_registry::validate::report::render_schema_summary;
use sensor_registry::{find_collisions, OutputFormat, RegistryFile, RegistryToolConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sensor-registry")]
#[command(about = "Extract sensor schemas and maintain field mnemonics")]
struct Cli {
    /// Config file (layered over sensor-registry.toml and SENSOR_REGISTRY__* variables)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the registry source file
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print sensor type → field keys
    Schema,

    /// Insert missing mnemonics into field definitions
    Assign {
        /// Mnemonic table file (TOML)
        #[arg(short, long)]
        table: Option<PathBuf>,
        /// Print a diff instead of writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove mnemonics from alarm field lists
    StripAlarms {
        /// Name of the alarm field list
        #[arg(long)]
        block: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Assign, then strip alarm lists, in a single write
    Sync {
        #[arg(short, long)]
        table: Option<PathBuf>,
        #[arg(long)]
        block: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Report codes shared by several fields of one sensor type
    Collisions {
        #[arg(short, long)]
        table: Option<PathBuf>,
    },

    /// Write the effective configuration to a file
    InitConfig {
        #[arg(default_value = "sensor-registry.toml")]
        output: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = RegistryToolConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let format = cli.format.unwrap_or(config.output.format);

    let registry = cli.registry;

    match cli.command {
        Commands::Schema => {
            let file = open(&config, registry)?;
            let schema = file.extract(&config.extractor())?;
            match format {
                OutputFormat::Text => print!("{}", render_schema_summary(&schema)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schema)?),
            }
        }

        Commands::Assign { table, dry_run } => {
            if table.is_some() {
                config.mnemonics.table = table;
            }
            let file = open(&config, registry)?;
            let outcome = file.assign(&config.mnemonic_table()?)?;
            match format {
                OutputFormat::Text => print_assign(&outcome),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
            apply(&file, &outcome.text, dry_run)?;
        }

        Commands::StripAlarms { block, dry_run } => {
            let block = block.unwrap_or_else(|| config.registry.alarm_block.clone());
            let file = open(&config, registry)?;
            let outcome = file.strip_alarms(&block)?;
            match format {
                OutputFormat::Text => print_strip(&outcome, &block),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
            apply(&file, &outcome.text, dry_run)?;
        }

        Commands::Sync {
            table,
            block,
            dry_run,
        } => {
            if table.is_some() {
                config.mnemonics.table = table;
            }
            let block = block.unwrap_or_else(|| config.registry.alarm_block.clone());
            let file = open(&config, registry)?;
            let outcome = file.sync(&config.mnemonic_table()?, &block)?;
            match format {
                OutputFormat::Text => {
                    print_assign(&outcome.assign);
                    print_strip(&outcome.strip, &block);
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            }
            apply(&file, outcome.text(), dry_run)?;
        }

        Commands::Collisions { table } => {
            if table.is_some() {
                config.mnemonics.table = table;
            }
            let file = open(&config, registry)?;
            let schema = file.extract(&config.extractor())?;
            let collisions = find_collisions(&schema, &config.mnemonic_table()?);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&collisions)?),
                OutputFormat::Text if collisions.is_empty() => {
                    println!("✅ No mnemonic collisions");
                }
                OutputFormat::Text => {
                    println!("⚠️  {} shared mnemonic(s):", collisions.len());
                    for c in &collisions {
                        println!("  {}: {} ← {}", c.sensor_type, c.mnemonic, c.keys.join(", "));
                    }
                }
            }
        }

        Commands::InitConfig { output, force } => {
            if Path::new(&output).exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output);
            }
            config
                .save(&output)
                .with_context(|| format!("Failed to write {}", output))?;
            println!("✅ Configuration written to {}", output);
        }
    }

    Ok(())
}

fn open(config: &RegistryToolConfig, cli_path: Option<PathBuf>) -> anyhow::Result<RegistryFile> {
    let path = config.registry_path(cli_path)?;
    Ok(RegistryFile::read(path)?)
}

fn apply(file: &RegistryFile, updated: &str, dry_run: bool) -> anyhow::Result<()> {
    let rewrite = file.rewrite(updated);
    if dry_run {
        if rewrite.changed() {
            print!("{}", rewrite.diff());
        } else {
            println!("No changes");
        }
        return Ok(());
    }
    if rewrite.commit()? {
        println!("✅ Processed {}", file.path().display());
    }
    Ok(())
}

fn print_assign(outcome: &AssignOutcome) {
    println!(
        "✅ Assigned {} mnemonic(s), {} already present",
        outcome.assigned.len(),
        outcome.already_present
    );
    for a in &outcome.assigned {
        println!("  + {} → {} (line {})", a.key, a.mnemonic, a.line);
    }

    let unmapped = outcome.unmapped();
    if !unmapped.is_empty() {
        println!("⚠️  No mnemonic defined for {} key(s), used uppercase key:", unmapped.len());
        for key in unmapped {
            println!("  {}", key);
        }
    }
    for s in &outcome.skipped {
        println!("⚠️  Skipped {} (line {}): {:?}", s.key, s.line, s.reason);
    }
}

fn print_strip(outcome: &StripOutcome, block: &str) {
    println!(
        "✅ Removed {} mnemonic(s) from {} {} section(s)",
        outcome.removed.len(),
        outcome.blocks,
        block
    );
}
