//! Remediate CLI
//!
//! Applies "create tracking issue" fixes for broken policy rules. Each fix in
//! the input file is reconciled in turn; a failing fix is reported and the
//! remaining fixes still run.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use remediator::{build_store, load_fix_file, run_fix, ReconciliationResult, RunConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Keep one tracking issue per broken compliance rule
#[derive(Parser)]
#[command(name = "remediate")]
#[command(about = "Keep one tracking issue per broken compliance rule")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every fix in a fix file against the issue tracker
    Apply {
        /// Fix file (.json, .yaml, .yml or .toml)
        #[arg(long)]
        fixes: PathBuf,

        /// Files the fixes concern; used when an entry lists no targets
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Report what would happen without calling the tracker
        #[arg(long, env = "DRY_RUN")]
        dry_run: bool,

        /// Result output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate environment configuration and exit
    CheckConfig {
        /// Check the dry-run configuration instead
        #[arg(long, env = "DRY_RUN")]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("remediator=debug,tracker=debug,info")
        } else {
            EnvFilter::new("remediator=info,tracker=info,warn")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_result(rule_id: &str, result: &ReconciliationResult) {
    let status = if result.succeeded {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!("{status} {} {}", rule_id.cyan(), result.message);
    for target in &result.targets {
        println!("    {}", target.dimmed());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match cli.command {
        Commands::CheckConfig { dry_run } => {
            let config = RunConfig::from_env(dry_run)?;
            println!(
                "{} repository={} api={} dry_run={} max_assignee_retries={}",
                "OK".green().bold(),
                config.repository,
                config.api_url,
                config.dry_run,
                config.max_assignee_retries
            );
            Ok(())
        }
        Commands::Apply {
            fixes,
            targets,
            dry_run,
            format,
        } => {
            let entries = load_fix_file(&fixes)
                .with_context(|| format!("Failed to load fixes from {}", fixes.display()))?;

            let config = match RunConfig::from_env(dry_run) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{} {e}", "error:".red().bold());
                    std::process::exit(2);
                }
            };
            let store = build_store(&config).context("Failed to initialise issue tracker")?;

            let mut results = Vec::with_capacity(entries.len());
            for entry in &entries {
                let entry_targets = if entry.targets.is_empty() {
                    &targets
                } else {
                    &entry.targets
                };
                let result =
                    run_fix(store.clone(), &config, &entry.violation, entry_targets).await;
                if format == OutputFormat::Text {
                    print_result(&entry.violation.unique_rule_id, &result);
                }
                results.push(result);
            }

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }

            let failed = results.iter().filter(|r| !r.succeeded).count();
            if failed > 0 {
                eprintln!(
                    "{} {failed} of {} fixes failed",
                    "error:".red().bold(),
                    results.len()
                );
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
