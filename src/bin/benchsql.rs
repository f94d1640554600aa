//! benchsql: annotated SQL workloads from the command line
//!
//! # Usage
//!
//! ```bash
//! # Show the workloads in a SQL file
//! benchsql parse tpcb.sql
//!
//! # List inline generator overrides
//! benchsql tokens tpcb.sql
//!
//! # Fill a skeleton and resolve overrides
//! benchsql build tpcb.sql --skeleton tpcb.json --output tpcb.built.json
//!
//! # Print one node of a descriptor tree
//! benchsql lookup tpcb.built.json tpcb/transaction/transfer
//! ```

use anyhow::{Context, Result};
use benchsql::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "benchsql")]
#[command(version)]
#[command(about = "Annotated SQL for benchmark workloads", long_about = None)]
#[command(after_help = "EXAMPLES:
    benchsql parse tpcb.sql --format json
    benchsql build tpcb.sql --skeleton tpcb.json --deny-unresolved
    benchsql lookup tpcb.json tpcb/transaction/transfer/debit")]
struct Cli {
    /// Configuration file (default: ./benchsql.toml, then the user config dir)
    #[arg(long, global = true, env = "BENCHSQL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse annotated SQL and print the workloads found
    Parse {
        /// Annotated SQL file
        sql: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List generator override tokens per query
    Tokens {
        /// Annotated SQL file
        sql: PathBuf,
    },
    /// Fill skeleton workloads with SQL and resolve overrides
    Build {
        /// Annotated SQL file
        sql: PathBuf,

        /// Skeleton workloads (JSON array)
        #[arg(short, long)]
        skeleton: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail if override tokens remain after templating
        #[arg(long)]
        deny_unresolved: bool,
    },
    /// Print a node of a descriptor tree
    Lookup {
        /// Workload descriptors (JSON array)
        descriptors: PathBuf,

        /// workload[/query|transaction[/name[/nested]]]
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config, cli.verbose);

    match &cli.command {
        Commands::Parse { sql, format } => parse_file(sql, *format, &config),
        Commands::Tokens { sql } => list_tokens(sql),
        Commands::Build {
            sql,
            skeleton,
            output,
            deny_unresolved,
        } => {
            let mut options = config.build_options();
            if *deny_unresolved {
                options = options.deny_unresolved(true);
            }
            build_file(sql, skeleton, output.as_deref(), &options, &config)
        }
        Commands::Lookup { descriptors, path } => lookup_path(descriptors, path),
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_workloads(path: &Path) -> Result<Vec<WorkloadDescriptor>> {
    let content = read_source(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid descriptor JSON in {}", path.display()))
}

fn to_json<T: Serialize + ?Sized>(value: &T, config: &Config) -> Result<String> {
    let json = if config.output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn parse_file(path: &Path, format: OutputFormat, config: &Config) -> Result<()> {
    let workloads = benchsql::parse(&read_source(path)?)?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&workloads, config)?),
        OutputFormat::Text => {
            for workload in &workloads {
                print!("{}", workload);
            }
            let queries: usize = workloads.iter().map(|w| w.queries().count()).sum();
            eprintln!(
                "{} {} workload(s), {} query(ies)",
                "✓".green(),
                workloads.len(),
                queries
            );
        }
    }
    Ok(())
}

fn list_tokens(path: &Path) -> Result<()> {
    let workloads = benchsql::parse(&read_source(path)?)?;

    let mut total = 0;
    for workload in &workloads {
        for query in workload.queries() {
            let matches = extract_generator_syntax(&query.sql);
            if matches.is_empty() {
                continue;
            }
            println!("{}/{}", workload.name.cyan().bold(), query.name.cyan());
            for m in matches {
                let bound = |b: Option<f64>| b.map(format_bound).unwrap_or_else(|| "-".to_string());
                println!(
                    "  {:30} {} min={} max={} unique={} -> {}",
                    m.full_match.yellow(),
                    m.name.white(),
                    bound(m.min),
                    bound(m.max),
                    m.unique,
                    m.derived_name().green()
                );
                total += 1;
            }
        }
    }

    if total == 0 {
        println!("{}", "(no override tokens)".dimmed());
    }
    Ok(())
}

fn build_file(
    sql: &Path,
    skeleton: &Path,
    output: Option<&Path>,
    options: &BuildOptions,
    config: &Config,
) -> Result<()> {
    let source = read_source(sql)?;
    let mut workloads = read_workloads(skeleton)?;

    let report = benchsql::pipeline::build(&source, &mut workloads, options)?;
    let json = to_json(&workloads, config)?;

    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote workloads to {}", "✓".green(), path.display().to_string().cyan());
        }
        None => println!("{}", json),
    }

    eprintln!("{}", report.to_string().dimmed());
    Ok(())
}

fn lookup_path(descriptors: &Path, path: &str) -> Result<()> {
    let workloads = read_workloads(descriptors)?;
    let node = lookup(&workloads, path)?;
    println!("{}", node.to_json()?);
    Ok(())
}
