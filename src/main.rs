//! limpiar CLI - prepare raw records and load the warehouse.
//!
//! A thin wrapper over the library: it resolves a [`Config`] from the
//! command line and invokes the pipelines and the loader. No cleaning or
//! loading policy lives here.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::uninlined_format_args)]

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use limpiar::{load_prepared, prepare_all, Config, DomainPipeline, RecordSet, Scrubber};

/// limpiar - Record Cleaning and Warehouse Loading in Pure Rust
#[derive(Parser)]
#[command(name = "limpiar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean raw CSVs into prepared CSVs
    Prepare {
        /// Data directory root (expects raw/ inside, writes prepared/)
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Prepare a single domain (customers, products, sales)
        #[arg(long)]
        domain: Option<String>,
    },
    /// Rebuild the warehouse from the prepared CSVs
    Load {
        /// Data directory root
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Prepare all domains, then rebuild the warehouse
    Run {
        /// Data directory root
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Report null and duplicate counts for a CSV file
    Check {
        /// Path to a CSV file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let ok = match cli.command {
        Commands::Prepare { data_dir, domain } => {
            cmd_prepare(&Config::from_data_root(data_dir), domain.as_deref())
        }
        Commands::Load { data_dir } => cmd_load(&Config::from_data_root(data_dir)),
        Commands::Run { data_dir } => {
            let config = Config::from_data_root(data_dir);
            cmd_prepare(&config, None) && cmd_load(&config)
        }
        Commands::Check { path } => cmd_check(&path),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Console logging with `RUST_LOG` override.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("limpiar=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn cmd_prepare(config: &Config, domain: Option<&str>) -> bool {
    let runs = match domain {
        Some(name) => match DomainPipeline::by_name(name) {
            Some(pipeline) => {
                let result = pipeline.run(config);
                vec![limpiar::DomainRun {
                    domain: name.to_string(),
                    result,
                }]
            }
            None => {
                eprintln!("Unknown domain '{name}' (expected customers, products, or sales)");
                return false;
            }
        },
        None => prepare_all(config),
    };

    let mut ok = true;
    for run in &runs {
        match &run.result {
            Ok(outcome) => match &outcome.output {
                Some(path) => println!(
                    "{}: {} -> {} rows, wrote {}",
                    run.domain,
                    outcome.rows_in,
                    outcome.rows_out,
                    path.display()
                ),
                None => println!("{}: no records to process", run.domain),
            },
            Err(error) => {
                eprintln!("{}: {error}", run.domain);
                ok = false;
            }
        }
    }

    ok
}

fn cmd_load(config: &Config) -> bool {
    match load_prepared(config) {
        Ok(summary) => {
            println!(
                "dim_customer: {} rows ({} duplicate keys dropped)",
                summary.customers.inserted, summary.customers.duplicate_keys_dropped
            );
            println!(
                "dim_product: {} rows ({} duplicate keys dropped)",
                summary.products.inserted, summary.products.duplicate_keys_dropped
            );
            println!("fact_sales: {} rows", summary.facts);
            true
        }
        Err(error) => {
            eprintln!("Warehouse load failed: {error}");
            false
        }
    }
}

fn cmd_check(path: &Path) -> bool {
    let records = match RecordSet::from_csv(path) {
        Ok(records) => records,
        Err(error) => {
            eprintln!("Cannot read {}: {error}", path.display());
            return false;
        }
    };

    let summaries = records.describe();
    let scrubber = Scrubber::new(records);
    let report = scrubber.consistency_report();

    println!("{}:", path.display());
    for summary in &summaries {
        match &summary.numeric {
            Some(stats) => println!(
                "  {}: {} null(s), {} distinct, min {} max {} mean {:.2}",
                summary.name, summary.nulls, summary.distinct, stats.min, stats.max, stats.mean
            ),
            None => println!(
                "  {}: {} null(s), {} distinct",
                summary.name, summary.nulls, summary.distinct
            ),
        }
    }
    println!("  duplicate rows: {}", report.duplicate_rows);
    if report.is_clean() {
        println!("  clean");
    }

    true
}
