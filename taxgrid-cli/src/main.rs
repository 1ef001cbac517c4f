use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use taxgrid_ingest::ReferenceData;

mod config;
mod output;
mod run;

use config::{Overrides, init_config, load_settings};

#[derive(Parser, Debug)]
#[command(
    name = "taxgrid",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TAXGRID_BUILD_SHA"), ")"),
    about = "Convert tax research sheets into rate-engine records"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process every sheet export and write records, product items and errors
    Run {
        /// TOML config file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        sheets_dir: Option<PathBuf>,

        #[arg(long)]
        reference_dir: Option<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// 1-based header row of the sheet exports
        #[arg(long)]
        header_row: Option<usize>,

        /// Sheets processed at once
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// YYYY-MM-DD written to every record
        #[arg(long)]
        effective_date: Option<String>,

        /// Skip copying state treatments onto city geocodes
        #[arg(long)]
        no_replication: bool,
    },

    /// Write a default config file
    InitConfig {
        #[arg(long, default_value = "taxgrid.toml")]
        path: PathBuf,
    },

    /// Load the reference tables and print what was found
    Reference {
        #[arg(long, default_value = "mapping")]
        dir: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Run {
            config,
            sheets_dir,
            reference_dir,
            output_dir,
            header_row,
            max_concurrency,
            effective_date,
            no_replication,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            settings.apply(Overrides {
                sheets_dir,
                reference_dir,
                output_dir,
                header_row,
                max_concurrency,
                effective_date,
                no_replication,
            });
            if !settings.sheets_dir.is_dir() {
                bail!(
                    "sheets dir not found: {} (pass --sheets-dir <path>)",
                    settings.sheets_dir.display()
                );
            }

            let summary = run::run(Arc::new(settings), Utc::now()).await?;
            let json = serde_json::to_string_pretty(&summary).context("serialize run summary")?;
            println!("{json}");
        }

        Command::InitConfig { path } => {
            init_config(&path)?;
        }

        Command::Reference { dir } => {
            if !dir.is_dir() {
                bail!("reference dir not found: {} (pass --dir <path>)", dir.display());
            }
            let reference = ReferenceData::from_dir(&dir);
            let json = serde_json::to_string_pretty(&reference.stats())
                .context("serialize reference stats")?;
            println!("{json}");
        }
    }

    Ok(())
}
