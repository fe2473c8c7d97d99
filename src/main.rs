use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use dwh_etl::catalog::Layer;
use dwh_etl::config::Config;
use dwh_etl::digest::digest_layer;
use dwh_etl::error::{EtlError, Result};
use dwh_etl::pipeline::{write_report, Pipeline, Stage};
use dwh_etl::store::SqliteWarehouse;
use dwh_etl::{logging, metrics};

#[derive(Parser)]
#[command(name = "dwh_etl")]
#[command(about = "Bronze and silver warehouse loads for CRM and ERP extracts")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to ./dwh.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON run report to this path
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and recreate every warehouse table
    Setup,
    /// Reload the bronze layer from the CSV extracts
    Bronze,
    /// Clean bronze into the silver layer
    Silver {
        /// Processing date for the birthdate rule (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Run setup, bronze and silver in sequence
    Run {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the content digest of a layer
    Digest {
        #[arg(long, default_value = "silver")]
        layer: String,
    },
}

fn parse_layer(layer: &str) -> Result<Layer> {
    match layer {
        "bronze" => Ok(Layer::Bronze),
        "silver" => Ok(Layer::Silver),
        other => Err(EtlError::Config(format!("Unknown layer '{}'", other))),
    }
}

fn execute(cli: Cli, config: &Config) -> Result<()> {
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;
    let today = Local::now().date_naive();

    let (stages, date): (&[Stage], Option<NaiveDate>) = match cli.command {
        Commands::Setup => (&[Stage::Setup], None),
        Commands::Bronze => (&[Stage::Bronze], None),
        Commands::Silver { date } => (&[Stage::Silver], date),
        Commands::Run { date } => (&Stage::ALL[..], date),
        Commands::Digest { layer } => {
            let digest = digest_layer(&warehouse, parse_layer(&layer)?)?;
            for table in &digest.tables {
                println!("{}  {} ({} rows)", table.sha256, table.table, table.rows);
            }
            println!("{}  {}", digest.sha256, digest.layer);
            return Ok(());
        }
    };

    let report = Pipeline::new(&warehouse, config, date.unwrap_or(today)).run_stages(stages)?;
    if let Some(path) = &cli.report {
        write_report(path, &report)?;
    }
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let guard = logging::init_logging(&config.logging);
    metrics::init_metrics();
    info!(warehouse = %config.warehouse.dir.display(), "Starting");

    let outcome = execute(cli, &config);

    if let Some(path) = &config.metrics.textfile {
        if let Err(e) = metrics::write_textfile(path) {
            error!("Failed to write metrics textfile {}: {}", path.display(), e);
        }
    }

    if let Err(e) = outcome {
        error!("{}", e);
        // Flush buffered file logs before exiting
        drop(guard);
        std::process::exit(1);
    }
}
