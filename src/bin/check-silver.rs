use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;

use dwh_etl::catalog::{Layer, TableId};
use dwh_etl::config::Config;
use dwh_etl::silver::QualityGate;
use dwh_etl::store::{SqliteWarehouse, Warehouse};

/// Re-check already-loaded silver tables against the cleaning invariants
#[derive(Parser)]
#[command(name = "check-silver")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Processing date for the birthdate check (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Maximum issues printed per table
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    println!("Opening warehouse at {}...", config.warehouse.dir.display());
    let warehouse = SqliteWarehouse::open(&config.warehouse.dir)?;
    let gate = QualityGate::new(args.date.unwrap_or_else(|| Local::now().date_naive()));

    let mut total = 0;
    for table in TableId::all() {
        let snapshot = warehouse.read_table(Layer::Silver, table)?;
        let issues = gate.assess(table, &snapshot);
        if issues.is_empty() {
            println!("OK    {} ({} rows)", table.qualified(Layer::Silver), snapshot.len());
            continue;
        }
        println!(
            "FAIL  {} ({} rows, {} issues)",
            table.qualified(Layer::Silver),
            snapshot.len(),
            issues.len()
        );
        for issue in issues.iter().take(args.limit) {
            let row = issue.row.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
            println!("      row {}: {} {}", row, issue.column, issue.description);
        }
        total += issues.len();
    }

    if total > 0 {
        eprintln!("{} quality issue(s) found", total);
        std::process::exit(1);
    }
    Ok(())
}
