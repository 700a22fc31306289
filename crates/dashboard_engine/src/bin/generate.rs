use anyhow::{Context, Result};
use dashboard_engine::{filter_by_date_range, generate_dashboard, write_dashboard_json};
use models::{DateRange, Transaction};
use std::env;
use std::fs;
use std::path::PathBuf;

fn arg_value(flag: &str) -> Option<String> {
    env::args()
        .position(|a| a == flag)
        .and_then(|i| env::args().nth(i + 1))
}

fn main() -> Result<()> {
    let input = arg_value("--transactions").unwrap_or("transactions.json".to_string());
    let out = arg_value("--out").unwrap_or("dashboard/dashboard.json".to_string());
    let from = arg_value("--from")
        .map(|s| s.parse().with_context(|| format!("Invalid --from date '{}'", s)))
        .transpose()?;
    let to = arg_value("--to")
        .map(|s| s.parse().with_context(|| format!("Invalid --to date '{}'", s)))
        .transpose()?;

    let input_path = PathBuf::from(&input);
    let out_path = PathBuf::from(&out);

    println!(
        "Generating dashboard...\n  transactions: {}\n  output      : {}",
        input_path.display(),
        out_path.display()
    );

    let raw = fs::read_to_string(&input_path)
        .with_context(|| format!("Reading {}", input_path.display()))?;
    let txns: Vec<Transaction> =
        serde_json::from_str(&raw).with_context(|| format!("Parsing {}", input_path.display()))?;
    let txns = filter_by_date_range(&txns, &DateRange::new(from, to));

    let dashboard = generate_dashboard(&txns);
    write_dashboard_json(&dashboard, &out_path).context("write dashboard.json")?;

    println!(
        "Done. {} transactions, generated at {}",
        dashboard.summary.transaction_count, dashboard.metadata.generated_at
    );
    Ok(())
}
