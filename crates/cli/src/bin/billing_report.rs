use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use data_pipeline::{Config, JsonFileExporter, Report, RetryPolicy, export_with_retry};
use models::{CURRENCY_SYMBOL, DateRange, MergeMode, TxnType};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "billing_report",
    about = "Summarize WeChat Pay and Alipay statement exports."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Income, expense and net totals
    Summary(InputArgs),
    /// Per-category totals for one transaction type
    Categories {
        #[command(flatten)]
        input: InputArgs,
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        kind: TxnType,
    },
    /// Income and expense per ISO week
    Weekly(InputArgs),
    /// The merged transactions, newest first
    Transactions {
        #[command(flatten)]
        input: InputArgs,
        /// Only print the first N rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write the export report file
    Export {
        #[command(flatten)]
        input: InputArgs,
        /// Output directory; defaults to export.output_dir from the settings
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Statement exports (.xlsx, .xls, .csv)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Settings file; defaults to ./settings.json when present
    #[arg(long)]
    settings: Option<PathBuf>,

    /// cumulative or replace; defaults to the settings value
    #[arg(long)]
    mode: Option<MergeMode>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl InputArgs {
    fn config(&self) -> Config {
        Config {
            files: self.files.clone(),
            settings_file: self.settings.clone(),
            mode: self.mode,
            date_range: DateRange::new(self.from, self.to),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init("warn");

    match cli.command {
        Command::Summary(input) => {
            let report = load(&input).await?;
            print_summary(&report, input.json)
        }
        Command::Categories { input, kind } => {
            let report = load(&input).await?;
            let stats = report.session.category_stats(kind);
            if input.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{} categories", kind);
                for s in &stats {
                    println!(
                        "  {:<16} {}{:>12} {:>5} txns {:>6.2}%",
                        s.category, CURRENCY_SYMBOL, s.amount, s.count, s.percentage
                    );
                }
            }
            Ok(())
        }
        Command::Weekly(input) => {
            let report = load(&input).await?;
            let weeks = report.session.weekly_series();
            if input.json {
                println!("{}", serde_json::to_string_pretty(&weeks)?);
            } else {
                for w in &weeks {
                    println!(
                        "{} ({})  income {}{}  expense {}{}",
                        w.week, w.week_start, CURRENCY_SYMBOL, w.income, CURRENCY_SYMBOL, w.expense
                    );
                }
            }
            Ok(())
        }
        Command::Transactions { input, limit } => {
            let report = load(&input).await?;
            let txns = report.session.filtered_transactions();
            let shown = &txns[..limit.unwrap_or(txns.len()).min(txns.len())];
            if input.json {
                println!("{}", serde_json::to_string_pretty(shown)?);
            } else {
                for t in shown {
                    println!(
                        "{}  {:<7} {}{:>10}  {:<12} {} ({})",
                        t.transaction_time,
                        t.kind.as_str(),
                        CURRENCY_SYMBOL,
                        t.amount,
                        t.category,
                        t.counterparty,
                        t.source
                    );
                }
                println!("{} of {} transactions", shown.len(), txns.len());
            }
            Ok(())
        }
        Command::Export { input, out } => {
            let report = load(&input).await?;
            let snapshot = report.session.export_snapshot();
            let dir = out.unwrap_or_else(|| report.settings.export.output_dir.clone());
            let exporter = JsonFileExporter::new(dir);
            let path = export_with_retry(
                &exporter,
                &snapshot,
                RetryPolicy::from(&report.settings.export),
            )
            .await
            .context("Exporting report")?;

            if input.json {
                let out = json!({
                    "path": path.display().to_string(),
                    "transaction_count": snapshot.transaction_count,
                    "date_range_label": snapshot.date_range_label,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "Exported {} transactions to {}",
                    snapshot.transaction_count,
                    path.display()
                );
            }
            Ok(())
        }
    }
}

async fn load(input: &InputArgs) -> Result<Report> {
    if let (Some(from), Some(to)) = (input.from, input.to) {
        anyhow::ensure!(from <= to, "--from {} is after --to {}", from, to);
    }
    let report = data_pipeline::run(input.config()).await?;
    if report.stats.has_duplicates() {
        eprintln!("Skipped {} duplicate transactions", report.stats.skipped);
    }
    Ok(report)
}

fn print_summary(report: &Report, as_json: bool) -> Result<()> {
    let Some(summary) = report.session.summary() else {
        println!("No transactions loaded");
        return Ok(());
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Transactions: {}", summary.transaction_count);
    println!(
        "Period:       {} - {}",
        summary.date_range.start, summary.date_range.end
    );
    println!("Income:       {}{}", CURRENCY_SYMBOL, summary.total_income);
    println!("Expense:      {}{}", CURRENCY_SYMBOL, summary.total_expense);
    println!("Net:          {}{}", CURRENCY_SYMBOL, summary.net_income);
    Ok(())
}
