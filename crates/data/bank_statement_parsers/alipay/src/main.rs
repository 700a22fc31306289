use anyhow::{Context, Result};
use std::{env, fs, path::Path};

use alipay::{AlipayParser, PARSER_NAME};
use models::Transaction;
use utils::{merge_transactions, StatementParser};

fn is_export(name: &str) -> bool {
    let lower = name.to_lowercase();
    let ext_ok = Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e, "csv" | "xlsx" | "xls"))
        .unwrap_or(false);
    ext_ok && (lower.contains(PARSER_NAME) || name.contains("支付宝"))
}

/// Parses every file in order; the first unreadable or unparsable file aborts the run.
fn parse_files(parser: &AlipayParser, files: &[String]) -> Result<Vec<Transaction>> {
    let mut all_txns = Vec::new();
    for file_path in files {
        eprintln!("📖 Parsing {} export {}", parser.source().institution(), file_path);
        let bytes = fs::read(file_path).with_context(|| format!("Cannot open {}", file_path))?;
        let txns = parser
            .parse_transactions(&bytes, file_path)
            .with_context(|| format!("Failed parsing {}", file_path))?;
        eprintln!("  ✓ Found {} transactions", txns.len());
        all_txns.extend(txns);
    }
    Ok(all_txns)
}

fn main() -> Result<()> {
    // Usage:
    //   alipay [file1.csv file2.xlsx ...] [output.json]
    //
    // If no input files specified, will auto-discover Alipay exports in current directory
    // (names containing "alipay" or "支付宝"). Without an output path the JSON goes to stdout.

    let args: Vec<String> = env::args().collect();

    let mut input_files: Vec<String> = Vec::new();
    let mut other_args: Vec<String> = Vec::new();

    for arg in args.iter().skip(1) {
        let lower = arg.to_lowercase();
        if lower.ends_with(".csv") || lower.ends_with(".xlsx") || lower.ends_with(".xls") {
            input_files.push(arg.clone());
        } else {
            other_args.push(arg.clone());
        }
    }

    if input_files.is_empty() {
        eprintln!("📂 No input files specified, scanning current directory...");
        let current_dir = env::current_dir()?;
        for entry in fs::read_dir(&current_dir)? {
            let path = entry?.path();
            if let Some(filename) = path.file_name().and_then(|s| s.to_str()) {
                if is_export(filename) {
                    input_files.push(filename.to_string());
                    eprintln!("  ✓ Found: {}", filename);
                }
            }
        }
        input_files.sort();
    }

    if input_files.is_empty() {
        eprintln!("❌ No Alipay exports found!");
        return Ok(());
    }

    let all_txns = parse_files(&AlipayParser::new(), &input_files)?;

    let (merged, stats) = merge_transactions(&[], all_txns, Default::default());
    eprintln!(
        "✓ Processed {} transactions: {} kept, {} skipped (duplicates)",
        stats.total, stats.added, stats.skipped
    );

    let json = serde_json::to_string_pretty(&merged)?;
    match other_args.first() {
        Some(out) => {
            fs::write(out, json).with_context(|| format!("Cannot write {}", out))?;
            eprintln!("✅ Written to: {}", out);
        }
        None => println!("{}", json),
    }

    Ok(())
}
