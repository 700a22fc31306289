use anyhow::{Context, Result};
use std::{env, fs};

use utils::{merge_transactions, StatementParser};
use wechat::{WeChatXlsxParser, PARSER_NAME};

fn main() -> Result<()> {
    // Usage:
    //   wechat [file1.xlsx file2.xlsx ...] [output.json]
    //
    // If no .xlsx files specified, will auto-discover WeChat exports in current directory
    // (names containing "wechat" or "微信"). Without an output path the JSON goes to stdout.

    let args: Vec<String> = env::args().collect();

    let mut xlsx_files: Vec<String> = Vec::new();
    let mut other_args: Vec<String> = Vec::new();

    for arg in args.iter().skip(1) {
        if arg.to_lowercase().ends_with(".xlsx") {
            xlsx_files.push(arg.clone());
        } else {
            other_args.push(arg.clone());
        }
    }

    if xlsx_files.is_empty() {
        eprintln!("📂 No .xlsx files specified, scanning current directory...");
        for entry in fs::read_dir(".").context("Cannot read current directory")? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                let lower = name.to_lowercase();
                if (lower.contains(PARSER_NAME) || name.contains("微信")) && lower.ends_with(".xlsx") {
                    xlsx_files.push(name.to_string());
                    eprintln!("  ✓ Found: {}", name);
                }
            }
        }
        xlsx_files.sort();
    }

    if xlsx_files.is_empty() {
        eprintln!("❌ No .xlsx input files found (expected wechat*.xlsx / 微信*.xlsx or explicit paths).");
        return Ok(());
    }

    let parser = WeChatXlsxParser::new();
    let mut all_txns = Vec::new();

    for p in &xlsx_files {
        eprintln!("📖 Parsing {} export {}", parser.source().institution(), p);
        let bytes = fs::read(p).with_context(|| format!("Cannot read {}", p))?;
        let txns = parser
            .parse_transactions(&bytes, p)
            .with_context(|| format!("Failed parsing {}", p))?;
        eprintln!("  • {}: {} transactions", p, txns.len());
        all_txns.extend(txns);
    }

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
