use anyhow::{Context, Result};
use ip2country::file_reader::open_source;
use ip2country::parser::parse_exact_lines;
use ip2country::{parse_ranges_file, validate_ranges, CancelToken, ParseError};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli_utils::{format_bytes, format_number, LoadArgs};

/// Outcome of a dry-run parse of a dataset
struct Report {
    lines: usize,
    records: usize,
    source_size: u64,
    parse_errors: Vec<ParseError>,
    range_error: Option<String>,
}

impl Report {
    fn is_valid(&self, strict: bool) -> bool {
        self.range_error.is_none() && !(strict && !self.parse_errors.is_empty())
    }
}

fn build_report(data: &Path, load: &LoadArgs) -> Result<Report> {
    let config = load.to_config()?;

    if load.exact {
        let source = open_source(data, config.max_file_size)
            .with_context(|| format!("Failed to open dataset: {}", data.display()))?;
        let outcome = parse_exact_lines(source.reader, &config, &CancelToken::none())
            .with_context(|| format!("Failed to read dataset: {}", data.display()))?;
        return Ok(Report {
            lines: outcome.lines,
            records: outcome.records.len(),
            source_size: source.size,
            parse_errors: outcome.errors,
            range_error: None,
        });
    }

    let outcome = parse_ranges_file(data, &config)
        .with_context(|| format!("Failed to read dataset: {}", data.display()))?;
    let range_error = validate_ranges(&outcome.records)
        .err()
        .map(|e| e.to_string());
    Ok(Report {
        lines: outcome.lines,
        records: outcome.records.len(),
        source_size: outcome.source_size,
        parse_errors: outcome.errors,
        range_error,
    })
}

pub fn cmd_validate(data: PathBuf, json_output: bool, strict: bool, load: LoadArgs) -> Result<()> {
    let start = Instant::now();
    let report = build_report(&data, &load)?;
    let duration = start.elapsed();
    let is_valid = report.is_valid(strict);

    if json_output {
        let parse_errors: Vec<_> = report
            .parse_errors
            .iter()
            .map(|e| {
                json!({
                    "line": e.line,
                    "content": e.content,
                    "error": e.cause.to_string(),
                })
            })
            .collect();
        let output = json!({
            "dataset": data.display().to_string(),
            "mode": load.mode(),
            "is_valid": is_valid,
            "duration_ms": duration.as_millis(),
            "file_size": report.source_size,
            "lines": report.lines,
            "records": report.records,
            "parse_errors": parse_errors,
            "range_error": report.range_error,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Validating: {}", data.display());
        println!("Mode:       {}", load.mode());
        println!();

        println!("Statistics:");
        println!("  File size:  {}", format_bytes(report.source_size));
        println!("  Lines:      {}", format_number(report.lines));
        println!("  Records:    {}", format_number(report.records));
        println!("  Validation time: {}ms", duration.as_millis());
        println!();

        if let Some(ref error) = report.range_error {
            println!("❌ ERROR: {}", error);
            println!();
        }

        if !report.parse_errors.is_empty() {
            let label = if strict { "❌ ERRORS" } else { "⚠️  WARNINGS" };
            println!("{} ({} malformed line(s)):", label, report.parse_errors.len());
            for error in &report.parse_errors {
                println!("  • {}", error);
            }
            println!();
        }

        if is_valid {
            println!("✅ VALIDATION PASSED");
        } else {
            println!("❌ VALIDATION FAILED");
            println!("   The dataset would be rejected or served incompletely.");
        }
    }

    // Exit with appropriate code
    if is_valid {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
