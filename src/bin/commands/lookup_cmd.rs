use anyhow::{Context, Result};
use ip2country::LookupError;
use serde_json::json;
use std::path::PathBuf;

use crate::cli_utils::LoadArgs;

pub fn cmd_lookup(
    data: PathBuf,
    ips: Vec<String>,
    json_output: bool,
    quiet: bool,
    load: LoadArgs,
) -> Result<()> {
    let db = load.open(&data)?;

    let mut results = Vec::with_capacity(ips.len());
    let mut all_found = true;

    for ip in &ips {
        match db.lookup(ip) {
            Ok(code) => results.push((ip.as_str(), Some(code), None)),
            Err(LookupError::NotFound) => {
                all_found = false;
                results.push((ip.as_str(), None, None));
            }
            Err(LookupError::InvalidIp(e)) => {
                all_found = false;
                results.push((ip.as_str(), None, Some(e.to_string())));
            }
            Err(e @ LookupError::Init(_)) => {
                return Err(e)
                    .with_context(|| format!("Failed to load dataset: {}", data.display()));
            }
        }
    }

    if quiet {
        // Quiet mode: no output, just exit code
        std::process::exit(if all_found { 0 } else { 1 });
    }

    if json_output {
        let output: Vec<_> = results
            .iter()
            .map(|(ip, code, error)| {
                let mut entry = json!({
                    "ip": ip,
                    "country_code": code.as_deref(),
                });
                if let Some(error) = error {
                    entry["error"] = json!(error);
                }
                entry
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (ip, code, error) in &results {
            println!("{}\t{}", ip, code.as_deref().unwrap_or("-"));
            if let Some(error) = error {
                eprintln!("[WARN] {}: {}", ip, error);
            }
        }
    }

    Ok(())
}
