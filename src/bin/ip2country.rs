mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli_utils::LoadArgs;
use commands::{cmd_bench, cmd_lookup, cmd_stats, cmd_validate, cmd_watch};

#[derive(Parser)]
#[command(name = "ip2country")]
#[command(
    about = "Resolve IPv4 addresses to country codes",
    long_about = "ip2country - Fast IPv4 to country code lookups\n\n\
    Load a range dataset (start_ip,end_ip,country_code) or an exact-match \n\
    dataset (ip,country_code) and resolve addresses against it. Addresses \n\
    may be dotted-decimal or unsigned 32-bit integers.\n\n\
    Examples:\n\
      ip2country lookup dbip-country-lite.csv 8.8.8.8 1.0.1.15\n\
      ip2country lookup --exact hosts.csv 10.0.0.1 --json\n\
      ip2country validate dbip-country-lite.csv.gz --skip-header\n\
      ip2country stats dbip-country-lite.csv\n\
      tail -f access.ips | ip2country watch dbip-country-lite.csv\n\
      ip2country bench dbip-country-lite.csv --threads 8"
)]
#[command(version)]
struct Cli {
    /// Log load and reload events to stderr (RUST_LOG overrides the filter)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one or more addresses
    Lookup {
        /// Dataset file (plain or .gz)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Addresses to resolve
        #[arg(value_name = "IP", required = true)]
        ips: Vec<String>,

        /// Output results as a JSON array
        #[arg(short, long)]
        json: bool,

        /// Quiet mode - no output, only exit code (0 = all found, 1 = otherwise)
        #[arg(short, long)]
        quiet: bool,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Check a dataset for malformed lines and overlapping ranges
    Validate {
        /// Dataset file (plain or .gz)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Output results as JSON
        #[arg(short, long)]
        json: bool,

        /// Treat malformed lines as errors instead of warnings
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Load a dataset and print its statistics as JSON
    Stats {
        /// Dataset file (plain or .gz)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Resolve addresses read from stdin, reloading when the dataset changes
    Watch {
        /// Dataset file (plain or .gz)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Delay between a file change and the reload, in milliseconds
        #[arg(long, default_value = "200")]
        debounce_ms: u64,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Measure multi-threaded lookup throughput
    Bench {
        /// Dataset file (plain or .gz)
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Number of worker threads (default: all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Number of lookups to perform
        #[arg(short = 'n', long, default_value = "1000000")]
        queries: usize,

        /// Share of queries that repeat an earlier address (0-100)
        #[arg(long, default_value = "80")]
        repeat_rate: usize,

        /// Lookups handed to a worker at a time
        #[arg(long, default_value = "1024")]
        batch_size: usize,

        #[command(flatten)]
        load: LoadArgs,
    },
}

fn init_tracing(verbose: bool) {
    if !verbose && std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let default_filter = if verbose {
        "ip2country=debug"
    } else {
        "ip2country=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Lookup {
            data,
            ips,
            json,
            quiet,
            load,
        } => cmd_lookup(data, ips, json, quiet, load),
        Commands::Validate {
            data,
            json,
            strict,
            load,
        } => cmd_validate(data, json, strict, load),
        Commands::Stats { data, load } => cmd_stats(data, load),
        Commands::Watch {
            data,
            debounce_ms,
            load,
        } => cmd_watch(data, debounce_ms, load),
        Commands::Bench {
            data,
            threads,
            queries,
            repeat_rate,
            batch_size,
            load,
        } => cmd_bench(data, threads, queries, repeat_rate, batch_size, load),
    }
}
