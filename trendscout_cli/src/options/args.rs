use crate::options::sub_command::Commands;
use clap::{Parser, ValueEnum};

/// program to fetch, compare and chart search interest over time.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Build main sub commands
    #[clap(subcommand)]
    pub command: Option<Commands>,
    /// Log progress, retries and failures on standard error
    #[clap(short, long, global = true)]
    pub verbose: bool,
    /// Region code like US or GB. Leave empty for worldwide.
    #[clap(short, long, default_value = "", global = true)]
    pub region: String,
    /// Time window: 1h, 4h, 1d, 7d, 1m, 3m, 12m, 5y or all.
    #[clap(short, long, default_value = "5y", global = true)]
    pub window: String,
    /// Output format.
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    /// Query every keyword on its own instead of in groups of five.
    #[clap(long, global = true)]
    pub single: bool,
    /// Shortest pause between batches in milli seconds.
    #[clap(long, global = true)]
    pub pace_min_ms: Option<u64>,
    /// Longest pause between batches in milli seconds.
    #[clap(long, global = true)]
    pub pace_max_ms: Option<u64>,
    /// Give up on remaining batches after this many seconds.
    #[clap(long, global = true)]
    pub budget_secs: Option<u64>,
    /// Retries per request on timeouts, 429 and 5xx (0 to 3).
    #[clap(long, global = true, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub retry: Option<u8>,
    /// Upstream base url. Defaults to TRENDSCOUT_API_URL or https://trends.google.com.
    #[clap(long, global = true)]
    pub api_url: Option<String>,
    /// User-Agent
    #[clap(short, long, global = true)]
    pub agent: Option<String>,
}

/// How the merged table is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Sparkline per keyword with a summary.
    Text,
    /// One row per date, one column per keyword.
    Csv,
    /// The full table with diagnostics.
    Json,
}
