extern crate env_logger;
extern crate serde_json;
extern crate trendscout;

pub mod curated;
pub mod options;
pub mod render;

use clap::Parser;
use options::{Cli, Commands};
use std::process::ExitCode;
use std::time::Duration;
use trendscout::{
    BatchStrategy, CancellationToken, Configuration, LogProgress, NoProgress, PacingPolicy,
    ProgressSink, RegionCode, TimeWindow, TrendAggregator,
};

/// Exit status for arguments that could not be used.
const EXIT_INVALID_INPUT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        use env_logger::Env;
        let env = Env::default()
            .filter_or("RUST_LOG", "info")
            .write_style_or("RUST_LOG_STYLE", "always");

        env_logger::init_from_env(env);
    }

    let keywords: Vec<String> = match &cli.command {
        Some(Commands::Fetch { keywords }) => keywords.clone(),
        Some(Commands::Curated) => curated::CURATED_ITEMS.iter().map(|s| s.to_string()).collect(),
        Some(Commands::Compare { selected, custom }) => match curated::comparison(selected, custom) {
            Ok(items) => items,
            Err(message) => return invalid(&message),
        },
        Some(Commands::Regions) => {
            for region in RegionCode::all() {
                let code = if region.is_worldwide() { "\"\"" } else { region.as_str() };
                println!("{:<4} {}", code, region.label());
            }
            return ExitCode::SUCCESS;
        }
        None => return ExitCode::SUCCESS,
    };

    let region = match RegionCode::parse(&cli.region) {
        Ok(region) => region,
        Err(e) => return invalid(&e.to_string()),
    };
    let window = match TimeWindow::parse(&cli.window) {
        Ok(window) => window,
        Err(e) => return invalid(&e.to_string()),
    };

    let config = configuration(&cli);
    let pacing = config.pacing;

    let aggregator = match TrendAggregator::new(config) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let planned = aggregator.plan(&keywords);
    log::info!(
        "{} batches, worst case {:?}",
        planned.len(),
        aggregator.estimated_upper_bound(planned.iter().map(|b| b.len()).sum())
    );

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupted, returning what was fetched so far");
                cancel.cancel();
            }
        });
    }

    let progress: &dyn ProgressSink = if cli.verbose { &LogProgress } else { &NoProgress };

    let table = aggregator
        .fetch_merged_with(&keywords, &region, window, pacing, &cancel, progress)
        .await;

    print!("{}", render::render(&table, &region, window, cli.format));

    ExitCode::SUCCESS
}

/// Build the library configuration from the flags.
fn configuration(cli: &Cli) -> Configuration {
    let mut config = Configuration::new();

    config
        .with_user_agent(cli.agent.as_deref())
        .with_api_url(cli.api_url.as_deref())
        .with_budget(cli.budget_secs.map(Duration::from_secs));

    if cli.single {
        config.with_batch_strategy(BatchStrategy::Single);
    }

    if let Some(retry) = cli.retry {
        config.with_retry(retry);
    }

    if cli.pace_min_ms.is_some() || cli.pace_max_ms.is_some() {
        let defaults = PacingPolicy::default();
        let low = cli
            .pace_min_ms
            .unwrap_or(defaults.low.as_millis() as u64);
        let high = cli
            .pace_max_ms
            .unwrap_or_else(|| low.max(defaults.high.as_millis() as u64));
        config.with_pacing(PacingPolicy::from_millis(low, high));
    }

    config
}

fn invalid(message: &str) -> ExitCode {
    eprintln!("{}", message);
    ExitCode::from(EXIT_INVALID_INPUT)
}
