//! Ticker Pulse CLI
//!
//! `run` performs one crawl-and-alert invocation; schedule it externally.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use ticker_pulse::crawl::inspect_symbol;
use ticker_pulse::forums::RedditForum;
use ticker_pulse::logging::{init_tracing, LogFile};
use ticker_pulse::pipeline::build_resolver;
use ticker_pulse::providers::YahooFinance;
use ticker_pulse::{
    Api, ApiRateLimits, ArchiveOutcome, LogArchiver, Pipeline, PulseConfig, RateLimited,
    Resolution, RunStore,
};

#[derive(Parser)]
#[command(name = "ticker-pulse")]
#[command(about = "Reddit ticker-mention crawler with trend alerts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl, resolve, evaluate trends and alert once
    Run,

    /// Resolve company names for the newest run's relevant symbols
    Resolve,

    /// Count one symbol's mentions with per-thread detail
    Check {
        symbol: String,
        #[arg(long, default_value = "wallstreetbets")]
        subreddit: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Archive the crawl log, skipping identical copies
    Archive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PulseConfig::from_env().context("invalid configuration")?;
    // `archive` only moves the log; opening it here would always create one
    let log_path = config.log_path();
    let log_file = match cli.command {
        Commands::Archive => init_tracing(None)?,
        _ => init_tracing(Some(&log_path))?,
    };

    let limits = Arc::new(ApiRateLimits::new(&config.rate_limits));

    match cli.command {
        Commands::Run => {
            let pipeline = Pipeline::from_config(&config, limits)?;
            match pipeline.run_once().await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    triggers = report.triggers.len(),
                    unresolved = report.unresolved.len(),
                    "Run complete"
                ),
                Err(e) => tracing::error!(error = %e, "Run failed"),
            }
            archive_log(&config, log_file.as_ref());
        }
        Commands::Resolve => {
            let primary = Arc::new(RateLimited::new(
                YahooFinance::new(),
                Arc::clone(&limits),
                Api::MarketData,
            ));
            let resolver = build_resolver(&config, &limits)?.with_primary(primary);

            let latest = RunStore::new(config.runs_dir())
                .latest()
                .context("failed to read runs")?;
            let Some(run) = latest else {
                println!("No runs stored in {}", config.runs_dir().display());
                return Ok(());
            };

            let resolutions = resolver.resolve_batch(run.relevant.keys().cloned()).await;
            for (symbol, resolution) in &resolutions {
                match resolution {
                    Resolution::Cached(entry) | Resolution::Resolved(entry) => {
                        println!("{:<6} {} ({})", symbol, entry.company_name, entry.provider)
                    }
                    Resolution::Unresolved => println!("{:<6} -", symbol),
                }
            }
        }
        Commands::Check {
            symbol,
            subreddit,
            json,
        } => {
            let forum = RateLimited::new(
                RedditForum::new(config.require_reddit()?),
                Arc::clone(&limits),
                Api::Forum,
            );
            let symbol = symbol.trim().trim_start_matches('$').to_uppercase();

            match inspect_symbol(&forum, &subreddit, &symbol, &config.crawl).await {
                Ok(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
                Ok(report) => {
                    println!(
                        "{} in r/{}: {} mentions in {} of {} threads",
                        report.symbol,
                        report.section,
                        report.total(),
                        report.threads.len(),
                        report.threads_checked
                    );
                    for (variant, count) in report.variants() {
                        println!("  {:<8} {}", variant, count);
                    }
                    for thread in &report.threads {
                        println!(
                            "- [{} post / {} comments] {}",
                            thread.post_hits, thread.comment_hits, thread.title
                        );
                        if let Some(url) = &thread.url {
                            println!("  {}", url);
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, symbol = %symbol, "Check failed"),
            }
        }
        Commands::Archive => archive_log(&config, log_file.as_ref()),
    }

    Ok(())
}

/// Close the file layer first so later events stay out of the archive.
fn archive_log(config: &PulseConfig, log_file: Option<&LogFile>) {
    if let Some(file) = log_file {
        file.close();
    }
    let outcome = LogArchiver::new().archive(
        &config.log_path(),
        &config.archive_dir(),
        config.log_keep_last,
    );
    match outcome {
        Ok(ArchiveOutcome::Archived { entry, pruned }) => tracing::info!(
            path = %entry.file_path.display(),
            pruned = pruned.len(),
            "Log archived"
        ),
        Ok(ArchiveOutcome::Duplicate { existing }) => {
            tracing::info!(existing = %existing.display(), "Log already archived")
        }
        Ok(ArchiveOutcome::Missing) => tracing::debug!("No log to archive"),
        Err(e) => tracing::error!(error = %e, "Log archiving failed"),
    }
}
