mod classifier;
mod cli;
mod config;
mod error;
mod extractor;
mod fetcher;
mod pacing;
mod patterns;
mod pipeline;
mod query;
mod report;
mod types;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::config::{Config, VERSION};
use crate::error::Result;
use crate::fetcher::HttpFetcher;
use crate::pacing::Pacer;
use crate::patterns::Patterns;
use crate::pipeline::run_all;
use crate::report::gauge::{run_gauge, GaugeRequest, LogParser, DATE_FORMAT};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(mut c) => {
            cli.apply(&mut c);
            c
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = cfg.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli.command(), cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, cfg: Config) -> Result<()> {
    let parser = LogParser::new()?;
    let today = chrono::Local::now().format(DATE_FORMAT).to_string();

    match command {
        Commands::Gauge { date, ssd_dir, hdd_dir, json } => {
            let req = GaugeRequest {
                date: date.unwrap_or(today),
                base_dir: cfg.base_dir.clone(),
                ssd_dir,
                hdd_dir,
                scale: cfg.gauge_scale,
                json,
            };
            run_gauge(&parser, &req)?;
        }
        Commands::Scrape => {
            info!(
                version = VERSION,
                kinds = ?cfg.kind_filter,
                max_pages = cfg.max_pages,
                raw = cfg.raw,
                "[MAIN] scrape start"
            );

            // --- Ctrl-C abandons the current unit and skips the rest ---
            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("[MAIN] interrupt received, stopping after current wait");
                    on_signal.cancel();
                }
            });

            let patterns = Patterns::compile()?;
            let fetcher = HttpFetcher::new(&cfg.base_url)?;
            let pacer = Pacer::new(cancel);

            let tally = run_all(&cfg, &fetcher, &patterns, &pacer, &parser, &cfg.base_dir, &today).await?;
            if tally.cancelled {
                warn!(ok = tally.ok, failed = tally.failed, "[MAIN] interrupted, gauge skipped");
                return Ok(());
            }

            let req = GaugeRequest {
                date: today,
                base_dir: cfg.base_dir.clone(),
                ssd_dir: None,
                hdd_dir: None,
                scale: cfg.gauge_scale,
                json: false,
            };
            let gauges = run_gauge(&parser, &req)?;
            for g in &gauges {
                info!(kind = %g.kind, rows = g.entries.len(), table = %g.table.display(), "[MAIN] gauge table");
            }
            info!(ok = tally.ok, failed = tally.failed, "[MAIN] done");
        }
    }
    Ok(())
}
