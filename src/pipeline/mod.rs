pub mod dedup;
pub mod outlier;
pub mod unit;

use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::fetcher::PageFetcher;
use crate::pacing::Pacer;
use crate::patterns::Patterns;
use crate::report::gauge::{scrape_dir, LogParser};

use unit::UnitRunner;

/// Unit counts for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunTally {
    pub ok: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Scrape every (kind, capacity) unit the config selects, one at a time.
///
/// A failed unit is logged and counted and the run moves on. Cancellation stops
/// the whole run; units already written stay on disk.
pub async fn run_all<F: PageFetcher>(
    cfg: &Config,
    fetcher: &F,
    patterns: &Patterns,
    pacer: &Pacer,
    parser: &LogParser,
    base: &Path,
    date: &str,
) -> Result<RunTally> {
    let runner = UnitRunner::new(fetcher, patterns, pacer, cfg);
    let mut tally = RunTally::default();
    let mut first = true;

    'kinds: for kind in cfg.kind_filter.kinds() {
        let out_dir = scrape_dir(base, kind, date);
        fs::create_dir_all(&out_dir)?;
        let caps = cfg.capacities_for(kind);
        info!(kind = %kind, units = caps.len(), dir = %out_dir.display(), "[RUN] kind start");

        for (i, cap) in caps.iter().enumerate() {
            if !first {
                let label = format!("unit-sleep {kind} {}/{}", i + 1, caps.len());
                let waited = pacer
                    .sleep(
                        cfg.sleep(),
                        cfg.jitter(),
                        &label,
                    )
                    .await;
                if let Err(AppError::Cancelled) = waited {
                    tally.cancelled = true;
                    break 'kinds;
                }
                waited?;
            }
            first = false;

            match runner.run(kind, cap, &out_dir).await {
                Ok(out) => {
                    tally.ok += 1;
                    info!(
                        kind = %out.kind,
                        cap = %out.cap,
                        rows = out.items.len(),
                        pages = out.pages_fetched,
                        hit_count = ?out.hit_count,
                        outliers = out.filter.as_ref().map_or(0, |f| f.removed()),
                        csv = %out.csv_path.display(),
                        log = %out.log_path.display(),
                        stop = %out.stop,
                        "[RUN] unit ok"
                    );
                }
                Err(AppError::Cancelled) => {
                    warn!(kind = %kind, cap = %cap, "[RUN] cancelled");
                    tally.cancelled = true;
                    break 'kinds;
                }
                Err(e) => {
                    tally.failed += 1;
                    error!(kind = %kind, cap = %cap, "[RUN] unit failed: {e}");
                }
            }
        }

        for line in parser.kind_summary(&out_dir)? {
            info!("[SUMMARY] {line}");
        }
    }

    info!(ok = tally.ok, failed = tally.failed, cancelled = tally.cancelled, "[RUN] done");
    Ok(tally)
}
