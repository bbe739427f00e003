use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::classifier::{Classifier, ClassifyOptions};
use crate::config::{Config, VERSION};
use crate::error::Result;
use crate::extractor::{extract_items, has_next_page, parse_hit_count, split_items};
use crate::fetcher::{fetch_with_retry, is_blocked, PageFetcher, RetryPolicy};
use crate::pacing::Pacer;
use crate::patterns::Patterns;
use crate::pipeline::dedup::{dedup_best_offer, retain_valid};
use crate::pipeline::outlier::{filter_outliers, PriceFilterReport};
use crate::query::{keyword_from_url, page_url, resolve_target, search_url};
use crate::report::export::{csv_file_name, save_csv};
use crate::report::summary::summary_lines;
use crate::types::{ClassifiedItem, DriveKind};

// ---------------------------------------------------------------------------
// Unit log
// ---------------------------------------------------------------------------

/// Line buffer behind `<kind>_<cap>.log`. The `query(k)` and `ALL` lines it
/// carries are re-read by the gauge, so their wording is fixed.
#[derive(Debug, Default)]
pub struct UnitLog {
    lines: Vec<String>,
}

impl UnitLog {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let mut text = self.lines.join("\n");
        text.push('\n');
        fs::write(path, text)
    }
}

pub fn log_file_name(kind: DriveKind, cap: &str) -> String {
    format!("{}_{cap}.log", kind.slug())
}

/// `<kind>_<cap>_pageNN[_TAG]_debug.html`
pub fn debug_file_name(kind: DriveKind, cap: &str, page: u32, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("{}_{cap}_page{page:02}_{tag}_debug.html", kind.slug()),
        None => format!("{}_{cap}_page{page:02}_debug.html", kind.slug()),
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why pagination ended. None of these is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    ReachedMaxPages,
    NoNextPage { page: u32 },
    Blocked { page: u32, debug_file: String },
    Empty { page: u32, debug_file: String },
}

impl StopReason {
    pub fn debug_file(&self) -> Option<&str> {
        match self {
            StopReason::Blocked { debug_file, .. } | StopReason::Empty { debug_file, .. } => {
                Some(debug_file)
            }
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ReachedMaxPages => write!(f, "reached max-pages"),
            StopReason::NoNextPage { page } => write!(f, "no next page after page {page}"),
            StopReason::Blocked { debug_file, .. } => {
                write!(f, "blocked detected (debug saved: {debug_file})")
            }
            StopReason::Empty { page, .. } => write!(f, "parsed 0 items at page {page} (debug saved)"),
        }
    }
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub kind: DriveKind,
    pub cap: String,
    pub items: Vec<ClassifiedItem>,
    pub pages_fetched: u32,
    pub stop: StopReason,
    pub hit_count: Option<u64>,
    pub filter: Option<PriceFilterReport>,
    pub csv_path: PathBuf,
    pub log_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs one (kind, capacity) unit end to end: fetch, extract, classify,
/// dedup, filter, export.
pub struct UnitRunner<'a, F> {
    fetcher: &'a F,
    patterns: &'a Patterns,
    pacer: &'a Pacer,
    cfg: &'a Config,
    policy: RetryPolicy,
}

impl<'a, F: PageFetcher> UnitRunner<'a, F> {
    pub fn new(fetcher: &'a F, patterns: &'a Patterns, pacer: &'a Pacer, cfg: &'a Config) -> Self {
        Self { fetcher, patterns, pacer, cfg, policy: RetryPolicy::default() }
    }

    /// Run the unit and write its log into `out_dir`.
    ///
    /// The log is written whatever happens; a failed or cancelled unit leaves
    /// the lines it got to plus an `aborted:` line.
    pub async fn run(&self, kind: DriveKind, cap: &str, out_dir: &Path) -> Result<UnitOutcome> {
        let log_path = out_dir.join(log_file_name(kind, cap));
        let mut log = UnitLog::default();

        let result = self.execute(kind, cap, out_dir, &mut log).await;
        if let Err(e) = &result {
            log.push(format!("aborted: {e}"));
        }
        log.write_to(&log_path)?;

        let mut outcome = result?;
        outcome.log_path = log_path;
        Ok(outcome)
    }

    async fn execute(
        &self,
        kind: DriveKind,
        cap: &str,
        out_dir: &Path,
        log: &mut UnitLog,
    ) -> Result<UnitOutcome> {
        let cfg = self.cfg;
        let first_url = search_url(&cfg.base_url, kind, cap)?;
        let keyword = keyword_from_url(&first_url);
        let target = resolve_target(&self.patterns.capacity, kind, cap, &keyword);

        log.push(format!("version: {VERSION}"));
        log.push(format!("url: {first_url}"));
        if !keyword.is_empty() {
            log.push(format!("query(k): {keyword}"));
        }
        if let Some(tb) = target.target_capacity_tb {
            log.push(format!("target_capacity_tb: {tb}"));
        }
        if let Some(gb) = target.target_capacity_gb {
            log.push(format!("target_capacity_gb: {gb}"));
        }
        let mode = if cfg.raw { "raw".to_string() } else { format!("{}-filter", kind.slug()) };
        log.push(format!("mode: {mode}"));
        info!(kind = %kind, cap, url = %first_url, mode, "[UNIT] start");

        let classifier = Classifier::new(self.patterns, kind);
        let opts = ClassifyOptions {
            raw: cfg.raw,
            brand_only: cfg.brand_only,
            capacity_match: cfg.capacity_match,
        };

        let mut classified: Vec<ClassifiedItem> = Vec::new();
        let mut pages_fetched = 0u32;
        let mut hit_count = None;
        let mut stop = StopReason::ReachedMaxPages;
        let max_pages = cfg.max_pages;

        for page in 1..=max_pages {
            if page > 1 {
                self.pacer
                    .sleep(
                        cfg.sleep(),
                        cfg.jitter(),
                        &format!("page-sleep {page}/{max_pages}"),
                    )
                    .await?;
            }

            let url = page_url(&first_url, page);
            let hint = format!("page {page}/{max_pages}: ");
            let html =
                fetch_with_retry(self.fetcher, self.pacer, &self.policy, url.as_str(), cfg.timeout(), &hint)
                    .await?;

            if cfg.debug_save_all {
                save_page(out_dir, &debug_file_name(kind, cap, page, None), &html)?;
            }

            if is_blocked(&self.patterns.page, &html) {
                let debug_file = debug_file_name(kind, cap, page, Some("BLOCK"));
                save_page(out_dir, &debug_file, &html)?;
                warn!(kind = %kind, cap, page, debug_file, "[UNIT] blocked page, stopping");
                stop = StopReason::Blocked { page, debug_file };
                break;
            }

            if page == 1 {
                hit_count = parse_hit_count(&self.patterns.page, &html);
            }

            let fragments = split_items(&self.patterns.page, &html);
            if fragments.is_empty() {
                let debug_file = debug_file_name(kind, cap, page, Some("EMPTY"));
                save_page(out_dir, &debug_file, &html)?;
                warn!(kind = %kind, cap, page, debug_file, "[UNIT] no item fragments, stopping");
                stop = StopReason::Empty { page, debug_file };
                break;
            }

            let listings = extract_items(&self.patterns.page, fragments, &cfg.base_url);
            let parsed = listings.len();
            classified.extend(
                listings
                    .into_iter()
                    .map(|l| classifier.classify_listing(l, &target, opts)),
            );
            pages_fetched += 1;
            info!(
                "[UNIT] page {page}/{max_pages} parsed {parsed} items (total so far {})",
                classified.len()
            );

            if page < max_pages && !has_next_page(&self.patterns.page, &html) {
                stop = StopReason::NoNextPage { page };
                break;
            }
        }

        let retained = retain_valid(dedup_best_offer(classified), cfg.raw);
        let (items, filter) = if cfg.raw {
            (retained, None)
        } else {
            filter_outliers(retained, cfg.low_price_ratio, cfg.high_price_ratio)
        };
        if let Some(report) = filter.as_ref().filter(|r| r.removed() > 0) {
            info!(
                median = report.median,
                low = report.removed_low,
                high = report.removed_high,
                "[FILTER] price outliers removed"
            );
            log.extend(report.log_lines());
        }

        let csv_name = csv_file_name(kind, cap);
        let csv_path = out_dir.join(&csv_name);
        save_csv(&csv_path, kind, &items)?;
        log.push(format!("saved: {csv_name} rows={}", items.len()));

        if let Some(n) = hit_count {
            log.push(format!("hit_count(observed): {n}"));
        }
        log.push(format!("pages fetched: {pages_fetched} stop: {stop}"));
        if let Some(f) = stop.debug_file() {
            log.push(format!("debug_html: {f}"));
        }
        log.push(format!("version: {VERSION}"));
        log.extend(summary_lines(kind, &items));

        info!(kind = %kind, cap, rows = items.len(), pages_fetched, stop = %stop, "[UNIT] done");

        Ok(UnitOutcome {
            kind,
            cap: cap.to_string(),
            items,
            pages_fetched,
            stop,
            hit_count,
            filter,
            csv_path,
            log_path: PathBuf::new(),
        })
    }
}

fn save_page(dir: &Path, name: &str, html: &str) -> Result<()> {
    fs::write(dir.join(name), html)?;
    Ok(())
}
