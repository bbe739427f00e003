use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::types::DriveKind;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const BASE_URL: &str = "https://www.amazon.co.jp";

/// Search endpoint path and the `ref` tag the marketplace's own search box sends.
pub const SEARCH_PATH: &str = "/s";
pub const SEARCH_REF: &str = "nb_sb_noss_1";

pub const SSD_CAPACITIES: &[&str] = &["128GB", "256GB", "512GB", "1TB", "2TB", "4TB", "8TB"];
pub const HDD_CAPACITIES: &[&str] = &[
    "1TB", "2TB", "4TB", "6TB", "8TB", "10TB", "12TB", "14TB", "16TB", "18TB", "20TB", "22TB",
    "24TB", "26TB", "28TB",
];

/// Wait before each fetch attempt, in seconds. The length is the attempt budget.
pub const RETRY_WAITS_SECS: &[u64] = &[0, 2, 5, 9];

/// HTTP statuses that are retried; any other error status aborts the unit.
pub const RETRYABLE_STATUS: &[u16] = &[408, 429, 503, 504];

/// Listing identifier used by ad placeholders. Fragments carrying it are discarded.
pub const AD_PLACEHOLDER_ID: &str = "0000000000";

/// Pacing sleeps are sliced into ticks of this length for progress output.
pub const PROGRESS_SLICE_SECS: u64 = 1;

/// Sleeps shorter than this do not emit progress ticks.
pub const PROGRESS_MIN_SECS: f64 = 3.0;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "ja,en-US;q=0.7,en;q=0.3";

/// Capacity tolerance band used by the classifier's capacity check.
/// These are heuristics, not a unit conversion.
pub mod capacity_tolerance {
    /// TB target vs TB-stated listing.
    pub const TB_ABS: f64 = 0.2;
    /// TB target vs GB-only listing, checked against both ×1024 and ×1000.
    pub const CROSS_GB_ABS: i64 = 80;
    /// GB target vs GB listing: max(GB_FLOOR, target × GB_RATIO).
    pub const GB_FLOOR: i64 = 20;
    pub const GB_RATIO: f64 = 0.10;
}

/// Upper bound accepted for SLEEP_SECS and JITTER_SECS.
pub const MAX_WAIT_SECS: f64 = 3600.0;

/// Median-ratio outlier filter defaults.
pub const DEFAULT_LOW_PRICE_RATIO: f64 = 0.3;
pub const DEFAULT_HIGH_PRICE_RATIO: f64 = 2.5;

/// Which drive kinds a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Ssd,
    Hdd,
    All,
}

impl KindFilter {
    pub fn kinds(self) -> Vec<DriveKind> {
        match self {
            KindFilter::Ssd => vec![DriveKind::Ssd],
            KindFilter::Hdd => vec![DriveKind::Hdd],
            KindFilter::All => vec![DriveKind::Ssd, DriveKind::Hdd],
        }
    }
}

impl FromStr for KindFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SSD" => Ok(KindFilter::Ssd),
            "HDD" => Ok(KindFilter::Hdd),
            "ALL" => Ok(KindFilter::All),
            other => Err(AppError::Config(format!(
                "DRIVE_KIND must be SSD, HDD or ALL (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub base_url: String,
    /// Root for per-day output directories (BASE_DIR)
    pub base_dir: PathBuf,
    pub kind_filter: KindFilter,
    /// Explicit capacity list (DRIVE_CAPS, comma-separated). Empty = per-kind defaults.
    pub caps: Vec<String>,
    pub timeout_secs: u64,
    /// Base wait between pages and between units (SLEEP_SECS)
    pub sleep_secs: f64,
    /// Upper bound of the random extra wait (JITTER_SECS)
    pub jitter_secs: f64,
    pub max_pages: u32,
    /// Disable classification filtering and outlier removal (RAW_MODE)
    pub raw: bool,
    pub brand_only: bool,
    pub capacity_match: bool,
    /// Persist every fetched page, not only blocked/empty ones (DEBUG_SAVE_ALL)
    pub debug_save_all: bool,
    pub low_price_ratio: f64,
    pub high_price_ratio: f64,
    /// Divisor applied to prices in the gauge table (GAUGE_SCALE)
    pub gauge_scale: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            base_url: BASE_URL.to_string(),
            base_dir: PathBuf::from("."),
            kind_filter: KindFilter::All,
            caps: Vec::new(),
            timeout_secs: 40,
            sleep_secs: 10.0,
            jitter_secs: 2.0,
            max_pages: 1,
            raw: false,
            brand_only: false,
            capacity_match: true,
            debug_save_all: false,
            low_price_ratio: DEFAULT_LOW_PRICE_RATIO,
            high_price_ratio: DEFAULT_HIGH_PRICE_RATIO,
            gauge_scale: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let cfg = Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or(d.log_level),
            base_url: std::env::var("BASE_URL").unwrap_or(d.base_url),
            base_dir: std::env::var("BASE_DIR").map(PathBuf::from).unwrap_or(d.base_dir),
            kind_filter: match std::env::var("DRIVE_KIND") {
                Ok(v) => v.parse()?,
                Err(_) => d.kind_filter,
            },
            caps: std::env::var("DRIVE_CAPS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", d.timeout_secs)?,
            sleep_secs: env_parse("SLEEP_SECS", d.sleep_secs)?,
            jitter_secs: env_parse("JITTER_SECS", d.jitter_secs)?,
            max_pages: env_parse("MAX_PAGES", d.max_pages)?,
            raw: env_flag("RAW_MODE", d.raw)?,
            brand_only: env_flag("BRAND_ONLY", d.brand_only)?,
            capacity_match: env_flag("CAPACITY_MATCH", d.capacity_match)?,
            debug_save_all: env_flag("DEBUG_SAVE_ALL", d.debug_save_all)?,
            low_price_ratio: env_parse("LOW_PRICE_RATIO", d.low_price_ratio)?,
            high_price_ratio: env_parse("HIGH_PRICE_RATIO", d.high_price_ratio)?,
            gauge_scale: env_parse("GAUGE_SCALE", d.gauge_scale)?,
        };
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let ratio_ok = |r: f64| r.is_finite() && r >= 0.0;
        if !ratio_ok(self.low_price_ratio) || !ratio_ok(self.high_price_ratio) {
            return Err(AppError::Config(
                "price ratios must be finite and non-negative".to_string(),
            ));
        }
        if self.low_price_ratio > self.high_price_ratio {
            return Err(AppError::Config(format!(
                "LOW_PRICE_RATIO ({}) must not exceed HIGH_PRICE_RATIO ({})",
                self.low_price_ratio, self.high_price_ratio
            )));
        }
        if self.gauge_scale == 0 {
            return Err(AppError::Config("GAUGE_SCALE must be > 0".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config("REQUEST_TIMEOUT_SECS must be > 0".to_string()));
        }
        if self.max_pages == 0 {
            return Err(AppError::Config("MAX_PAGES must be >= 1".to_string()));
        }
        for (name, secs) in [("SLEEP_SECS", self.sleep_secs), ("JITTER_SECS", self.jitter_secs)] {
            if Duration::try_from_secs_f64(secs).is_err() || secs > MAX_WAIT_SECS {
                return Err(AppError::Config(format!(
                    "{name} must be between 0 and {MAX_WAIT_SECS} seconds (got {secs})"
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base wait between pages and between units. Zero if out of range.
    pub fn sleep(&self) -> Duration {
        Duration::try_from_secs_f64(self.sleep_secs).unwrap_or_default()
    }

    pub fn jitter(&self) -> Duration {
        Duration::try_from_secs_f64(self.jitter_secs).unwrap_or_default()
    }

    /// Capacity tokens to search for `kind`: the explicit override if given,
    /// otherwise the kind's default list.
    pub fn capacities_for(&self, kind: DriveKind) -> Vec<String> {
        if !self.caps.is_empty() {
            return self.caps.clone();
        }
        let defaults = match kind {
            DriveKind::Ssd => SSD_CAPACITIES,
            DriveKind::Hdd => HDD_CAPACITIES,
        };
        defaults.iter().map(|s| s.to_string()).collect()
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{name} has an invalid value: {v:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(AppError::Config(format!("{name} must be a boolean (got {v:?})"))),
        },
        Err(_) => Ok(default),
    }
}
