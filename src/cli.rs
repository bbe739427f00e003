use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, KindFilter};

#[derive(Parser, Debug)]
#[command(name = "scanner", version, about = "Drive listing price scanner")]
pub struct Cli {
    #[arg(long, global = true, help = "Drive kind to scan: SSD, HDD or ALL")]
    pub kind: Option<KindFilter>,
    #[arg(long, global = true, value_delimiter = ',', help = "Capacity tokens, e.g. 1TB,2TB")]
    pub caps: Vec<String>,
    #[arg(long, global = true, help = "Per-request timeout in seconds")]
    pub timeout: Option<u64>,
    #[arg(long, global = true, help = "Base wait between pages and units, seconds")]
    pub sleep: Option<f64>,
    #[arg(long, global = true, help = "Upper bound of the random extra wait, seconds")]
    pub jitter: Option<f64>,
    #[arg(long, global = true)]
    pub max_pages: Option<u32>,
    #[arg(long, global = true, help = "Keep every listing, no filtering")]
    pub raw: bool,
    #[arg(long, global = true, help = "Only keep listings naming a known brand")]
    pub brand_only: bool,
    #[arg(long, global = true, help = "Do not require the stated capacity to match the query")]
    pub no_capacity_match: bool,
    #[arg(long, global = true, help = "Save every fetched page as HTML")]
    pub debug_save_all: bool,
    #[arg(long, global = true)]
    pub low_price_ratio: Option<f64>,
    #[arg(long, global = true)]
    pub high_price_ratio: Option<f64>,
    #[arg(long, global = true, help = "Divisor for scaled prices in the gauge table")]
    pub scale: Option<u32>,
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Scrape every unit, then build the gauge tables (default).
    Scrape,
    /// Rebuild the gauge tables from existing unit logs.
    Gauge {
        #[arg(long, help = "Day to aggregate, YYYY-MM-DD (default: today)")]
        date: Option<String>,
        #[arg(long)]
        ssd_dir: Option<PathBuf>,
        #[arg(long)]
        hdd_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false, help = "Print the rows as JSON")]
        json: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Scrape)
    }

    /// Overlay flags given on the command line onto the environment config.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(kind) = self.kind {
            cfg.kind_filter = kind;
        }
        if !self.caps.is_empty() {
            cfg.caps = self
                .caps
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if let Some(v) = self.timeout {
            cfg.timeout_secs = v;
        }
        if let Some(v) = self.sleep {
            cfg.sleep_secs = v;
        }
        if let Some(v) = self.jitter {
            cfg.jitter_secs = v;
        }
        if let Some(v) = self.max_pages {
            cfg.max_pages = v;
        }
        cfg.raw |= self.raw;
        cfg.brand_only |= self.brand_only;
        if self.no_capacity_match {
            cfg.capacity_match = false;
        }
        cfg.debug_save_all |= self.debug_save_all;
        if let Some(v) = self.low_price_ratio {
            cfg.low_price_ratio = v;
        }
        if let Some(v) = self.high_price_ratio {
            cfg.high_price_ratio = v;
        }
        if let Some(v) = self.scale {
            cfg.gauge_scale = v;
        }
        if let Some(v) = &self.base_dir {
            cfg.base_dir = v.clone();
        }
        if let Some(v) = &self.base_url {
            cfg.base_url = v.clone();
        }
        if let Some(v) = &self.log_level {
            cfg.log_level = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_scrapes_with_env_config() {
        let cli = Cli::try_parse_from(["scanner"]).unwrap();
        assert_eq!(cli.command(), Commands::Scrape);
        let mut cfg = Config::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.kind_filter, KindFilter::All);
        assert!(cfg.capacity_match);
        assert_eq!(cfg.max_pages, 1);
    }

    #[test]
    fn flags_overlay_config() {
        let cli = Cli::try_parse_from([
            "scanner", "scrape", "--kind", "hdd", "--caps", "4TB, 8TB", "--max-pages", "3",
            "--no-capacity-match", "--raw", "--sleep", "0.5",
        ])
        .unwrap();
        let mut cfg = Config::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.kind_filter, KindFilter::Hdd);
        assert_eq!(cfg.caps, vec!["4TB".to_string(), "8TB".to_string()]);
        assert_eq!(cfg.max_pages, 3);
        assert!(!cfg.capacity_match);
        assert!(cfg.raw);
        assert_eq!(cfg.sleep_secs, 0.5);
    }

    #[test]
    fn gauge_subcommand_options() {
        let cli = Cli::try_parse_from([
            "scanner", "gauge", "--date", "2026-10-18", "--json", "--scale", "1000",
        ])
        .unwrap();
        match cli.command() {
            Commands::Gauge { date, json, ssd_dir, .. } => {
                assert_eq!(date.as_deref(), Some("2026-10-18"));
                assert!(json);
                assert!(ssd_dir.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        let mut cfg = Config::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.gauge_scale, 1000);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["scanner", "--kind", "tape"]).is_err());
    }
}
