//! Re-aggregation of per-unit logs into the per-capacity price table.
//!
//! Only the contractual `ALL ...` and `query(k): ...` lines are read, so any log
//! written by a unit (or by hand) in that grammar is accepted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration as ChronoDuration, NaiveDate};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::{fmt_tb, fmt_thousands, CapacityRow, DriveKind, PriceStat};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `<base>/<kind>_scrape_<date>`
pub fn scrape_dir(base: &Path, kind: DriveKind, date: &str) -> PathBuf {
    base.join(format!("{}_scrape_{date}", kind.slug()))
}

pub fn table_path(base: &Path, kind: DriveKind, date: &str) -> PathBuf {
    base.join(format!("{}_price_{date}.tsv", kind.slug()))
}

/// The day before `date`, `None` when `date` is not `YYYY-MM-DD`.
pub fn previous_day(date: &str) -> Option<String> {
    let d = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    Some((d - ChronoDuration::days(1)).format(DATE_FORMAT).to_string())
}

#[derive(Debug)]
pub struct LogParser {
    all: Regex,
    query: Regex,
    tb: Regex,
    gb: Regex,
    number: Regex,
    file_tb: Regex,
}

impl LogParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            all: Regex::new(r"(?m)^ALL\s+min\s+(\d+)\s+avg\s+(\d+)\s+max\s+(\d+)\s+count\s+(\d+)\s*$")?,
            query: Regex::new(r"(?m)^query\(k\):\s*(SSD|HDD)\s+(.+?)\s*$")?,
            tb: RegexBuilder::new(r"(\d+(?:\.\d+)?)\s*TB").case_insensitive(true).build()?,
            gb: RegexBuilder::new(r"(\d+(?:\.\d+)?)\s*GB").case_insensitive(true).build()?,
            number: Regex::new(r"\d+(?:\.\d+)?")?,
            file_tb: RegexBuilder::new(r"_(\d+(?:\.\d+)?)TB\.log$").case_insensitive(true).build()?,
        })
    }

    /// First `ALL` line of a log.
    pub fn all_stat(&self, text: &str) -> Option<PriceStat> {
        let c = self.all.captures(text)?;
        Some(PriceStat {
            min: c[1].parse().ok()?,
            avg: c[2].parse().ok()?,
            max: c[3].parse().ok()?,
            count: c[4].parse().ok()?,
        })
    }

    /// `(kind, capacity)` of the first `query(k)` line.
    pub fn query(&self, text: &str) -> Option<(String, String)> {
        let c = self.query.captures(text)?;
        Some((c[1].to_string(), c[2].trim().to_string()))
    }

    /// Capacity label from the query line when it names `kind`, else from the
    /// file name (`..._4TB.log`), else the file name itself.
    pub fn capacity_label(&self, kind: DriveKind, file_name: &str, text: &str) -> String {
        if let Some((k, cap)) = self.query(text) {
            if k.eq_ignore_ascii_case(kind.as_str()) {
                return cap;
            }
        }
        match self.file_tb.captures(file_name) {
            Some(c) => format!("{}TB", &c[1]),
            None => file_name.to_string(),
        }
    }

    /// Sort key in TB. GB labels are divided by 1024; a bare number is taken as is.
    pub fn capacity_tb(&self, label: &str) -> f64 {
        let first = |re: &Regex| re.captures(label).and_then(|c| c[1].parse::<f64>().ok());
        first(&self.tb)
            .or_else(|| first(&self.gb).map(|gb| gb / 1024.0))
            .or_else(|| self.number.find(label).and_then(|m| m.as_str().parse().ok()))
            .unwrap_or(0.0)
    }

    /// One row per log in `dir` that has an `ALL` line, sorted by capacity.
    /// A missing directory yields no rows.
    pub fn load_dir(&self, dir: &Path, kind: DriveKind) -> Result<Vec<CapacityRow>> {
        let mut rows = Vec::new();
        for path in log_files(dir)? {
            let text = read_lossy(&path)?;
            let Some(stat) = self.all_stat(&text) else { continue };
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let capacity_label = self.capacity_label(kind, &file_name, &text);
            rows.push(CapacityRow {
                capacity_tb: self.capacity_tb(&capacity_label),
                capacity_label,
                min: stat.min,
                avg: stat.avg,
                max: stat.max,
                count: stat.count,
            });
        }
        rows.sort_by(|a, b| {
            a.capacity_tb
                .total_cmp(&b.capacity_tb)
                .then_with(|| a.capacity_label.cmp(&b.capacity_label))
        });
        Ok(rows)
    }

    /// `<query> -> ALL min .. avg .. max .. count ..` for every log in `dir`
    /// carrying both lines.
    pub fn kind_summary(&self, dir: &Path) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for path in log_files(dir)? {
            let text = read_lossy(&path)?;
            let (Some((k, cap)), Some(stat)) = (self.query(&text), self.all_stat(&text)) else {
                continue;
            };
            out.push(format!("{k} {cap} -> ALL {}", stat.line_fields()));
        }
        Ok(out)
    }
}

fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "log") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Day-over-day comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeEntry {
    #[serde(flatten)]
    pub row: CapacityRow,
    pub d_min: Option<i64>,
    pub d_avg: Option<i64>,
    pub d_max: Option<i64>,
}

/// Pair each row with the previous day's row of the same label.
pub fn compare(rows: Vec<CapacityRow>, previous: &[CapacityRow]) -> Vec<GaugeEntry> {
    rows.into_iter()
        .map(|row| {
            let prev = previous.iter().find(|p| p.capacity_label == row.capacity_label);
            let delta = |cur: u32, old: fn(&CapacityRow) -> u32| {
                prev.map(|p| i64::from(cur) - i64::from(old(p)))
            };
            GaugeEntry {
                d_min: delta(row.min, |p| p.min),
                d_avg: delta(row.avg, |p| p.avg),
                d_max: delta(row.max, |p| p.max),
                row,
            }
        })
        .collect()
}

const TSV_HEADER: &str =
    "label\tcap_tb\tmin\tavg\tmax\tcount\tmin_scaled\tavg_scaled\tmax_scaled\td_min\td_avg\td_max";

/// Table consumed by the chart renderer. Scaled columns are `price / scale`;
/// deltas are signed, empty when there is no previous row.
pub fn tsv(entries: &[GaugeEntry], scale: u32) -> String {
    let scale = f64::from(scale.max(1));
    let delta = |d: Option<i64>| d.map(signed).unwrap_or_default();
    let mut out = String::from(TSV_HEADER);
    out.push('\n');
    for e in entries {
        let r = &e.row;
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}\t{}\n",
            r.capacity_label,
            fmt_tb(r.capacity_tb),
            r.min,
            r.avg,
            r.max,
            r.count,
            f64::from(r.min) / scale,
            f64::from(r.avg) / scale,
            f64::from(r.max) / scale,
            delta(e.d_min),
            delta(e.d_avg),
            delta(e.d_max),
        ));
    }
    out
}

fn signed(d: i64) -> String {
    if d > 0 {
        format!("+{d}")
    } else {
        d.to_string()
    }
}

/// `12,800 (+300)`, `12,800 (±0)`, `12,800 (-)` when there is nothing to compare with.
pub fn fmt_price_change(current: u32, delta: Option<i64>) -> String {
    let cur = fmt_thousands(i64::from(current));
    match delta {
        None => format!("{cur} (-)"),
        Some(0) => format!("{cur} (±0)"),
        Some(d) if d > 0 => format!("{cur} (+{})", fmt_thousands(d)),
        Some(d) => format!("{cur} ({})", fmt_thousands(d)),
    }
}

// ---------------------------------------------------------------------------
// Gauge run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GaugeRequest {
    pub date: String,
    pub base_dir: PathBuf,
    pub ssd_dir: Option<PathBuf>,
    pub hdd_dir: Option<PathBuf>,
    pub scale: u32,
    pub json: bool,
}

impl GaugeRequest {
    fn dir_for(&self, kind: DriveKind) -> PathBuf {
        let explicit = match kind {
            DriveKind::Ssd => self.ssd_dir.clone(),
            DriveKind::Hdd => self.hdd_dir.clone(),
        };
        explicit.unwrap_or_else(|| scrape_dir(&self.base_dir, kind, &self.date))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KindGauge {
    pub kind: DriveKind,
    pub date: String,
    pub entries: Vec<GaugeEntry>,
    #[serde(skip)]
    pub table: PathBuf,
}

/// Build and write the table for every kind whose log directory exists.
pub fn run_gauge(parser: &LogParser, req: &GaugeRequest) -> Result<Vec<KindGauge>> {
    let yesterday = previous_day(&req.date);
    info!(date = %req.date, previous = ?yesterday, "[GAUGE] start");

    let mut out = Vec::new();
    for kind in [DriveKind::Ssd, DriveKind::Hdd] {
        let dir = req.dir_for(kind);
        if !dir.is_dir() {
            info!(kind = %kind, dir = %dir.display(), "[GAUGE] skip: directory not found");
            continue;
        }
        let rows = parser.load_dir(&dir, kind)?;
        if rows.is_empty() {
            warn!(kind = %kind, dir = %dir.display(), "[GAUGE] no parsable logs");
            continue;
        }
        let previous = match &yesterday {
            Some(day) => parser.load_dir(&scrape_dir(&req.base_dir, kind, day), kind)?,
            None => Vec::new(),
        };
        let entries = compare(rows, &previous);

        for e in &entries {
            info!(
                "[GAUGE] {kind} {:>6}  min {}  avg {}  max {}  count {}",
                e.row.capacity_label,
                fmt_price_change(e.row.min, e.d_min),
                fmt_price_change(e.row.avg, e.d_avg),
                fmt_price_change(e.row.max, e.d_max),
                e.row.count,
            );
        }

        let path = table_path(&req.base_dir, kind, &req.date);
        fs::write(&path, tsv(&entries, req.scale))?;
        info!(kind = %kind, path = %path.display(), rows = entries.len(), "[GAUGE] table saved");

        out.push(KindGauge { kind, date: req.date.clone(), entries, table: path });
    }

    if req.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG_1TB: &str = "version: 0.1.0\nurl: https://x/s?k=SSD+1TB\nquery(k): SSD 1TB\nmode: ssd-filter\n\
        ALL min 9800 avg 12000 max 15000 count 12\nprice_missing_count 0\n";

    fn row(label: &str, tb: f64, min: u32, avg: u32, max: u32) -> CapacityRow {
        CapacityRow { capacity_label: label.into(), capacity_tb: tb, min, avg, max, count: 3 }
    }

    #[test]
    fn parses_contract_lines() {
        let p = LogParser::new().unwrap();
        let s = p.all_stat(LOG_1TB).unwrap();
        assert_eq!((s.min, s.avg, s.max, s.count), (9800, 12000, 15000, 12));
        assert_eq!(p.query(LOG_1TB), Some(("SSD".into(), "1TB".into())));
        assert!(p.all_stat("ALL min 1 avg 2 max 3").is_none());
    }

    #[test]
    fn label_falls_back_to_file_name() {
        let p = LogParser::new().unwrap();
        assert_eq!(p.capacity_label(DriveKind::Ssd, "ssd_1TB.log", LOG_1TB), "1TB");
        // Query for the other kind is ignored.
        assert_eq!(p.capacity_label(DriveKind::Hdd, "hdd_4tb.log", LOG_1TB), "4TB");
        assert_eq!(p.capacity_label(DriveKind::Hdd, "weird.log", ""), "weird.log");
    }

    #[test]
    fn capacity_sort_keys() {
        let p = LogParser::new().unwrap();
        assert_eq!(p.capacity_tb("2TB"), 2.0);
        assert_eq!(p.capacity_tb("512GB"), 0.5);
        assert_eq!(p.capacity_tb("x7"), 7.0);
        assert_eq!(p.capacity_tb("none"), 0.0);
    }

    #[test]
    fn previous_day_crosses_month() {
        assert_eq!(previous_day("2025-03-01").as_deref(), Some("2025-02-28"));
        assert_eq!(previous_day("not a date"), None);
    }

    #[test]
    fn loads_and_sorts_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ssd_1TB.log"), LOG_1TB).unwrap();
        fs::write(
            dir.path().join("ssd_512GB.log"),
            "query(k): SSD 512GB\nALL min 5000 avg 6000 max 7000 count 4\n",
        )
        .unwrap();
        fs::write(dir.path().join("ssd_8TB.log"), "query(k): SSD 8TB\nprice_missing_count 3\n").unwrap();
        fs::write(dir.path().join("notes.txt"), LOG_1TB).unwrap();

        let p = LogParser::new().unwrap();
        let rows = p.load_dir(dir.path(), DriveKind::Ssd).unwrap();
        let labels: Vec<_> = rows.iter().map(|r| r.capacity_label.as_str()).collect();
        assert_eq!(labels, ["512GB", "1TB"]);

        let summary = p.kind_summary(dir.path()).unwrap();
        assert_eq!(summary[0], "SSD 1TB -> ALL min 9800 avg 12000 max 15000 count 12");
        assert!(p.load_dir(&dir.path().join("missing"), DriveKind::Ssd).unwrap().is_empty());
    }

    #[test]
    fn deltas_and_table() {
        let today = vec![row("1TB", 1.0, 9800, 12000, 15000), row("2TB", 2.0, 20000, 22000, 25000)];
        let yesterday = vec![row("1TB", 1.0, 10000, 12000, 14000)];
        let entries = compare(today, &yesterday);
        assert_eq!((entries[0].d_min, entries[0].d_avg, entries[0].d_max), (Some(-200), Some(0), Some(1000)));
        assert_eq!(entries[1].d_min, None);

        let table = tsv(&entries, 100);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines[0], TSV_HEADER);
        assert_eq!(lines[1], "1TB\t1.0\t9800\t12000\t15000\t3\t98.00\t120.00\t150.00\t-200\t0\t+1000");
        assert_eq!(lines[2], "2TB\t2.0\t20000\t22000\t25000\t3\t200.00\t220.00\t250.00\t\t\t");
    }

    #[test]
    fn price_change_labels() {
        assert_eq!(fmt_price_change(12800, Some(300)), "12,800 (+300)");
        assert_eq!(fmt_price_change(12800, Some(-1500)), "12,800 (-1,500)");
        assert_eq!(fmt_price_change(12800, Some(0)), "12,800 (±0)");
        assert_eq!(fmt_price_change(12800, None), "12,800 (-)");
    }

    #[test]
    fn run_writes_table_and_compares_with_previous_day() {
        let base = tempfile::tempdir().unwrap();
        let today = scrape_dir(base.path(), DriveKind::Ssd, "2025-06-02");
        let prev = scrape_dir(base.path(), DriveKind::Ssd, "2025-06-01");
        fs::create_dir_all(&today).unwrap();
        fs::create_dir_all(&prev).unwrap();
        fs::write(today.join("ssd_1TB.log"), LOG_1TB).unwrap();
        fs::write(prev.join("ssd_1TB.log"), LOG_1TB.replace("min 9800", "min 9000")).unwrap();

        let req = GaugeRequest {
            date: "2025-06-02".into(),
            base_dir: base.path().to_path_buf(),
            ssd_dir: None,
            hdd_dir: None,
            scale: 100,
            json: false,
        };
        let out = run_gauge(&LogParser::new().unwrap(), &req).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entries[0].d_min, Some(800));
        assert_eq!(out[0].table, table_path(base.path(), DriveKind::Ssd, "2025-06-02"));
        let table = fs::read_to_string(table_path(base.path(), DriveKind::Ssd, "2025-06-02")).unwrap();
        assert!(table.contains("\t+800\t"));
    }
}
