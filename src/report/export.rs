use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::{fmt_tb, ClassifiedItem, DriveKind};

const SSD_COLUMNS: &[&str] = &[
    "id", "title", "price_yen", "sponsored", "url", "capacity_gb", "capacity_tb", "form",
    "interface", "brand_guess", "category", "reason",
];

const HDD_COLUMNS: &[&str] = &[
    "id", "title", "price_yen", "sponsored", "url", "capacity_tb", "form_factor_in", "interface",
    "brand_guess", "category", "reason", "no_recommended_offer",
];

/// `amazon_<kind>_<cap>.csv`, the capacity reduced to lowercase alphanumerics.
pub fn csv_file_name(kind: DriveKind, cap: &str) -> String {
    let slug: String = cap
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let slug = if slug.is_empty() { "query".to_string() } else { slug };
    format!("amazon_{}_{slug}.csv", kind.slug())
}

pub fn columns(kind: DriveKind) -> &'static [&'static str] {
    match kind {
        DriveKind::Ssd => SSD_COLUMNS,
        DriveKind::Hdd => HDD_COLUMNS,
    }
}

/// One CSV row in column order. Unknown values are empty cells, flags are 0/1.
pub fn row(kind: DriveKind, it: &ClassifiedItem) -> Vec<String> {
    let l = &it.listing;
    let opt = |v: Option<String>| v.unwrap_or_default();
    let flag = |b: bool| if b { "1" } else { "0" }.to_string();

    let mut cells = vec![
        l.id.clone(),
        l.title.clone(),
        opt(l.price_yen.map(|p| p.to_string())),
        flag(l.is_sponsored),
        l.source_url.clone(),
    ];
    match kind {
        DriveKind::Ssd => cells.extend([
            opt(it.capacity_gb.map(|g| g.to_string())),
            opt(it.capacity_tb.map(fmt_tb)),
            opt(it.form_factor.map(|f| f.label().to_string())),
        ]),
        DriveKind::Hdd => cells.extend([
            opt(it.capacity_tb.map(fmt_tb)),
            opt(it.form_factor.and_then(|f| f.inches()).map(|i| i.to_string())),
        ]),
    }
    cells.extend([
        opt(it.interface.map(|i| i.label().to_string())),
        opt(it.brand.map(str::to_string)),
        it.category.as_str().to_string(),
        it.reason.detail.clone(),
    ]);
    if kind == DriveKind::Hdd {
        cells.push(flag(l.no_eligible_offer));
    }
    cells
}

fn needs_quotes(cell: &str) -> bool {
    cell.contains([',', '"', '\n', '\r'])
}

pub fn write_row<W: Write>(w: &mut W, cells: &[String]) -> io::Result<()> {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

/// Header plus one row per item.
pub fn write_csv<W: Write>(w: &mut W, kind: DriveKind, items: &[ClassifiedItem]) -> io::Result<()> {
    let header: Vec<String> = columns(kind).iter().map(|c| c.to_string()).collect();
    write_row(w, &header)?;
    for it in items {
        write_row(w, &row(kind, it))?;
    }
    Ok(())
}

pub fn save_csv(path: &Path, kind: DriveKind, items: &[ClassifiedItem]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_csv(&mut w, kind, items)?;
    w.flush()
}
