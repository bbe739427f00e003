use serde::Serialize;
use std::str::FromStr;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Drive kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DriveKind {
    #[serde(rename = "SSD")]
    Ssd,
    #[serde(rename = "HDD")]
    Hdd,
}

impl DriveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DriveKind::Ssd => "SSD",
            DriveKind::Hdd => "HDD",
        }
    }

    /// Lower-case form used in file and directory names.
    pub fn slug(self) -> &'static str {
        match self {
            DriveKind::Ssd => "ssd",
            DriveKind::Hdd => "hdd",
        }
    }
}

impl std::fmt::Display for DriveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SSD" => Ok(DriveKind::Ssd),
            "HDD" => Ok(DriveKind::Hdd),
            other => Err(AppError::Config(format!("unknown drive kind {other:?}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Search target
// ---------------------------------------------------------------------------

/// What a unit searches for. Built once from the query string and never changed.
///
/// At most one of the two capacity fields is set; both are `None` when the query
/// carries no capacity hint, which turns the classifier's capacity check off.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTarget {
    pub drive_kind: DriveKind,
    pub capacity_token: String,
    pub target_capacity_gb: Option<u32>,
    pub target_capacity_tb: Option<f64>,
}

impl SearchTarget {
    pub fn has_capacity(&self) -> bool {
        self.target_capacity_gb.is_some() || self.target_capacity_tb.is_some()
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// One product entry as scraped from a results page. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    /// 10-character alphanumeric product identifier.
    pub id: String,
    pub title: String,
    pub price_yen: Option<u32>,
    pub is_sponsored: bool,
    /// The fragment carried a "no featured offer" notice.
    pub no_eligible_offer: bool,
    pub source_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Accessory,
    PcDevice,
    NasDevice,
    /// Solid-state listing without an eligible featured offer.
    BadOffer,
    Other,
    DriveExternal,
    /// Rotating drive, internal.
    DriveInternal,
    DriveInternalNvme,
    DriveInternalSata,
    /// Raw mode: nothing was classified.
    Raw,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Accessory => "accessory",
            Category::PcDevice => "pc_device",
            Category::NasDevice => "nas_device",
            Category::BadOffer => "bad_offer",
            Category::Other => "other",
            Category::DriveExternal => "drive_external",
            Category::DriveInternal => "drive_internal",
            Category::DriveInternalNvme => "drive_internal_nvme",
            Category::DriveInternalSata => "drive_internal_sata",
            Category::Raw => "raw",
        }
    }

    /// True for the valid drive subtypes that survive aggregation.
    pub fn is_drive(self) -> bool {
        matches!(
            self,
            Category::DriveExternal
                | Category::DriveInternal
                | Category::DriveInternalNvme
                | Category::DriveInternalSata
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a listing got its category. `code` is stable; `detail` is for humans only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    RawMode,
    EmptyTitle,
    AccessoryKeyword,
    PcDeviceKeyword,
    NasDeviceKeyword,
    NonSsdMedia,
    MemoryCardMixed,
    OppositeKind,
    NoEligibleOffer,
    NoKindEvidence,
    MultiCapacity,
    NoCapacity,
    CapacityMismatch,
    ExternalHints,
    NvmeHints,
    SataHints,
    InternalHints,
    GenericDrive,
    BrandOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reason {
    pub code: ReasonCode,
    pub detail: String,
}

impl Reason {
    pub fn new(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self { code, detail: detail.into() }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Interface {
    Thunderbolt,
    Usb,
    Nvme,
    Sata,
    Sas,
}

impl Interface {
    pub fn label(self) -> &'static str {
        match self {
            Interface::Thunderbolt => "Thunderbolt",
            Interface::Usb => "USB",
            Interface::Nvme => "NVMe",
            Interface::Sata => "SATA",
            Interface::Sas => "SAS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FormFactor {
    M2,
    Inch2_5,
    Inch3_5,
    Portable,
}

impl FormFactor {
    /// Label used in the solid-state `FORM` group and CSV column.
    pub fn label(self) -> &'static str {
        match self {
            FormFactor::M2 => "M.2",
            FormFactor::Inch2_5 => "2.5inch",
            FormFactor::Inch3_5 => "3.5inch",
            FormFactor::Portable => "Portable",
        }
    }

    pub fn inches(self) -> Option<f64> {
        match self {
            FormFactor::Inch2_5 => Some(2.5),
            FormFactor::Inch3_5 => Some(3.5),
            FormFactor::M2 | FormFactor::Portable => None,
        }
    }
}

/// A listing plus everything the classifier derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedItem {
    pub listing: RawListing,
    pub category: Category,
    pub reason: Reason,
    pub capacity_gb: Option<u32>,
    pub capacity_tb: Option<f64>,
    pub interface: Option<Interface>,
    pub form_factor: Option<FormFactor>,
    pub brand: Option<&'static str>,
}

impl ClassifiedItem {
    pub fn price(&self) -> Option<u32> {
        self.listing.price_yen
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceStat {
    pub min: u32,
    /// Mean rounded half-up.
    pub avg: u32,
    pub max: u32,
    pub count: usize,
}

impl PriceStat {
    /// `None` for an empty sample; aggregates are never zero-filled.
    pub fn from_prices(prices: &[u32]) -> Option<Self> {
        let min = *prices.iter().min()?;
        let max = *prices.iter().max()?;
        let sum: u64 = prices.iter().map(|&p| u64::from(p)).sum();
        let avg = (sum as f64 / prices.len() as f64).round() as u32;
        Some(Self { min, avg, max, count: prices.len() })
    }

    /// `min <int> avg <int> max <int> count <int>`, the fixed summary grammar.
    pub fn line_fields(&self) -> String {
        format!("min {} avg {} max {} count {}", self.min, self.avg, self.max, self.count)
    }
}

/// One capacity's row in the gauge table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityRow {
    pub capacity_label: String,
    /// Sort key.
    pub capacity_tb: f64,
    pub min: u32,
    pub avg: u32,
    pub max: u32,
    pub count: usize,
}

/// Format a TB value the way the summary lines expect (`1.0`, `0.5`, `2.25`).
pub fn fmt_tb(tb: f64) -> String {
    if tb.fract() == 0.0 {
        format!("{tb:.1}")
    } else {
        format!("{tb}")
    }
}

/// `1234567` → `1,234,567`.
pub fn fmt_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
