//! Compiled pattern tables shared by the extractor and the classifiers.
//!
//! Everything here is built once by [`Patterns::compile`] at startup and passed
//! around by reference. Keyword tables are bilingual: a Latin spelling and its
//! Japanese variant are alternatives in the same matcher.

use regex::{Regex, RegexBuilder};

use crate::error::Result;
use crate::types::{FormFactor, Interface};

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

const BLOCK_PATTERNS: &[&str] = &[
    r"Robot Check",
    r"Enter the characters you see below",
    r"/errors/validateCaptcha",
    r"申し訳ございません",
    r"画像に表示されている文字を入力してください",
    r"入力された文字が一致しません",
];

const NO_OFFER_PHRASES: &[&str] = &[
    "「おすすめ出品」の要件を満たす出品はありません",
    "おすすめ出品の要件を満たす出品はありません",
    "The offer does not meet the Featured Offer requirements",
    "does not meet the Featured Offer requirements",
    "There are no Featured Offer eligible offers",
];

const SSD_BRANDS: &[(&str, &[&str])] = &[
    ("Samsung", &[r"\bSamsung\b", r"サムスン"]),
    ("Western Digital", &[r"Western\s*Digital", r"\bWD\b"]),
    ("SanDisk", &[r"SanDisk", r"サンディスク"]),
    ("Crucial", &[r"Crucial", r"クルーシャル"]),
    ("Micron", &[r"\bMicron\b"]),
    ("Kingston", &[r"Kingston", r"キングストン"]),
    ("SK hynix", &[r"SK\s*hynix", r"SKhynix", r"エスケーハイニックス"]),
    ("KIOXIA", &[r"KIOXIA", r"キオクシア"]),
    ("Toshiba", &[r"TOSHIBA", r"東芝"]),
    ("Seagate", &[r"Seagate", r"シーゲイト", r"FireCuda"]),
    ("Solidigm", &[r"Solidigm"]),
    ("Intel", &[r"\bIntel\b"]),
    ("Corsair", &[r"Corsair", r"コルセア"]),
    ("ADATA", &[r"\bADATA\b"]),
    ("Team", &[r"Team(Group)?", r"Team\s*Group", r"チーム"]),
    ("Silicon Power", &[r"Silicon\s*Power"]),
    ("Patriot", &[r"Patriot"]),
    ("Transcend", &[r"Transcend", r"トランセンド"]),
    ("Sabrent", &[r"Sabrent"]),
    ("PNY", &[r"\bPNY\b"]),
    ("Lexar", &[r"Lexar"]),
    ("GIGABYTE", &[r"GIGABYTE"]),
    ("MSI", &[r"\bMSI\b"]),
    ("BUFFALO", &[r"BUFFALO", r"バッファロー"]),
    ("IODATA", &[r"IO\s*DATA", r"IODATA", r"アイ・オー", r"アイオー"]),
    ("ELECOM", &[r"ELECOM", r"エレコム"]),
];

const HDD_MAKERS: &[(&str, &[&str])] = &[
    ("Seagate", &[r"Seagate", r"シーゲイト", r"BarraCuda", r"IronWolf", r"Exos", r"SkyHawk"]),
    (
        "Western Digital",
        &[
            r"Western Digital", r"ウエスタンデジタル", r"\bWD\b", r"WD Red", r"WD Blue",
            r"WD Black", r"WD Purple", r"Gold", r"Ultrastar",
        ],
    ),
    ("Toshiba", &[r"TOSHIBA", r"東芝", r"N300", r"X300", r"P300", r"MG\d{2}", r"DT\d{2}"]),
    ("HGST", &[r"\bHGST\b", r"Hitachi Global Storage"]),
    ("Hitachi", &[r"\bHitachi\b", r"日立"]),
];

/// Enclosure / peripheral brands that sell rotating drives but do not make them.
const HDD_EXTRA_BRANDS: &[(&str, &[&str])] = &[
    ("BUFFALO", &[r"BUFFALO", r"バッファロー"]),
    ("IODATA", &[r"IO DATA", r"IODATA", r"アイ・オー", r"アイオー"]),
    ("ELECOM", &[r"ELECOM", r"エレコム"]),
];

const SSD_ACCESSORY_WORDS: &[&str] = &[
    "ケース", "エンクロージャ", "エンクロージャー", "外付けケース", "SSDケース", "SSD ケース",
    "M.2ケース", "M.2 ケース", "NVMeケース", "NVMe ケース", "USBケース", "USB ケース",
    "クレードル", "ドック", "ドッキング", "クローン", "クローンドック", "クローンスタンド",
    "変換", "アダプタ", "アダプター", "ケーブル", "SATA-USB", "USB-SATA", "NVMe-USB", "M.2-USB",
    "PCIe変換", "PCIe 変換", "変換基板", "ライザー", "延長ケーブル",
    "ヒートシンク", "放熱", "サーマル", "熱伝導", "サーマルパッド", "冷却",
    "ブラケット", "マウンタ", "マウンター", "トレイ", "ネジ", "工具",
    "ドライバー", "固定", "両面テープ", "XBOX",
];

const HDD_ACCESSORY_WORDS: &[&str] = &[
    "ケース", "スタンド", "ドック", "ドッキング", "クローン",
    "エンクロージャ", "変換", "アダプタ", "ケーブル",
    "ブラケット", "マウンタ", "トレイ", "ネジ", "工具",
    "RAIDケース", "RAID ケース", "HDDケース", "HDD ケース", "SSDケース", "SSD ケース",
    "クレードル", "ハブ", "USBハブ", "電源アダプタ", "XBOX",
];

const SSD_PC_WORDS: &[&str] = &[
    "ノートパソコン", "ゲーミングPC", "デスクトップ", "Mini PC", "ミニPC", "ワークステーション",
    "MacBook", "iMac", "Mac mini", "ThinkPad", "Chromebook", "NAS本体", "NAS キット",
];

const SSD_OTHER_MEDIA_WORDS: &[&str] = &[
    "USBメモリ", "USBフラッシュ", "フラッシュドライブ", "SDカード", "microSD", "メモリーカード",
    "CFexpress", "カードリーダー", "HDD", "ハードディスク", "Blu-ray", "DVD",
];

const HDD_NAS_DEVICE_WORDS: &[&str] = &[
    "Synology", "QNAP", "NASync", "2ベイ", "4ベイ", "5ベイ", "6ベイ", "8ベイ",
    "DiskStation", "TerraMaster", "Asustor",
];

// ---------------------------------------------------------------------------
// Compiled tables
// ---------------------------------------------------------------------------

/// Ordered `(brand, matcher)` list; the first matching entry wins.
#[derive(Debug)]
pub struct BrandTable(Vec<(&'static str, Regex)>);

impl BrandTable {
    fn compile(defs: &[(&'static str, &[&str])]) -> Result<Self> {
        let mut out = Vec::with_capacity(defs.len());
        for (name, patterns) in defs {
            out.push((*name, ci(&patterns.join("|"))?));
        }
        Ok(Self(out))
    }

    pub fn guess(&self, title: &str) -> Option<&'static str> {
        self.0.iter().find(|(_, re)| re.is_match(title)).map(|(name, _)| *name)
    }
}

/// First-match hint list, e.g. interface or form-factor hints.
#[derive(Debug)]
pub struct HintTable<T: Copy>(Vec<(T, Regex)>);

impl<T: Copy> HintTable<T> {
    fn compile(defs: &[(T, &str)]) -> Result<Self> {
        let mut out = Vec::with_capacity(defs.len());
        for (hint, pattern) in defs {
            out.push((*hint, ci(pattern)?));
        }
        Ok(Self(out))
    }

    pub fn first(&self, title: &str) -> Option<T> {
        self.0.iter().find(|(_, re)| re.is_match(title)).map(|(hint, _)| *hint)
    }
}

#[derive(Debug)]
pub struct PagePatterns {
    /// Per-item identifier marker; group 1 is the id.
    pub item_id: Regex,
    /// Title patterns in priority order (heading, then inline label).
    pub titles: [Regex; 2],
    pub price_whole: Regex,
    pub price_currency: Regex,
    pub sponsored: Regex,
    pub no_offer: Regex,
    pub blocked: Regex,
    pub next_page: Regex,
    pub hit_count: Regex,
}

#[derive(Debug)]
pub struct CapacityPatterns {
    pub tb: Regex,
    pub gb: Regex,
}

#[derive(Debug)]
pub struct SsdPatterns {
    pub brands: BrandTable,
    pub accessory: Regex,
    pub pc_device: Regex,
    pub other_media: Regex,
    pub memory_card: Regex,
    pub hdd_word: Regex,
    pub ssd_word: Regex,
    pub evidence: Regex,
    pub interfaces: HintTable<Interface>,
    pub forms: HintTable<FormFactor>,
    pub external: Regex,
    pub nvme: Regex,
    pub sata: Regex,
}

#[derive(Debug)]
pub struct HddPatterns {
    pub makers: BrandTable,
    pub extra_brands: BrandTable,
    pub accessory: Regex,
    pub nas_device: Regex,
    pub nas_qualifier: Regex,
    pub hint: Regex,
    pub ssd_word: Regex,
    pub hdd_word: Regex,
    pub interfaces: HintTable<Interface>,
    pub models: Vec<Regex>,
    pub forms: HintTable<FormFactor>,
    pub internal: Regex,
    pub external: Regex,
}

#[derive(Debug)]
pub struct Patterns {
    pub page: PagePatterns,
    pub capacity: CapacityPatterns,
    pub ssd: SsdPatterns,
    pub hdd: HddPatterns,
}

impl Patterns {
    pub fn compile() -> Result<Self> {
        let page = PagePatterns {
            item_id: Regex::new(r#"data-asin="([A-Z0-9]{10})""#)?,
            titles: [
                ci(r"(?s)<h2[^>]*>.*?<span[^>]*>(.*?)</span>.*?</h2>")?,
                ci(r#"(?s)<span[^>]*class="[^"]*a-text-normal[^"]*"[^>]*>(.*?)</span>"#)?,
            ],
            price_whole: ci(r#"class="a-price-whole"[^>]*>([\d,]+)<"#)?,
            price_currency: Regex::new(r"[￥¥]\s*([\d,]+)")?,
            sponsored: ci(r"スポンサー|Sponsored")?,
            no_offer: words(NO_OFFER_PHRASES)?,
            blocked: ci(&BLOCK_PATTERNS.join("|"))?,
            next_page: ci(r#"aria-label="次へ"|class="[^"]*s-pagination-next[^"]*""#)?,
            hit_count: Regex::new(r"(\d[\d,]*)\s*件の結果")?,
        };

        let capacity = CapacityPatterns {
            tb: ci(r"(\d+(?:\.\d+)?)\s*TB")?,
            gb: ci(r"(\d{2,5})\s*GB")?,
        };

        let ssd = SsdPatterns {
            brands: BrandTable::compile(SSD_BRANDS)?,
            accessory: words(SSD_ACCESSORY_WORDS)?,
            pc_device: words(SSD_PC_WORDS)?,
            other_media: words(SSD_OTHER_MEDIA_WORDS)?,
            memory_card: ci(r"USBメモリ|SDカード|microSD|メモリーカード")?,
            hdd_word: ci(r"\bHDD\b|ハードディスク")?,
            ssd_word: ci(r"\bSSD\b|ソリッドステート|Solid State")?,
            evidence: ci(r"NVMe|M\.2|PCIe|SATA|ソリッドステート|内蔵|外付け|ポータブル")?,
            interfaces: HintTable::compile(&[
                (Interface::Thunderbolt, r"Thunderbolt|TB3|TB4"),
                (Interface::Usb, r"USB|Type-?C|UASP"),
                (Interface::Nvme, r"NVMe|PCIe|Gen\s*[34]|M\.2"),
                (Interface::Sata, r"SATA|Serial\s*ATA|2\.5"),
            ])?,
            forms: HintTable::compile(&[
                (FormFactor::M2, r"\bM\.2\b|2280|2230|2242|2260"),
                (FormFactor::Inch2_5, r"2\.5|2\.5インチ|7mm|9\.5mm"),
                (FormFactor::Portable, r"ポータブル|外付け|Portable|External"),
            ])?,
            external: ci(r"外付け|ポータブル|Portable|External")?,
            nvme: ci(r"NVMe|PCIe|M\.2|Gen\s*[34]")?,
            sata: ci(r"SATA|2\.5|2\.5インチ|Serial\s*ATA")?,
        };

        let hdd = HddPatterns {
            makers: BrandTable::compile(HDD_MAKERS)?,
            extra_brands: BrandTable::compile(HDD_EXTRA_BRANDS)?,
            accessory: words(HDD_ACCESSORY_WORDS)?,
            nas_device: words(HDD_NAS_DEVICE_WORDS)?,
            nas_qualifier: ci(r"NAS向け|NAS用|NAS向けHDD|NAS 用")?,
            hint: ci(r"\bHDD\b|ハードディスク|ハードドライブ|Hard Drive|内蔵|外付け|外付|ポータブル")?,
            ssd_word: ci(r"\bSSD\b|ソリッドステート")?,
            hdd_word: ci(r"\bHDD\b|ハードディスク")?,
            interfaces: HintTable::compile(&[
                (Interface::Sas, r"\bSAS\b|Serial Attached SCSI"),
                (Interface::Sata, r"\bSATA\b"),
                (Interface::Usb, r"\bUSB\b|USB3\.|Type-?C|Thunderbolt"),
                (Interface::Nvme, r"\bNVMe\b|M\.2"),
            ])?,
            models: vec![
                ci(r"\bST\d{4,6}[A-Z0-9]{2,}\b")?,
                ci(r"\bWD\d{4,6}[A-Z0-9]{2,}\b")?,
                ci(r"\bHDW[A-Z0-9]{4,}\b|\bMG\d{2}\b|\bN300\b|\bX300\b|\bP300\b")?,
                ci(r"\bHUH\d{3,}\b|\bHUS\d{3,}\b")?,
            ],
            forms: HintTable::compile(&[
                (FormFactor::Inch3_5, r"3\.5\s*(?:インチ|inch|in)"),
                (FormFactor::Inch2_5, r"2\.5\s*(?:インチ|inch|in)"),
            ])?,
            internal: ci(r"内蔵|3\.5|2\.5|SATA|SAS")?,
            external: ci(r"外付け|外付|ポータブル|USB")?,
        };

        Ok(Self { page, capacity, ssd, hdd })
    }
}

fn ci(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Case-insensitive alternation of literal phrases.
fn words(list: &[&str]) -> Result<Regex> {
    let joined = list.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    ci(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_compile() {
        assert!(Patterns::compile().is_ok());
    }

    #[test]
    fn brand_matches_either_script() {
        let p = Patterns::compile().unwrap();
        assert_eq!(p.ssd.brands.guess("サムスン 870 EVO"), Some("Samsung"));
        assert_eq!(p.ssd.brands.guess("samsung 870 evo"), Some("Samsung"));
        assert_eq!(p.ssd.brands.guess("キオクシア EXCERIA"), Some("KIOXIA"));
        assert_eq!(p.ssd.brands.guess("noname drive"), None);
    }

    #[test]
    fn first_brand_in_table_order_wins() {
        let p = Patterns::compile().unwrap();
        // "WD" precedes "SanDisk" in the table.
        assert_eq!(p.ssd.brands.guess("SanDisk by WD Blue"), Some("Western Digital"));
    }

    #[test]
    fn hint_table_first_match() {
        let p = Patterns::compile().unwrap();
        assert_eq!(p.ssd.interfaces.first("USB 3.2 NVMe"), Some(Interface::Usb));
        assert_eq!(p.ssd.interfaces.first("PCIe Gen4"), Some(Interface::Nvme));
        assert_eq!(p.hdd.forms.first("3.5インチ 内蔵"), Some(FormFactor::Inch3_5));
        assert_eq!(p.hdd.forms.first("no size"), None);
    }

    #[test]
    fn block_signatures() {
        let p = Patterns::compile().unwrap();
        assert!(p.page.blocked.is_match("<title>robot check</title>"));
        assert!(p.page.blocked.is_match("画像に表示されている文字を入力してください"));
        assert!(!p.page.blocked.is_match("<div data-asin=\"B000000001\"></div>"));
    }
}
