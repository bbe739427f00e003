use std::collections::BTreeMap;

use crate::types::{fmt_tb, ClassifiedItem, DriveKind, PriceStat};

const UNKNOWN: &str = "Unknown";

/// Summary block for one unit's retained items.
///
/// Order: `ALL` (only when something is priced), `price_missing_count`, then
/// `BRAND`, `IFACE` and `FORM` (solid-state only), `CAP_TB`. Group labels are
/// sorted ascending and groups without a priced item are left out.
pub fn summary_lines(kind: DriveKind, items: &[ClassifiedItem]) -> Vec<String> {
    let prices: Vec<u32> = items.iter().filter_map(ClassifiedItem::price).collect();
    let missing = items.len() - prices.len();

    let mut lines = Vec::new();
    if let Some(all) = PriceStat::from_prices(&prices) {
        lines.push(format!("ALL {}", all.line_fields()));
    }
    lines.push(format!("price_missing_count {missing}"));

    lines.extend(group_lines("BRAND", items, |it| it.brand.map(str::to_string)));
    if kind == DriveKind::Ssd {
        lines.extend(group_lines("IFACE", items, |it| it.interface.map(|i| i.label().to_string())));
        lines.extend(group_lines("FORM", items, |it| it.form_factor.map(|f| f.label().to_string())));
    }
    lines.extend(group_lines("CAP_TB", items, |it| it.capacity_tb.map(fmt_tb)));
    lines
}

fn group_lines(
    prefix: &str,
    items: &[ClassifiedItem],
    label: impl Fn(&ClassifiedItem) -> Option<String>,
) -> Vec<String> {
    let mut groups: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for it in items {
        let Some(price) = it.price() else { continue };
        let key = label(it).unwrap_or_else(|| UNKNOWN.to_string());
        groups.entry(key).or_default().push(price);
    }
    groups
        .into_iter()
        .filter_map(|(key, prices)| {
            PriceStat::from_prices(&prices).map(|s| format!("{prefix} {key} {}", s.line_fields()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, FormFactor, Interface, RawListing, Reason, ReasonCode};

    fn item(price: Option<u32>, brand: Option<&'static str>, tb: Option<f64>) -> ClassifiedItem {
        ClassifiedItem {
            listing: RawListing {
                id: "B000000001".into(),
                title: "t".into(),
                price_yen: price,
                is_sponsored: false,
                no_eligible_offer: false,
                source_url: String::new(),
            },
            category: Category::DriveInternalNvme,
            reason: Reason::new(ReasonCode::NvmeHints, "nvme"),
            capacity_gb: None,
            capacity_tb: tb,
            interface: Some(Interface::Nvme),
            form_factor: Some(FormFactor::M2),
            brand,
        }
    }

    #[test]
    fn ssd_block_layout() {
        let items = vec![
            item(Some(10000), Some("Samsung"), Some(1.0)),
            item(Some(12000), Some("Samsung"), Some(1.0)),
            item(Some(9001), None, Some(1.0)),
            item(None, Some("Crucial"), Some(1.0)),
        ];
        let lines = summary_lines(DriveKind::Ssd, &items);
        assert_eq!(
            lines,
            vec![
                "ALL min 9001 avg 10334 max 12000 count 3",
                "price_missing_count 1",
                "BRAND Samsung min 10000 avg 11000 max 12000 count 2",
                "BRAND Unknown min 9001 avg 9001 max 9001 count 1",
                "IFACE NVMe min 9001 avg 10334 max 12000 count 3",
                "FORM M.2 min 9001 avg 10334 max 12000 count 3",
                "CAP_TB 1.0 min 9001 avg 10334 max 12000 count 3",
            ]
        );
    }

    #[test]
    fn unpriced_group_is_omitted() {
        let items = vec![item(Some(5000), Some("Seagate"), Some(4.0)), item(None, Some("Toshiba"), Some(8.0))];
        let lines = summary_lines(DriveKind::Hdd, &items);
        assert!(lines.iter().all(|l| !l.contains("Toshiba")));
        assert!(lines.iter().all(|l| !l.starts_with("CAP_TB 8.0")));
        assert!(lines.iter().all(|l| !l.starts_with("IFACE") && !l.starts_with("FORM")));
        assert!(lines.contains(&"CAP_TB 4.0 min 5000 avg 5000 max 5000 count 1".to_string()));
    }

    #[test]
    fn nothing_priced_has_no_all_line() {
        let lines = summary_lines(DriveKind::Hdd, &[item(None, None, None)]);
        assert_eq!(lines, vec!["price_missing_count 1"]);
    }
}
