use std::cmp::Reverse;
use std::collections::HashMap;

use crate::types::ClassifiedItem;

/// Collapse repeated identifiers to their best observed offer.
///
/// A known price beats an unknown one and the lower price beats the higher.
/// The remaining ties are broken on listing content only, so the chosen record
/// never depends on input order. Output keeps first-seen identifier order.
pub fn dedup_best_offer(items: Vec<ClassifiedItem>) -> Vec<ClassifiedItem> {
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut out: Vec<ClassifiedItem> = Vec::with_capacity(items.len());

    for item in items {
        match slot.get(&item.listing.id) {
            Some(&i) => {
                if rank(&item) < rank(&out[i]) {
                    out[i] = item;
                }
            }
            None => {
                slot.insert(item.listing.id.clone(), out.len());
                out.push(item);
            }
        }
    }
    out
}

type Rank<'a> = (bool, u32, Reverse<usize>, &'a str, &'a str, bool, bool, &'static str);

fn rank(item: &ClassifiedItem) -> Rank<'_> {
    let l = &item.listing;
    (
        l.price_yen.is_none(),
        l.price_yen.unwrap_or(0),
        Reverse(l.title.len()),
        l.title.as_str(),
        l.source_url.as_str(),
        l.no_eligible_offer,
        l.is_sponsored,
        item.category.as_str(),
    )
}

/// Keep valid drive subtypes only, or everything in raw mode.
pub fn retain_valid(items: Vec<ClassifiedItem>, raw: bool) -> Vec<ClassifiedItem> {
    if raw {
        return items;
    }
    items.into_iter().filter(|it| it.category.is_drive()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, RawListing, Reason, ReasonCode};

    fn item(id: &str, price: Option<u32>, title: &str, category: Category) -> ClassifiedItem {
        ClassifiedItem {
            listing: RawListing {
                id: id.into(),
                title: title.into(),
                price_yen: price,
                is_sponsored: false,
                no_eligible_offer: false,
                source_url: format!("https://example.test/dp/{id}"),
            },
            category,
            reason: Reason::new(ReasonCode::GenericDrive, "test"),
            capacity_gb: None,
            capacity_tb: None,
            interface: None,
            form_factor: None,
            brand: None,
        }
    }

    fn drive(id: &str, price: Option<u32>) -> ClassifiedItem {
        item(id, price, "SSD 1TB", Category::DriveInternalSata)
    }

    #[test]
    fn known_price_beats_unknown() {
        let out = dedup_best_offer(vec![drive("A", None), drive("A", Some(5000))]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price(), Some(5000));

        let out = dedup_best_offer(vec![drive("A", Some(5000)), drive("A", None)]);
        assert_eq!(out[0].price(), Some(5000));
    }

    #[test]
    fn lower_price_wins() {
        let out = dedup_best_offer(vec![drive("A", Some(6000)), drive("A", Some(5000)), drive("A", Some(5500))]);
        assert_eq!(out[0].price(), Some(5000));
    }

    #[test]
    fn representative_is_order_independent() {
        let a = item("A", Some(5000), "SSD 1TB short", Category::DriveInternalSata);
        let b = item("A", Some(5000), "SSD 1TB a longer title", Category::DriveInternalNvme);
        let c = item("A", None, "SSD 1TB the longest title of them all", Category::DriveExternal);
        let d = item("B", Some(100), "x", Category::Other);

        let orders = [
            vec![a.clone(), b.clone(), c.clone(), d.clone()],
            vec![c.clone(), b.clone(), a.clone(), d.clone()],
            vec![d.clone(), b.clone(), c.clone(), a.clone()],
            vec![b.clone(), d.clone(), a.clone(), c.clone()],
        ];
        for order in orders {
            let out = dedup_best_offer(order);
            let chosen = out.iter().find(|it| it.listing.id == "A").unwrap();
            assert_eq!(chosen, &b);
            assert_eq!(out.len(), 2);
        }
    }

    #[test]
    fn organic_twin_beats_sponsored_in_any_order() {
        let organic = drive("A", Some(9000));
        let mut sponsored = organic.clone();
        sponsored.listing.is_sponsored = true;

        let first = dedup_best_offer(vec![sponsored.clone(), organic.clone()]);
        let second = dedup_best_offer(vec![organic.clone(), sponsored]);
        assert_eq!(first, second);
        assert!(!first[0].listing.is_sponsored);
    }

    #[test]
    fn keeps_first_seen_order() {
        let out = dedup_best_offer(vec![drive("B", Some(2)), drive("A", Some(1)), drive("B", Some(1))]);
        let ids: Vec<_> = out.iter().map(|it| it.listing.id.as_str()).collect();
        assert_eq!(ids, ["B", "A"]);
    }

    #[test]
    fn retain_drops_non_drives_unless_raw() {
        let items = vec![
            drive("A", Some(1)),
            item("B", Some(1), "case", Category::Accessory),
            item("C", Some(1), "x", Category::Other),
        ];
        assert_eq!(retain_valid(items.clone(), false).len(), 1);
        assert_eq!(retain_valid(items, true).len(), 3);
    }
}
