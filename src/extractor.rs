use scraper::Html;
use tracing::debug;

use crate::config::AD_PLACEHOLDER_ID;
use crate::patterns::PagePatterns;
use crate::types::RawListing;

/// Split a results page into `(id, fragment)` pairs.
///
/// A fragment runs from one id marker to the next one (or the end of the page).
/// Ad placeholders are skipped.
pub fn split_items<'a>(patterns: &PagePatterns, html: &'a str) -> Vec<(String, &'a str)> {
    let marks: Vec<(usize, &str)> = patterns
        .item_id
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let id = c.get(1)?;
            Some((whole.start(), id.as_str()))
        })
        .collect();

    let mut out = Vec::with_capacity(marks.len());
    for (i, &(start, id)) in marks.iter().enumerate() {
        let end = marks.get(i + 1).map_or(html.len(), |&(next, _)| next);
        if id == AD_PLACEHOLDER_ID {
            continue;
        }
        out.push((id.to_string(), &html[start..end]));
    }
    out
}

/// Decode entities, drop tags, collapse whitespace.
pub fn clean_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title from the first title pattern that matches. Empty when none does.
pub fn extract_title(patterns: &PagePatterns, fragment: &str) -> String {
    patterns
        .titles
        .iter()
        .find_map(|re| re.captures(fragment))
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default()
}

pub fn extract_price(patterns: &PagePatterns, fragment: &str) -> Option<u32> {
    [&patterns.price_whole, &patterns.price_currency]
        .into_iter()
        .filter_map(|re| re.captures(fragment))
        .find_map(|c| parse_grouped_int(&c[1]))
}

pub fn is_sponsored(patterns: &PagePatterns, fragment: &str) -> bool {
    patterns.sponsored.is_match(fragment)
}

/// "No featured offer" notice, checked on the markup as-is and on its decoded text.
pub fn has_no_offer(patterns: &PagePatterns, fragment: &str) -> bool {
    if fragment.is_empty() {
        return false;
    }
    patterns.no_offer.is_match(fragment) || patterns.no_offer.is_match(&clean_text(fragment))
}

/// Observed result count (`12,345 件の結果`), if the page states one.
pub fn parse_hit_count(patterns: &PagePatterns, html: &str) -> Option<u64> {
    let caps = patterns.hit_count.captures(html)?;
    caps[1].replace(',', "").parse().ok()
}

pub fn has_next_page(patterns: &PagePatterns, html: &str) -> bool {
    patterns.next_page.is_match(html)
}

/// Turn split fragments into listings. Fragments without a title are dropped.
pub fn extract_items(
    patterns: &PagePatterns,
    items: Vec<(String, &str)>,
    base_url: &str,
) -> Vec<RawListing> {
    let base = base_url.trim_end_matches('/');
    let mut dropped = 0usize;

    let listings: Vec<RawListing> = items
        .into_iter()
        .filter_map(|(id, fragment)| {
            let title = extract_title(patterns, fragment);
            if title.is_empty() {
                dropped += 1;
                return None;
            }
            Some(RawListing {
                source_url: format!("{base}/dp/{id}"),
                price_yen: extract_price(patterns, fragment),
                is_sponsored: is_sponsored(patterns, fragment),
                no_eligible_offer: has_no_offer(patterns, fragment),
                title,
                id,
            })
        })
        .collect();

    if dropped > 0 {
        debug!(dropped, kept = listings.len(), "[EXTRACT] fragments without a title dropped");
    }
    listings
}

fn parse_grouped_int(s: &str) -> Option<u32> {
    s.replace(',', "").parse().ok()
}
