use url::Url;

use crate::config::{SEARCH_PATH, SEARCH_REF};
use crate::error::Result;
use crate::patterns::CapacityPatterns;
use crate::types::{DriveKind, SearchTarget};

/// Build the first-page search URL for one unit: `<base>/s?k=<KIND>+<cap>&ref=...`.
pub fn search_url(base_url: &str, kind: DriveKind, cap: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?.join(SEARCH_PATH)?;
    url.query_pairs_mut()
        .append_pair("k", &format!("{} {}", kind.as_str(), cap.trim()))
        .append_pair("ref", SEARCH_REF);
    Ok(url)
}

/// Same URL with its `page` query parameter set (replacing any existing one).
pub fn page_url(first: &Url, page: u32) -> Url {
    let pairs: Vec<(String, String)> = first
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut url = first.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("page", &page.to_string());
    url
}

/// Decoded search keyword (`k`) of a search URL, whitespace collapsed.
/// Empty when the URL carries none.
pub fn keyword_from_url(url: &Url) -> String {
    url.query_pairs()
        .find(|(k, _)| k == "k")
        .map(|(_, v)| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Resolve the target capacity from a query keyword.
///
/// The first `<n>TB` wins; failing that the first 2 to 5 digit `<n>GB`. A keyword
/// with neither leaves both fields unset.
pub fn resolve_target(
    patterns: &CapacityPatterns,
    kind: DriveKind,
    capacity_token: &str,
    keyword: &str,
) -> SearchTarget {
    let tb = patterns
        .tb
        .captures(keyword)
        .and_then(|c| c[1].parse::<f64>().ok());
    let gb = if tb.is_none() {
        patterns
            .gb
            .captures(keyword)
            .and_then(|c| c[1].parse::<u32>().ok())
    } else {
        None
    };

    SearchTarget {
        drive_kind: kind,
        capacity_token: capacity_token.to_string(),
        target_capacity_gb: gb,
        target_capacity_tb: tb,
    }
}
