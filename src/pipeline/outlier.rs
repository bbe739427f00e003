use crate::types::{fmt_thousands, ClassifiedItem};

/// What one outlier pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFilterReport {
    pub median: u32,
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub removed_low: usize,
    pub removed_high: usize,
}

impl PriceFilterReport {
    pub fn removed(&self) -> usize {
        self.removed_low + self.removed_high
    }

    /// Log block, empty when nothing was removed.
    pub fn log_lines(&self) -> Vec<String> {
        if self.removed() == 0 {
            return Vec::new();
        }
        let mut lines = vec![format!("Price Filter: Median={}", fmt_thousands(i64::from(self.median)))];
        if self.removed_low > 0 {
            lines.push(format!(
                "  - Low Cut (<{}): {} items",
                fmt_thousands(self.low_threshold.round() as i64),
                self.removed_low
            ));
        }
        if self.removed_high > 0 {
            lines.push(format!(
                "  - High Cut (>{}): {} items",
                fmt_thousands(self.high_threshold.round() as i64),
                self.removed_high
            ));
        }
        lines
    }
}

/// Median of a sample, the mean of the two middle values for even sizes,
/// rounded to an integer.
pub fn median(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let mid = v.len() / 2;
    let m = if v.len() % 2 == 1 {
        f64::from(v[mid])
    } else {
        (f64::from(v[mid - 1]) + f64::from(v[mid])) / 2.0
    };
    Some(m.round() as u32)
}

/// Drop known prices strictly outside `[median × low_ratio, median × high_ratio]`.
///
/// Items with no price always pass. Returns `None` as the report when the set
/// has no known price at all.
pub fn filter_outliers(
    items: Vec<ClassifiedItem>,
    low_ratio: f64,
    high_ratio: f64,
) -> (Vec<ClassifiedItem>, Option<PriceFilterReport>) {
    let prices: Vec<u32> = items.iter().filter_map(ClassifiedItem::price).collect();
    let Some(median) = median(&prices) else {
        return (items, None);
    };

    let low_threshold = f64::from(median) * low_ratio;
    let high_threshold = f64::from(median) * high_ratio;
    let mut removed_low = 0;
    let mut removed_high = 0;

    let kept = items
        .into_iter()
        .filter(|it| match it.price().map(f64::from) {
            Some(p) if p < low_threshold => {
                removed_low += 1;
                false
            }
            Some(p) if p > high_threshold => {
                removed_high += 1;
                false
            }
            _ => true,
        })
        .collect();

    let report = PriceFilterReport { median, low_threshold, high_threshold, removed_low, removed_high };
    (kept, Some(report))
}
