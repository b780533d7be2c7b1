use std::collections::HashMap;

use crate::table::Cell;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Median of the values; 0.0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Gini coefficient over the full pairwise difference sum.
///
/// 0.0 when the slice is empty or sums to zero.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    let total: f64 = values.iter().sum();
    if n == 0 || total <= 0.0 {
        return 0.0;
    }
    let mut diffs = 0.0;
    for a in values {
        for b in values {
            diffs += (a - b).abs();
        }
    }
    diffs / (2.0 * n as f64 * total)
}

/// `part / total * 100`, or 0.0 when `total` is zero.
pub fn pct(part: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { part / total * 100.0 }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Non-null values with their counts, most frequent first; ties keep
/// first-seen order.
pub fn value_counts<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Vec<(Cell, usize)> {
    let mut order: Vec<(Cell, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for cell in cells.into_iter().filter(|c| !c.is_null()) {
        let key = format!("{cell:?}");
        match index.get(&key) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(key, order.len());
                order.push((cell.clone(), 1));
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}
