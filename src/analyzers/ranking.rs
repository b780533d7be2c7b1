//! Selection of extreme and typical buckets by relative inequality.
//!
//! A bucket served by a single transporter has nothing to compare, so every
//! ranking here considers only multi-transporter buckets. Sorting is stable:
//! ties keep (date, hour) order.

use std::cmp::Ordering;

use crate::analyzers::types::WorkloadStat;

fn multi_transporter(stats: &[WorkloadStat]) -> Vec<&WorkloadStat> {
    stats.iter().filter(|s| s.num_transporters > 1).collect()
}

fn by_inequality(a: &&WorkloadStat, b: &&WorkloadStat) -> Ordering {
    a.relative_inequality.total_cmp(&b.relative_inequality)
}

/// The `limit` most uneven buckets, most uneven first.
pub fn highest_inequality(stats: &[WorkloadStat], limit: usize) -> Vec<WorkloadStat> {
    let mut ranked = multi_transporter(stats);
    ranked.sort_by(|a, b| by_inequality(b, a));
    ranked.into_iter().take(limit).cloned().collect()
}

/// The `limit` most even buckets, most even first.
pub fn lowest_inequality(stats: &[WorkloadStat], limit: usize) -> Vec<WorkloadStat> {
    let mut ranked = multi_transporter(stats);
    ranked.sort_by(by_inequality);
    ranked.into_iter().take(limit).cloned().collect()
}

/// `limit` buckets around the median, in ascending inequality order.
///
/// The window is centred on the middle index and shifted inwards when it
/// would run off either end, so it is only shorter than `limit` when there
/// are fewer buckets than that.
pub fn median_inequality(stats: &[WorkloadStat], limit: usize) -> Vec<WorkloadStat> {
    let mut ranked = multi_transporter(stats);
    ranked.sort_by(by_inequality);

    let (start, end) = median_window(ranked.len(), limit);
    ranked[start..end].iter().map(|s| (*s).clone()).collect()
}

fn median_window(len: usize, limit: usize) -> (usize, usize) {
    if limit >= len {
        return (0, len);
    }
    let mid = len / 2;
    let start = mid.saturating_sub(limit / 2).min(len - limit);
    (start, start + limit)
}
