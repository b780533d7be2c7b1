use std::collections::HashMap;

use chrono::Timelike;

use crate::analyzers::aggregate::PreparedRows;
use crate::analyzers::types::TransporterSummary;
use crate::parser::{duration_minutes, parse_datetime};

#[derive(Default)]
struct Acc {
    transports: usize,
    minutes: f64,
    // (hour, count) in first-seen order
    hours: Vec<(u32, usize)>,
}

impl Acc {
    fn busiest_hour(&self) -> Option<u32> {
        let mut best: Option<(u32, usize)> = None;
        for &(hour, count) in &self.hours {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((hour, count));
            }
        }
        best.map(|(h, _)| h)
    }
}

/// Lifetime totals per transporter, busiest first by transport count.
///
/// Every distinct id of the table appears, including ids whose rows all lack
/// a timestamp (they report zero transports). Unparseable durations count as
/// zero minutes but still count as a transport.
pub fn transporter_summary(rows: &PreparedRows<'_>) -> Vec<TransporterSummary> {
    let mut accs: HashMap<String, Acc> = HashMap::new();

    for (transporter, start, end) in rows.iter() {
        let acc = accs.entry(transporter).or_default();
        acc.transports += 1;
        acc.minutes += duration_minutes(start, end);

        if let Some(hour) = parse_datetime(start).map(|t| t.hour()) {
            match acc.hours.iter_mut().find(|(h, _)| *h == hour) {
                Some((_, count)) => *count += 1,
                None => acc.hours.push((hour, 1)),
            }
        }
    }

    let mut summary: Vec<TransporterSummary> = rows
        .transporters()
        .iter()
        .map(|id| {
            let acc = accs.remove(id).unwrap_or_default();
            TransporterSummary {
                transporter_id: id.clone(),
                total_transports: acc.transports,
                total_minutes: acc.minutes,
                avg_duration: if acc.transports > 0 {
                    acc.minutes / acc.transports as f64
                } else {
                    0.0
                },
                busiest_hour: acc.busiest_hour(),
            }
        })
        .collect();

    summary.sort_by(|a, b| b.total_transports.cmp(&a.total_transports));
    summary
}
