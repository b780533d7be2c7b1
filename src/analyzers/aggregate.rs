use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, Timelike};
use tracing::{debug, info};

use crate::analyzers::types::{Bucket, HourlyStat, WorkloadReport, WorkloadStat};
use crate::analyzers::utility::{gini, mean, pct, stddev};
use crate::error::{EngineError, Result};
use crate::parser::{minutes_between, parse_datetime};
use crate::schema::{Role, RoleAssignment};
use crate::table::{Cell, Table};

/// Rows eligible for transporter analysis: transporter id, start and end all
/// present.
#[derive(Debug)]
pub struct PreparedRows<'a> {
    table: &'a Table,
    transporter: usize,
    start: usize,
    end: usize,
    valid: Vec<usize>,
    transporters: Vec<String>,
}

impl<'a> PreparedRows<'a> {
    /// Resolves the three required columns and selects valid rows.
    ///
    /// Fails with a schema error naming whichever role is missing.
    pub fn new(table: &'a Table, roles: &RoleAssignment) -> Result<Self> {
        let transporter_col = roles.require(Role::TransporterId)?;
        let start_col = roles.require(Role::StartTime)?;
        let end_col = roles.require(Role::EndTime)?;
        info!(
            transporter_column = transporter_col,
            start_column = start_col,
            end_column = end_col,
            "Resolved workload columns"
        );

        let index = |name: &str, role| {
            table
                .column_index(name)
                .ok_or(EngineError::Schema { role })
        };
        let transporter = index(transporter_col, Role::TransporterId)?;
        let start = index(start_col, Role::StartTime)?;
        let end = index(end_col, Role::EndTime)?;

        let mut seen = HashSet::new();
        let transporters: Vec<String> = table
            .column(transporter)
            .filter(|c| !c.is_null())
            .map(Cell::key)
            .filter(|k| seen.insert(k.clone()))
            .collect();

        let valid: Vec<usize> = table
            .rows()
            .enumerate()
            .filter(|(_, r)| !r[transporter].is_null() && !r[start].is_null() && !r[end].is_null())
            .map(|(i, _)| i)
            .collect();

        info!(
            transporters = transporters.len(),
            valid_rows = valid.len(),
            total_rows = table.len(),
            "Prepared rows for transporter analysis"
        );

        Ok(Self {
            table,
            transporter,
            start,
            end,
            valid,
            transporters,
        })
    }

    /// Distinct non-null transporter ids of the whole table, first-seen order.
    pub fn transporters(&self) -> &[String] {
        &self.transporters
    }

    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    /// `(transporter, start text, end text)` for each valid row.
    pub fn iter(&self) -> impl Iterator<Item = (String, Option<&'a str>, Option<&'a str>)> + '_ {
        let table = self.table;
        self.valid.iter().map(move |&i| {
            let row = table.row(i);
            (
                row[self.transporter].key(),
                row[self.start].as_text(),
                row[self.end].as_text(),
            )
        })
    }
}

/// Groups valid rows into (date, hour) buckets and derives inequality metrics.
///
/// Rows whose timestamps do not parse are skipped, as is any row longer than
/// `ceiling_minutes`. Output is ordered by date then hour; hours without
/// buckets are absent from the hourly list.
pub fn analyze_workload(rows: &PreparedRows<'_>, ceiling_minutes: f64) -> WorkloadReport {
    let mut buckets: BTreeMap<(NaiveDate, u32), Bucket> = BTreeMap::new();
    let mut skipped = 0usize;

    for (transporter, start, end) in rows.iter() {
        let (Some(start), Some(end)) = (parse_datetime(start), parse_datetime(end)) else {
            skipped += 1;
            continue;
        };
        let minutes = minutes_between(start, end);
        if minutes > ceiling_minutes {
            skipped += 1;
            continue;
        }
        buckets
            .entry((start.date(), start.hour()))
            .or_default()
            .add(&transporter, minutes);
    }
    debug!(buckets = buckets.len(), skipped, "Bucketed transports");

    let workload_stats: Vec<WorkloadStat> = buckets
        .iter()
        .filter(|(_, b)| b.transporter_count() > 0)
        .map(|(&(date, hour), bucket)| workload_stat(date, hour, bucket))
        .collect();
    let hourly_stats = hourly_stats(&workload_stats);

    WorkloadReport {
        workload_stats,
        hourly_stats,
    }
}

/// Computes the finalized metrics for one bucket.
pub fn workload_stat(date: NaiveDate, hour: u32, bucket: &Bucket) -> WorkloadStat {
    let n = bucket.transporter_count();
    let total = bucket.total_duration;
    let expected = if n > 0 { 100.0 / n as f64 } else { 0.0 };

    let workload_details: BTreeMap<String, f64> = bucket
        .transporters
        .iter()
        .map(|(id, minutes)| (id.clone(), pct(*minutes, total)))
        .collect();
    let shares: Vec<f64> = workload_details.values().copied().collect();

    let max = shares.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = shares.iter().copied().fold(f64::INFINITY, f64::min);
    let range = if shares.is_empty() { 0.0 } else { max - min };
    let std_dev = stddev(&shares, mean(&shares));
    let relative_inequality = if expected == 0.0 {
        0.0
    } else {
        std_dev / expected
    };

    WorkloadStat {
        date,
        hour,
        num_transporters: n,
        total_duration_minutes: total,
        expected_workload_percent: expected,
        range_percent: range,
        std_dev,
        relative_inequality,
        gini: gini(&shares),
        workload_details,
        date_hour: format!("{} {}:00", date.format("%Y-%m-%d"), hour),
    }
}

fn hourly_stats(stats: &[WorkloadStat]) -> Vec<HourlyStat> {
    (0..24u32)
        .filter_map(|hour| {
            let group: Vec<&WorkloadStat> = stats.iter().filter(|s| s.hour == hour).collect();
            if group.is_empty() {
                return None;
            }
            let avg = |f: fn(&WorkloadStat) -> f64| {
                mean(&group.iter().map(|s| f(s)).collect::<Vec<_>>())
            };
            Some(HourlyStat {
                hour,
                avg_std_dev: avg(|s| s.std_dev),
                avg_relative_inequality: avg(|s| s.relative_inequality),
                avg_gini: avg(|s| s.gini),
                avg_transporters: avg(|s| s.num_transporters as f64),
                avg_range: avg(|s| s.range_percent),
                count: group.len(),
                hour_formatted: format!("{hour}:00"),
            })
        })
        .collect()
}
