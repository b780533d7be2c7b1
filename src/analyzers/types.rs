//! Result types produced by the workload pipeline.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// Workload accumulated for one (date, start hour) bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    pub(crate) transporters: BTreeMap<String, f64>,
    pub(crate) total_duration: f64,
}

impl Bucket {
    pub fn add(&mut self, transporter: &str, minutes: f64) {
        *self.transporters.entry(transporter.to_string()).or_default() += minutes;
        self.total_duration += minutes;
    }

    pub fn transporter_count(&self) -> usize {
        self.transporters.len()
    }
}

/// Finalized inequality summary of one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadStat {
    pub date: NaiveDate,
    pub hour: u32,
    pub num_transporters: usize,
    pub total_duration_minutes: f64,
    /// Share each transporter would have under a perfectly even split.
    pub expected_workload_percent: f64,
    pub range_percent: f64,
    pub std_dev: f64,
    pub relative_inequality: f64,
    pub gini: f64,
    /// Transporter id → share of the bucket's minutes, in percent.
    pub workload_details: BTreeMap<String, f64>,
    pub date_hour: String,
}

/// Per-hour means across every bucket that starts in that hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStat {
    pub hour: u32,
    pub avg_std_dev: f64,
    pub avg_relative_inequality: f64,
    pub avg_gini: f64,
    pub avg_transporters: f64,
    pub avg_range: f64,
    pub count: usize,
    pub hour_formatted: String,
}

/// Output of one workload analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkloadReport {
    pub workload_stats: Vec<WorkloadStat>,
    pub hourly_stats: Vec<HourlyStat>,
}

/// Lifetime totals for one transporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransporterSummary {
    pub transporter_id: String,
    pub total_transports: usize,
    pub total_minutes: f64,
    pub avg_duration: f64,
    pub busiest_hour: Option<u32>,
}
