//! Output formatting and persistence for analysis results.
//!
//! Supports a JSON response envelope on stdout and CSV append of workload
//! buckets.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::WorkloadStat;

/// Response wrapper printed by the CLI for every command.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: None,
        }
    }
}

impl Envelope<()> {
    pub fn failure(error: impl Into<String>, status: u16) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status: Some(status),
        }
    }
}

/// Writes `value` as pretty-printed JSON to `out`.
pub fn write_json<T: Serialize, W: Write>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Prints `value` as pretty-printed JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)
}

/// One workload bucket flattened for CSV. The per-transporter shares are
/// joined into a single `id=percent` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadCsvRow {
    pub date: String,
    pub hour: u32,
    pub date_hour: String,
    pub num_transporters: usize,
    pub total_duration_minutes: f64,
    pub expected_workload_percent: f64,
    pub range_percent: f64,
    pub std_dev: f64,
    pub relative_inequality: f64,
    pub gini: f64,
    pub workload_details: String,
}

impl From<&WorkloadStat> for WorkloadCsvRow {
    fn from(stat: &WorkloadStat) -> Self {
        let workload_details = stat
            .workload_details
            .iter()
            .map(|(id, pct)| format!("{id}={pct:.2}"))
            .collect::<Vec<_>>()
            .join(";");
        Self {
            date: stat.date.format("%Y-%m-%d").to_string(),
            hour: stat.hour,
            date_hour: stat.date_hour.clone(),
            num_transporters: stat.num_transporters,
            total_duration_minutes: stat.total_duration_minutes,
            expected_workload_percent: stat.expected_workload_percent,
            range_percent: stat.range_percent,
            std_dev: stat.std_dev,
            relative_inequality: stat.relative_inequality,
            gini: stat.gini,
            workload_details,
        }
    }
}

/// Appends workload buckets as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_workload(path: &Path, stats: &[WorkloadStat]) -> Result<usize> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending workload rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for stat in stats {
        writer.serialize(WorkloadCsvRow::from(stat))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = stats.len(), "Workload CSV written");
    Ok(stats.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::fs;

    fn stat(hour: u32) -> WorkloadStat {
        WorkloadStat {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            hour,
            num_transporters: 2,
            total_duration_minutes: 25.0,
            expected_workload_percent: 50.0,
            range_percent: 20.0,
            std_dev: 10.0,
            relative_inequality: 0.2,
            gini: 0.1,
            workload_details: BTreeMap::from([("A".to_string(), 60.0), ("B".to_string(), 40.0)]),
            date_hour: format!("2024-01-05 {hour}:00"),
        }
    }

    #[test]
    fn test_csv_row_flattens_details() {
        let row = WorkloadCsvRow::from(&stat(9));
        assert_eq!(row.date, "2024-01-05");
        assert_eq!(row.workload_details, "A=60.00;B=40.00");
    }

    #[test]
    fn test_envelope_shapes() {
        let ok = serde_json::to_value(Envelope::ok(vec![1, 2])).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": [1, 2]}));

        let failed = serde_json::to_value(Envelope::failure("No data loaded", 404)).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({"success": false, "error": "No data loaded", "status": 404})
        );
    }

    #[test]
    fn test_write_json_ends_with_newline() {
        let mut buf = Vec::new();
        write_json(&mut buf, &serde_json::json!({"a": 1})).unwrap();
        assert!(String::from_utf8(buf).unwrap().ends_with("}\n"));
    }

    #[test]
    fn test_append_workload_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.csv");

        append_workload(&path, &[stat(9)]).unwrap();
        append_workload(&path, &[stat(10), stat(11)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        // 1 header + 3 data rows
        assert_eq!(lines.len(), 4);
        assert_eq!(
            content.lines().filter(|l| l.starts_with("date,")).count(),
            1
        );
    }
}
