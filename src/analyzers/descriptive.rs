//! Descriptive analyses over the filtered table.
//!
//! None of these touch the workload buckets. Each one resolves its own
//! columns and, when it cannot, returns its empty shape with `error` set
//! instead of failing.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;
use tracing::warn;

use crate::analyzers::utility::{mean, median, pct, round2, stddev, value_counts};
use crate::error::EngineError;
use crate::parser::{duration_minutes, parse_datetime};
use crate::schema::{Role, RoleAssignment};
use crate::table::{Cell, Table};

/// Width of one duration histogram bin, in minutes.
pub const HISTOGRAM_BIN_MINUTES: usize = 5;
/// Largest ceiling a duration histogram is built for (one week).
pub const MAX_HISTOGRAM_CEILING: f64 = 7.0 * 24.0 * 60.0;
/// Entries kept by each location ranking.
pub const TOP_LOCATIONS: usize = 10;
/// Joins start and end location into a route label.
pub const ROUTE_SEPARATOR: &str = " → ";

/// What every analysis sees: the table, its role assignment and the ceiling.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub table: &'a Table,
    pub roles: &'a RoleAssignment,
    pub max_duration_minutes: f64,
}

impl AnalysisContext<'_> {
    /// Column index for an explicit override, or for the role's inferred
    /// column.
    fn column(&self, explicit: Option<&str>, role: Role) -> Result<usize, String> {
        let name = match explicit {
            Some(name) => name,
            None => self
                .roles
                .get(role)
                .ok_or_else(|| EngineError::Schema { role }.to_string())?,
        };
        self.table
            .column_index(name)
            .ok_or_else(|| EngineError::ColumnNotFound(name.to_string()).to_string())
    }

    /// Start hour of every row; `None` where the start does not parse.
    fn hours(&self, start: usize) -> Vec<Option<u32>> {
        self.table
            .column(start)
            .map(|c| parse_datetime(c.as_text()).map(|t| t.hour()))
            .collect()
    }
}

fn degraded<T>(analysis: &str, error: String, empty: impl FnOnce(Option<String>) -> T) -> T {
    warn!(analysis, error = %error, "Analysis degraded to empty result");
    empty(Some(error))
}

/// Transports per start hour over a full day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyActivity {
    pub hours: Vec<u32>,
    pub counts: Vec<usize>,
    pub percentages: Vec<f64>,
    pub peak_hour: Option<u32>,
    pub slowest_hour: Option<u32>,
    pub total: usize,
    pub max_duration_filter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HourlyActivity {
    fn empty(max_duration_filter: f64, error: Option<String>) -> Self {
        Self {
            hours: (0..24).collect(),
            counts: vec![0; 24],
            percentages: vec![0.0; 24],
            peak_hour: None,
            slowest_hour: None,
            total: 0,
            max_duration_filter,
            error,
        }
    }
}

pub fn hourly_activity(ctx: &AnalysisContext<'_>, date_column: Option<&str>) -> HourlyActivity {
    let ceiling = ctx.max_duration_minutes;
    let start = match ctx.column(date_column, Role::StartTime) {
        Ok(i) => i,
        Err(e) => return degraded("hourly_activity", e, |e| HourlyActivity::empty(ceiling, e)),
    };

    let mut counts = vec![0usize; 24];
    for hour in ctx.hours(start).into_iter().flatten() {
        counts[hour as usize] += 1;
    }
    let total: usize = counts.iter().sum();

    let observed = || (0..24u32).filter(|&h| counts[h as usize] > 0);
    // Earliest hour wins ties in both directions.
    let peak_hour = observed().fold(None, |best: Option<u32>, h| match best {
        Some(b) if counts[b as usize] >= counts[h as usize] => Some(b),
        _ => Some(h),
    });
    let slowest_hour = observed().fold(None, |best: Option<u32>, h| match best {
        Some(b) if counts[b as usize] <= counts[h as usize] => Some(b),
        _ => Some(h),
    });

    HourlyActivity {
        hours: (0..24).collect(),
        percentages: counts
            .iter()
            .map(|&c| round2(pct(c as f64, total as f64)))
            .collect(),
        counts,
        peak_hour,
        slowest_hour,
        total,
        max_duration_filter: ceiling,
        error: None,
    }
}

/// Distribution of transport types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportTypes {
    pub types: Vec<Cell>,
    pub counts: Vec<usize>,
    pub percentages: Vec<f64>,
    pub most_common: Option<Cell>,
    pub least_common: Option<Cell>,
    pub total: usize,
    pub max_duration_filter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransportTypes {
    fn empty(max_duration_filter: f64, error: Option<String>) -> Self {
        Self {
            types: Vec::new(),
            counts: Vec::new(),
            percentages: Vec::new(),
            most_common: None,
            least_common: None,
            total: 0,
            max_duration_filter,
            error,
        }
    }
}

pub fn transport_types(ctx: &AnalysisContext<'_>, type_column: Option<&str>) -> TransportTypes {
    let ceiling = ctx.max_duration_minutes;
    let column = match ctx.column(type_column, Role::Category) {
        Ok(i) => i,
        Err(e) => return degraded("transport_types", e, |e| TransportTypes::empty(ceiling, e)),
    };

    let counts = value_counts(ctx.table.column(column));
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let (types, counts): (Vec<Cell>, Vec<usize>) = counts.into_iter().unzip();

    TransportTypes {
        most_common: types.first().cloned(),
        least_common: types.last().cloned(),
        percentages: percentages_of(&counts, total),
        types,
        counts,
        total,
        max_duration_filter: ceiling,
        error: None,
    }
}

fn percentages_of(counts: &[usize], total: usize) -> Vec<f64> {
    counts
        .iter()
        .map(|&c| round2(pct(c as f64, total as f64)))
        .collect()
}

/// Ranked labels with counts and percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frequency {
    pub names: Vec<Cell>,
    pub counts: Vec<usize>,
    pub percentages: Vec<f64>,
}

impl Frequency {
    /// Top `limit` values, percentages relative to `rows`.
    fn top<'a>(cells: impl IntoIterator<Item = &'a Cell>, limit: usize, rows: usize) -> Self {
        let (names, counts): (Vec<Cell>, Vec<usize>) =
            value_counts(cells).into_iter().take(limit).unzip();
        Self {
            percentages: percentages_of(&counts, rows),
            names,
            counts,
        }
    }
}

/// Most frequent start places, end places and routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFrequency {
    pub start_locations: Frequency,
    pub end_locations: Frequency,
    pub routes: Frequency,
    pub max_duration_filter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocationFrequency {
    fn empty(max_duration_filter: f64, error: Option<String>) -> Self {
        Self {
            start_locations: Frequency::default(),
            end_locations: Frequency::default(),
            routes: Frequency::default(),
            max_duration_filter,
            error,
        }
    }
}

pub fn location_frequency(
    ctx: &AnalysisContext<'_>,
    start_column: Option<&str>,
    end_column: Option<&str>,
) -> LocationFrequency {
    let ceiling = ctx.max_duration_minutes;
    let columns = ctx
        .column(start_column, Role::StartLocation)
        .and_then(|s| Ok((s, ctx.column(end_column, Role::EndLocation)?)));
    let (start, end) = match columns {
        Ok(pair) => pair,
        Err(e) => {
            return degraded("location_frequency", e, |e| {
                LocationFrequency::empty(ceiling, e)
            });
        }
    };

    let rows = ctx.table.len();
    let routes: Vec<Cell> = ctx
        .table
        .rows()
        .map(|r| match (&r[start], &r[end]) {
            (Cell::Null, _) | (_, Cell::Null) => Cell::Null,
            (s, e) => Cell::Text(format!("{s}{ROUTE_SEPARATOR}{e}")),
        })
        .collect();

    LocationFrequency {
        start_locations: Frequency::top(ctx.table.column(start), TOP_LOCATIONS, rows),
        end_locations: Frequency::top(ctx.table.column(end), TOP_LOCATIONS, rows),
        routes: Frequency::top(&routes, TOP_LOCATIONS, rows),
        max_duration_filter: ceiling,
        error: None,
    }
}

/// Fixed-width duration histogram; `bins` are left edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub bins: Vec<f64>,
    pub values: Vec<usize>,
}

impl Histogram {
    fn check_ceiling(ceiling: f64) -> Result<(), String> {
        if !ceiling.is_finite() || ceiling < 0.0 {
            return Err(format!("Invalid duration ceiling: {ceiling}"));
        }
        if ceiling > MAX_HISTOGRAM_CEILING {
            return Err(format!(
                "Duration ceiling {ceiling} exceeds histogram limit of {MAX_HISTOGRAM_CEILING} minutes"
            ));
        }
        Ok(())
    }

    /// Bin edges `0, 5, ...` strictly below `floor(ceiling) + 5`, at least
    /// one bin wide.
    fn edges(ceiling: f64) -> Result<Vec<f64>, String> {
        Self::check_ceiling(ceiling)?;
        let stop = ceiling.trunc() as usize + HISTOGRAM_BIN_MINUTES;
        let mut edges: Vec<f64> = (0..stop)
            .step_by(HISTOGRAM_BIN_MINUTES)
            .map(|e| e as f64)
            .collect();
        if edges.len() < 2 {
            edges.push(HISTOGRAM_BIN_MINUTES as f64);
        }
        Ok(edges)
    }

    fn empty(ceiling: f64) -> Self {
        let bins = Self::edges(ceiling)
            .map(|mut e| {
                e.pop();
                e
            })
            .unwrap_or_default();
        Self {
            values: vec![0; bins.len()],
            bins,
        }
    }

    /// Counts values into half-open bins; the last bin also takes its right
    /// edge. Values outside the edges are ignored.
    fn build(values: &[f64], ceiling: f64) -> Result<Self, String> {
        let edges = Self::edges(ceiling)?;
        let last = edges.len() - 1;
        let mut counts = vec![0usize; last];
        for &v in values {
            if v < edges[0] || v > edges[last] {
                continue;
            }
            let bin = edges[1..]
                .iter()
                .position(|&right| v < right)
                .unwrap_or(last - 1);
            counts[bin] += 1;
        }
        Ok(Self {
            bins: edges[..last].to_vec(),
            values: counts,
        })
    }
}

/// Summary statistics over transport durations within the ceiling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportDuration {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub count: usize,
    pub histogram: Histogram,
    pub max_duration_filter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransportDuration {
    fn empty(max_duration_filter: f64, error: Option<String>) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            std: 0.0,
            count: 0,
            histogram: Histogram::empty(max_duration_filter),
            max_duration_filter,
            error,
        }
    }
}

pub fn transport_duration(ctx: &AnalysisContext<'_>) -> TransportDuration {
    let ceiling = ctx.max_duration_minutes;
    let columns = Histogram::check_ceiling(ceiling)
        .and_then(|_| ctx.column(None, Role::StartTime))
        .and_then(|s| Ok((s, ctx.column(None, Role::EndTime)?)));
    let (start, end) = match columns {
        Ok(pair) => pair,
        Err(e) => {
            return degraded("transport_duration", e, |e| {
                TransportDuration::empty(ceiling, e)
            });
        }
    };

    let durations: Vec<f64> = ctx
        .table
        .rows()
        .map(|r| duration_minutes(r[start].as_text(), r[end].as_text()))
        .filter(|&d| d > 0.0 && d <= ceiling)
        .collect();

    if durations.is_empty() {
        return TransportDuration::empty(ceiling, None);
    }

    let histogram = match Histogram::build(&durations, ceiling) {
        Ok(h) => h,
        Err(e) => {
            return degraded("transport_duration", e, |e| {
                TransportDuration::empty(ceiling, e)
            });
        }
    };
    let avg = mean(&durations);

    TransportDuration {
        min: durations.iter().copied().fold(f64::INFINITY, f64::min),
        max: durations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean: avg,
        median: median(&durations),
        std: stddev(&durations, avg),
        count: durations.len(),
        histogram,
        max_duration_filter: ceiling,
        error: None,
    }
}

/// Priority counts inside one start hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourPriorities {
    pub priorities: Vec<Cell>,
    pub counts: Vec<usize>,
    pub percentages: Vec<f64>,
    pub total: usize,
}

/// Priority distribution overall and per start hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityDistribution {
    pub priorities: Vec<Cell>,
    pub counts: Vec<usize>,
    pub percentages: Vec<f64>,
    pub total: usize,
    pub hourly_distribution: BTreeMap<u32, HourPriorities>,
    pub max_duration_filter: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriorityDistribution {
    fn empty(max_duration_filter: f64, error: Option<String>) -> Self {
        Self {
            priorities: Vec::new(),
            counts: Vec::new(),
            percentages: Vec::new(),
            total: 0,
            hourly_distribution: BTreeMap::new(),
            max_duration_filter,
            error,
        }
    }
}

pub fn priority_distribution(
    ctx: &AnalysisContext<'_>,
    priority_column: Option<&str>,
) -> PriorityDistribution {
    let ceiling = ctx.max_duration_minutes;
    let column = match ctx.column(priority_column, Role::Priority) {
        Ok(i) => i,
        Err(e) => {
            return degraded("priority_analysis", e, |e| {
                PriorityDistribution::empty(ceiling, e)
            });
        }
    };

    let (priorities, counts): (Vec<Cell>, Vec<usize>) =
        value_counts(ctx.table.column(column)).into_iter().unzip();
    let total: usize = counts.iter().sum();

    // Without a start column there is simply no per-hour breakdown.
    let mut hourly_distribution = BTreeMap::new();
    if let Ok(start) = ctx.column(None, Role::StartTime) {
        let hours = ctx.hours(start);
        for hour in 0..24u32 {
            let in_hour: Vec<&Cell> = ctx
                .table
                .column(column)
                .zip(&hours)
                .filter(|(_, h)| **h == Some(hour))
                .map(|(c, _)| c)
                .collect();
            if in_hour.is_empty() {
                continue;
            }
            let (priorities, counts): (Vec<Cell>, Vec<usize>) =
                value_counts(in_hour).into_iter().unzip();
            let hour_total: usize = counts.iter().sum();
            hourly_distribution.insert(
                hour,
                HourPriorities {
                    percentages: percentages_of(&counts, hour_total),
                    priorities,
                    counts,
                    total: hour_total,
                },
            );
        }
    }

    PriorityDistribution {
        percentages: percentages_of(&counts, total),
        priorities,
        counts,
        total,
        hourly_distribution,
        max_duration_filter: ceiling,
        error: None,
    }
}
