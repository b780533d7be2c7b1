//! The engine owns one loaded table and everything derived from it.
//!
//! Aggregation, ranking and the analysis registry borrow the table from here;
//! nothing is shared between engine instances. Reloading replaces the table
//! and drops every cached result.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::analyzers::aggregate::{self, PreparedRows};
use crate::analyzers::descriptive::AnalysisContext;
use crate::analyzers::ranking;
use crate::analyzers::registry::{AnalysisKind, AnalysisOutput, AnalysisParams, AnalysisRequest};
use crate::analyzers::summary;
use crate::analyzers::types::{TransporterSummary, WorkloadReport, WorkloadStat};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::ingest;
use crate::schema::RoleAssignment;
use crate::table::{Cell, ColumnType, RowRecord, Table};

#[derive(Debug)]
struct Dataset {
    table: Table,
    roles: RoleAssignment,
    filtered_count: usize,
}

/// Shape and provenance of the loaded table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub dtypes: BTreeMap<String, ColumnType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_reason: Option<String>,
}

/// Rows matching an exact-value filter, truncated to the configured limit.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredRows<'a> {
    pub data: Vec<RowRecord<'a>>,
    pub total_rows: usize,
    pub returned_rows: usize,
}

/// Leading rows of the table.
#[derive(Debug, Clone, Serialize)]
pub struct Sample<'a> {
    pub data: Vec<RowRecord<'a>>,
    pub total_rows: usize,
    pub sample_size: usize,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    dataset: Option<Dataset>,
    workload: Option<WorkloadReport>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            dataset: None,
            workload: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Loads a CSV file and applies the duration ceiling.
    ///
    /// Any previously loaded table and derived result is discarded, even when
    /// loading fails.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&Table> {
        let path = path.as_ref();
        self.dataset = None;
        self.workload = None;

        let mut table = ingest::load(path, &self.config.delimiters)?;
        let filtered_count = ingest::filter_by_duration(&mut table, self.config.max_duration_minutes);
        let roles = RoleAssignment::infer(table.columns(), &self.config.transporter_column);
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns().len(),
            filtered_count,
            "Loaded transport data"
        );

        let dataset = self.dataset.insert(Dataset {
            table,
            roles,
            filtered_count,
        });
        Ok(&dataset.table)
    }

    fn dataset(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or(EngineError::NoDataLoaded)
    }

    pub fn table(&self) -> Result<&Table> {
        Ok(&self.dataset()?.table)
    }

    /// Rows removed by the duration ceiling at load time.
    pub fn filtered_count(&self) -> Result<usize> {
        Ok(self.dataset()?.filtered_count)
    }

    pub fn columns(&self) -> Result<Vec<String>> {
        Ok(self.table()?.columns().to_vec())
    }

    pub fn data_summary(&self) -> Result<DataSummary> {
        let ds = self.dataset()?;
        let columns = ds.table.columns().to_vec();
        let dtypes = columns
            .iter()
            .cloned()
            .zip(ds.table.dtypes().iter().copied())
            .collect();
        let filtered = ds.filtered_count > 0;

        Ok(DataSummary {
            row_count: ds.table.len(),
            column_count: columns.len(),
            columns,
            dtypes,
            filtered_count: filtered.then_some(ds.filtered_count),
            filtered_reason: filtered.then(|| {
                format!(
                    "Removed transports with duration > {} minutes",
                    self.config.max_duration_minutes
                )
            }),
        })
    }

    /// Rows whose cells equal every filter value. Each value is typed
    /// against its column before comparing. Filter columns the table does not
    /// have are ignored; an empty filter set is rejected.
    pub fn filter_data(&self, filters: &BTreeMap<String, String>) -> Result<FilteredRows<'_>> {
        let table = self.table()?;
        if filters.is_empty() {
            return Err(EngineError::NoFilters);
        }
        let criteria: Vec<(usize, Cell)> = filters
            .iter()
            .filter_map(|(col, raw)| {
                table
                    .column_index(col)
                    .map(|i| (i, table.cell_for(i, raw)))
            })
            .collect();

        let matching: Vec<usize> = table
            .rows()
            .enumerate()
            .filter(|(_, row)| criteria.iter().all(|(i, v)| row[*i].matches(v)))
            .map(|(i, _)| i)
            .collect();

        let data = table.records(matching.iter().copied().take(self.config.filter_row_limit));
        Ok(FilteredRows {
            returned_rows: data.len(),
            total_rows: matching.len(),
            data,
        })
    }

    pub fn sample(&self, size: usize) -> Result<Sample<'_>> {
        let table = self.table()?;
        let data = table.records(0..size.min(table.len()));
        Ok(Sample {
            sample_size: data.len(),
            total_rows: table.len(),
            data,
        })
    }

    pub fn unique_values(&self, column: &str) -> Result<Vec<Cell>> {
        let table = self.table()?;
        let index = table
            .column_index(column)
            .ok_or_else(|| EngineError::ColumnNotFound(column.to_string()))?;
        Ok(table.unique_values(index))
    }

    /// Recomputes the workload buckets and caches the result.
    pub fn analyze_workload(&mut self) -> Result<&WorkloadReport> {
        let ds = self.dataset.as_ref().ok_or(EngineError::NoDataLoaded)?;
        let rows = PreparedRows::new(&ds.table, &ds.roles)?;
        let report = aggregate::analyze_workload(&rows, self.config.max_duration_minutes);
        info!(
            buckets = report.workload_stats.len(),
            hours = report.hourly_stats.len(),
            "Workload analysis complete"
        );
        Ok(self.workload.insert(report))
    }

    /// Cached workload report, computing it on first use.
    pub fn workload(&mut self) -> Result<&WorkloadReport> {
        if self.workload.is_some() {
            return self.workload.as_ref().ok_or(EngineError::NoDataLoaded);
        }
        self.analyze_workload()
    }

    pub fn highest_inequality(&mut self, limit: usize) -> Result<Vec<WorkloadStat>> {
        Ok(ranking::highest_inequality(&self.workload()?.workload_stats, limit))
    }

    pub fn lowest_inequality(&mut self, limit: usize) -> Result<Vec<WorkloadStat>> {
        Ok(ranking::lowest_inequality(&self.workload()?.workload_stats, limit))
    }

    pub fn median_inequality(&mut self, limit: usize) -> Result<Vec<WorkloadStat>> {
        Ok(ranking::median_inequality(&self.workload()?.workload_stats, limit))
    }

    /// Per-transporter totals. Recomputed from the table on every call; it
    /// does not use or populate the cached workload report.
    pub fn transporter_summary(&self) -> Result<Vec<TransporterSummary>> {
        let ds = self.dataset()?;
        let rows = PreparedRows::new(&ds.table, &ds.roles)?;
        Ok(summary::transporter_summary(&rows))
    }

    pub fn available_analyses() -> Vec<&'static str> {
        AnalysisKind::ALL.iter().map(AnalysisKind::name).collect()
    }

    /// Runs one registered analysis by name.
    pub fn run_analysis(&self, name: &str, params: &AnalysisParams) -> Result<AnalysisOutput> {
        let kind: AnalysisKind = name.parse()?;
        let ds = self.dataset()?;
        let ctx = AnalysisContext {
            table: &ds.table,
            roles: &ds.roles,
            max_duration_minutes: self.config.max_duration_minutes,
        };
        Ok(AnalysisRequest::new(kind, params).run(&ctx))
    }

    pub fn run_all_analyses(&self) -> Result<BTreeMap<String, AnalysisOutput>> {
        let params = AnalysisParams::new();
        AnalysisKind::ALL
            .iter()
            .map(|kind| Ok((kind.name().to_string(), self.run_analysis(kind.name(), &params)?)))
            .collect()
    }
}
