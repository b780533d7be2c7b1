//! In-memory tabular data: named columns, untyped cells.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// One cell value. Empty CSV fields are `Null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// The raw text of a text cell. Numeric cells are not timestamps and
    /// yield `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parses a single value the way a column of one value would be typed.
    pub fn infer(raw: &str) -> Cell {
        if raw.is_empty() {
            Cell::Null
        } else if let Ok(i) = raw.parse::<i64>() {
            Cell::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            Cell::Float(f)
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Key used when a cell identifies something (a transporter, a label).
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Equality used for exact-match filters: numbers compare by value
    /// regardless of integer/float representation.
    pub fn matches(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Int(a), Cell::Float(b)) | (Cell::Float(b), Cell::Int(a)) => *a as f64 == *b,
            _ => self == other,
        }
    }

    // Hashable identity for distinct-value bookkeeping.
    fn identity(&self) -> (u8, String) {
        match self {
            Cell::Null => (0, String::new()),
            Cell::Int(i) => (1, i.to_string()),
            Cell::Float(f) => (2, f.to_bits().to_string()),
            Cell::Text(s) => (3, s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Storage type of a whole column, named after the pandas dtypes the
/// dashboard expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    #[serde(rename = "int64")]
    Int,
    #[serde(rename = "float64")]
    Float,
    #[serde(rename = "object")]
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Text => "object",
        }
    }
}

/// Ordered columns and rows. Every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    dtypes: Vec<ColumnType>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a typed table from raw string fields.
    ///
    /// Header names are made unique (`Unnamed: i` for blanks, `name.1` for
    /// repeats). Each column is typed as a whole: integral if every non-empty
    /// field parses as `i64`, float if every one parses as `f64`, text
    /// otherwise. Short rows are padded with nulls.
    pub fn from_raw(header: Vec<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let columns = dedupe_header(header);
        let width = columns.len();

        let dtypes: Vec<ColumnType> = (0..width)
            .map(|c| infer_column_type(raw_rows.iter().filter_map(|r| r.get(c))))
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|raw| {
                (0..width)
                    .map(|c| match raw.get(c) {
                        Some(field) => typed_cell(field, dtypes[c]),
                        None => Cell::Null,
                    })
                    .collect()
            })
            .collect();

        Self {
            columns,
            dtypes,
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dtypes(&self) -> &[ColumnType] {
        &self.dtypes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        &self.rows[index]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column, in row order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |r| &r[index])
    }

    /// Keeps rows whose `keep` flag is set, preserving order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.rows.retain(|_| *flags.next().unwrap_or(&true));
    }

    /// Ordered mapping view of one row.
    pub fn record(&self, index: usize) -> RowRecord<'_> {
        RowRecord {
            columns: &self.columns,
            cells: &self.rows[index],
        }
    }

    /// Records for the rows at `indices`.
    pub fn records<'a>(&'a self, indices: impl IntoIterator<Item = usize>) -> Vec<RowRecord<'a>> {
        indices.into_iter().map(|i| self.record(i)).collect()
    }

    /// Distinct cells of a column in first-seen order; null counts once.
    /// Types a caller-supplied value against column `index`. Text columns
    /// keep it verbatim; numeric columns parse it, and a value that is not a
    /// number stays text so it matches no cell.
    pub fn cell_for(&self, index: usize, raw: &str) -> Cell {
        match self.dtypes[index] {
            ColumnType::Text => typed_cell(raw, ColumnType::Text),
            ColumnType::Int | ColumnType::Float => Cell::infer(raw),
        }
    }

    pub fn unique_values(&self, index: usize) -> Vec<Cell> {
        let mut seen = HashSet::new();
        self.column(index)
            .filter(|c| seen.insert(c.identity()))
            .cloned()
            .collect()
    }
}

/// A row serialized as `{column: value, ...}` in header order.
#[derive(Debug, Clone, Copy)]
pub struct RowRecord<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

fn dedupe_header(header: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(header.len());
    for (i, name) in header.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {i}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

fn infer_column_type<'a>(fields: impl Iterator<Item = &'a String>) -> ColumnType {
    let mut ty = ColumnType::Int;
    let mut any = false;
    for field in fields.filter(|f| !f.is_empty()) {
        any = true;
        if ty == ColumnType::Int && field.parse::<i64>().is_err() {
            ty = ColumnType::Float;
        }
        if ty == ColumnType::Float && field.parse::<f64>().is_err() {
            return ColumnType::Text;
        }
    }
    if any { ty } else { ColumnType::Float }
}

fn typed_cell(field: &str, ty: ColumnType) -> Cell {
    if field.is_empty() {
        return Cell::Null;
    }
    match ty {
        ColumnType::Int => field.parse().map(Cell::Int).unwrap_or(Cell::Null),
        ColumnType::Float => field.parse().map(Cell::Float).unwrap_or(Cell::Null),
        ColumnType::Text => Cell::Text(field.to_string()),
    }
}
