//! Loading delimited files and the upstream duration ceiling.

use std::fs::File;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::parser::duration_minutes;
use crate::schema::{Role, find_column};
use crate::table::{Cell, Table};

/// Delimiters tried, in order, when none is configured.
pub const DEFAULT_DELIMITERS: [char; 3] = [';', ',', '\t'];

struct Parsed {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Reads a `.csv` file, auto-detecting the delimiter.
///
/// Each candidate is tried in order. A candidate fails outright on a
/// structural error (a row wider than the header, unreadable bytes). Among
/// candidates that parse, the first that splits the header into more than one
/// column is taken; a header no candidate splits falls back to the first one
/// that parsed.
pub fn load(path: &Path, delimiters: &[char]) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if extension != "csv" {
        return Err(EngineError::UnsupportedFormat {
            extension: if extension.is_empty() {
                String::new()
            } else {
                format!(".{extension}")
            },
        });
    }
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.display().to_string()));
    }

    let mut fallback: Option<Parsed> = None;
    for &delimiter in delimiters {
        let Some(byte) = delimiter_byte(delimiter) else {
            warn!(?delimiter, "Skipping non-ASCII delimiter");
            continue;
        };
        match parse_with(path, byte) {
            Ok(parsed) if parsed.header.len() > 1 => {
                debug!(?delimiter, columns = parsed.header.len(), "Delimiter accepted");
                return Ok(Table::from_raw(parsed.header, parsed.rows));
            }
            Ok(parsed) => {
                debug!(?delimiter, "Delimiter yields a single column");
                fallback.get_or_insert(parsed);
            }
            Err(e) => {
                debug!(?delimiter, error = %e, "Delimiter rejected");
            }
        }
    }

    match fallback {
        Some(parsed) => Ok(Table::from_raw(parsed.header, parsed.rows)),
        None => Err(EngineError::UnparseableFile {
            path: path.display().to_string(),
        }),
    }
}

fn delimiter_byte(delimiter: char) -> Option<u8> {
    delimiter.is_ascii().then_some(delimiter as u8)
}

fn parse_with(path: &Path, delimiter: u8) -> anyhow::Result<Parsed> {
    let file = File::open(path)?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(file);

    let header = decode(rdr.byte_headers()?)?;
    if header.is_empty() {
        anyhow::bail!("empty header");
    }
    let width = header.len();

    let mut rows = Vec::new();
    for (line, record) in rdr.byte_records().enumerate() {
        let record = record?;
        if record.len() > width {
            anyhow::bail!(
                "row {} has {} fields, header has {}",
                line + 1,
                record.len(),
                width
            );
        }
        rows.push(decode(&record)?);
    }
    Ok(Parsed { header, rows })
}

fn decode(record: &ByteRecord) -> anyhow::Result<Vec<String>> {
    record
        .iter()
        .map(|field| Ok(std::str::from_utf8(field)?.to_string()))
        .collect()
}

/// Drops rows whose start→end span exceeds `ceiling_minutes`.
///
/// Rows missing either timestamp are kept; rows whose timestamps fail to
/// parse count as zero minutes and are kept too. Returns the number removed.
/// A header without recognisable time columns is left untouched.
pub fn filter_by_duration(table: &mut Table, ceiling_minutes: f64) -> usize {
    let columns = table.columns();
    let (Some(start), Some(end)) = (
        find_column(columns, Role::StartTime),
        find_column(columns, Role::EndTime),
    ) else {
        warn!("Could not identify start or end time columns for duration filtering");
        return 0;
    };
    info!(
        start_column = start,
        end_column = end,
        "Using columns for duration filtering"
    );

    let (Some(si), Some(ei)) = (table.column_index(start), table.column_index(end)) else {
        return 0;
    };

    let keep: Vec<bool> = table
        .rows()
        .map(|row| match (&row[si], &row[ei]) {
            (Cell::Null, _) | (_, Cell::Null) => true,
            (s, e) => duration_minutes(s.as_text(), e.as_text()) <= ceiling_minutes,
        })
        .collect();

    let before = table.len();
    table.retain_rows(&keep);
    let filtered = before - table.len();

    info!(
        filtered,
        ceiling_minutes,
        remaining = table.len(),
        before,
        "Filtered long-duration transports"
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_semicolon_first() {
        let file = write_csv("a;b;c\n1;2;3\n4;5;6\n");
        let table = load(file.path(), &DEFAULT_DELIMITERS).unwrap();
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_falls_through_to_comma() {
        let file = write_csv("a,b,c\n1,2,3\n");
        let table = load(file.path(), &DEFAULT_DELIMITERS).unwrap();
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.rows().next().unwrap()[2], Cell::Int(3));
    }

    #[test]
    fn test_tab_delimited() {
        let file = write_csv("a\tb\n1\t2\n");
        let table = load(file.path(), &DEFAULT_DELIMITERS).unwrap();
        assert_eq!(table.columns(), &["a", "b"]);
    }

    #[test]
    fn test_single_column_file() {
        let file = write_csv("value\n1\n2\n");
        let table = load(file.path(), &DEFAULT_DELIMITERS).unwrap();
        assert_eq!(table.columns(), &["value"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_wide_row_rejects_delimiter() {
        // Semicolons split the header into two but a row into three.
        let file = write_csv("a;b\n1;2;3\n");
        assert!(matches!(
            load(file.path(), &[';']),
            Err(EngineError::UnparseableFile { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        match load(file.path(), &DEFAULT_DELIMITERS) {
            Err(EngineError::UnsupportedFormat { extension }) => assert_eq!(extension, ".xlsx"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        assert!(matches!(
            load(&path, &DEFAULT_DELIMITERS),
            Err(EngineError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_filter_by_duration() {
        let file = write_csv(
            "Uppdrag Starttid;Uppdrag Sluttid\n\
             2024-01-05 09:00:00;2024-01-05 09:15:00\n\
             2024-01-05 09:00:00;2024-01-05 09:45:00\n\
             2024-01-05 09:00:00;\n\
             garbage;2024-01-05 09:45:00\n\
             2024-01-05 10:00:00;2024-01-05 10:30:00\n",
        );
        let mut table = load(file.path(), &DEFAULT_DELIMITERS).unwrap();
        let removed = filter_by_duration(&mut table, 30.0);
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 4);
        for row in table.rows() {
            if let (Some(s), Some(e)) = (row[0].as_text(), row[1].as_text()) {
                assert!(duration_minutes(Some(s), Some(e)) <= 30.0);
            }
        }
    }

    #[test]
    fn test_filter_without_time_columns() {
        let file = write_csv("a;b\n1;2\n");
        let mut table = load(file.path(), &DEFAULT_DELIMITERS).unwrap();
        assert_eq!(filter_by_duration(&mut table, 30.0), 0);
        assert_eq!(table.len(), 1);
    }
}
