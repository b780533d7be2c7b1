//! Free-form timestamp parsing and duration arithmetic.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

/// Accepted layouts, tried in this order. `%d-%m` and `%m/%d` can both
/// match a day-of-month up to 12; the first hit wins.
pub const DATETIME_FORMATS: [&str; 4] = [
    "%d-%m-%Y %H:%M:%S", // 31-12-2023 22:36:16
    "%Y-%m-%d %H:%M:%S", // 2023-12-31 22:36:16
    "%m/%d/%Y %H:%M:%S", // 12/31/2023 22:36:16
    "%d/%m/%Y %H:%M:%S", // 31/12/2023 22:36:16
];

/// Parses a timestamp against [`DATETIME_FORMATS`].
///
/// Returns `None` for missing, blank or unrecognised input.
pub fn parse_datetime(text: Option<&str>) -> Option<NaiveDateTime> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }

    let parsed = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok());

    if parsed.is_none() {
        debug!(value = text, "Could not parse datetime");
    }
    parsed
}

/// Minutes from `start` to `end`.
///
/// Yields 0.0 when either side fails to parse or the span is negative; a
/// negative span is logged as a data-quality warning.
pub fn duration_minutes(start: Option<&str>, end: Option<&str>) -> f64 {
    let (Some(start), Some(end)) = (parse_datetime(start), parse_datetime(end)) else {
        return 0.0;
    };
    minutes_between(start, end)
}

/// Same rule as [`duration_minutes`] for already-parsed instants.
pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
    if minutes < 0.0 {
        warn!(%start, %end, minutes, "Negative duration calculated");
        return 0.0;
    }
    minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(22, 36, 16)
            .unwrap()
    }

    #[test]
    fn test_each_format_parses_back() {
        let when = instant();
        for fmt in DATETIME_FORMATS {
            let text = when.format(fmt).to_string();
            assert_eq!(parse_datetime(Some(&text)), Some(when), "format {fmt}");
        }
    }

    #[test]
    fn test_missing_and_garbage() {
        assert_eq!(parse_datetime(None), None);
        assert_eq!(parse_datetime(Some("")), None);
        assert_eq!(parse_datetime(Some("   ")), None);
        assert_eq!(parse_datetime(Some("yesterday")), None);
        assert_eq!(parse_datetime(Some("2023-12-31")), None);
    }

    #[test]
    fn test_ambiguous_dates_prefer_month_first_slash() {
        // 03/04 is read as March 4th because %m/%d is tried before %d/%m.
        let parsed = parse_datetime(Some("03/04/2024 08:00:00")).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

        // 13/04 cannot be a month, so it falls through to %d/%m.
        let parsed = parse_datetime(Some("13/04/2024 08:00:00")).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 4, 13).unwrap());
    }

    #[test]
    fn test_day_first_dash_format() {
        let parsed = parse_datetime(Some("05-01-2024 09:15:00")).unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(parsed.hour(), 9);
    }

    #[test]
    fn test_duration_minutes() {
        let d = duration_minutes(Some("2024-01-05 09:00:00"), Some("2024-01-05 09:15:30"));
        assert!((d - 15.5).abs() < 1e-9);
    }

    #[test]
    fn test_duration_negative_or_unparseable_is_zero() {
        assert_eq!(
            duration_minutes(Some("2024-01-05 10:00:00"), Some("2024-01-05 09:00:00")),
            0.0
        );
        assert_eq!(duration_minutes(Some("bad"), Some("2024-01-05 09:00:00")), 0.0);
        assert_eq!(duration_minutes(None, Some("2024-01-05 09:00:00")), 0.0);
    }

    #[test]
    fn test_duration_across_formats() {
        let d = duration_minutes(Some("05-01-2024 23:50:00"), Some("2024-01-06 00:10:00"));
        assert!((d - 20.0).abs() < 1e-9);
    }
}
