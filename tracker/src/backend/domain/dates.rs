//! Calendar-day normalization.
//!
//! Every stored expense date is a `YYYY-MM-DD` string, so range filters can
//! compare dates lexicographically. Input is accepted in the common shapes a
//! form or an API client produces and reduced to its UTC calendar day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DAY_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DAY_FORMATS: &[&str] = &[DAY_FORMAT, "%Y/%m/%d", "%m/%d/%Y"];

/// Current UTC calendar day
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a date or timestamp into its UTC calendar day.
///
/// Returns `None` for empty or unrecognized input.
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for format in DAY_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(input, format) {
            return Some(day);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt.date());
        }
    }

    // Month only: first day of that month
    NaiveDate::parse_from_str(&format!("{}-01", input), DAY_FORMAT).ok()
}

/// Normalize `input` to `YYYY-MM-DD`, using `fallback` when it is missing or
/// cannot be parsed.
pub fn normalize_day(input: Option<&str>, fallback: NaiveDate) -> String {
    format_day(input.and_then(parse_day).unwrap_or(fallback))
}

/// `YYYY-MM` key of a stored date, `None` when the date does not parse
pub fn month_key(date: &str) -> Option<String> {
    parse_day(date).map(|day| day.format("%Y-%m").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_plain_day() {
        assert_eq!(parse_day("2024-01-05"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("  2024-01-05 "), Some(day(2024, 1, 5)));
    }

    #[test]
    fn test_parse_timestamp_reduces_to_utc_day() {
        assert_eq!(parse_day("2024-01-05T23:30:00-05:00"), Some(day(2024, 1, 6)));
        assert_eq!(parse_day("2024-01-05T10:00:00Z"), Some(day(2024, 1, 5)));
        assert_eq!(parse_day("2024-01-05T10:00:00.123"), Some(day(2024, 1, 5)));
    }

    #[test]
    fn test_parse_alternative_shapes() {
        assert_eq!(parse_day("2024/03/09"), Some(day(2024, 3, 9)));
        assert_eq!(parse_day("03/09/2024"), Some(day(2024, 3, 9)));
        assert_eq!(parse_day("2024-03"), Some(day(2024, 3, 1)));
    }

    #[test]
    fn test_unparseable_input() {
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("yesterday"), None);
        assert_eq!(parse_day("2024-13-40"), None);
    }

    #[test]
    fn test_normalize_falls_back() {
        let fallback = day(2020, 2, 29);
        assert_eq!(normalize_day(None, fallback), "2020-02-29");
        assert_eq!(normalize_day(Some("garbage"), fallback), "2020-02-29");
        assert_eq!(normalize_day(Some("2024-07-04"), fallback), "2024-07-04");
    }

    #[test]
    fn test_month_key() {
        assert_eq!(month_key("2024-01-31"), Some("2024-01".to_string()));
        assert_eq!(month_key("not a date"), None);
    }
}
